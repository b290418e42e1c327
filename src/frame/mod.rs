// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    borrow::Cow,
    error,
    fmt::{self, Display},
};

use crate::bytes::Bytes;

/// A Modbus function code.
///
/// Only the function codes that this client issues are named, everything
/// else (including the exception codes reported by a device) is kept
/// as [`FunctionCode::Custom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionCode {
    /// 01 (0x01) Read Coils.
    ReadCoils,

    /// 02 (0x02) Read Discrete Inputs
    ReadDiscreteInputs,

    /// 03 (0x03) Read Holding Registers
    ReadHoldingRegisters,

    /// 04 (0x04) Read Input Registers
    ReadInputRegisters,

    /// 05 (0x05) Write Single Coil
    WriteSingleCoil,

    /// 06 (0x06) Write Single Register
    WriteSingleRegister,

    /// 15 (0x0F) Write Multiple Coils
    WriteMultipleCoils,

    /// 16 (0x10) Write Multiple Registers
    WriteMultipleRegisters,

    /// 22 (0x16) Mask Write Register
    MaskWriteRegister,

    /// 23 (0x17) Read/Write Multiple Registers
    ReadWriteMultipleRegisters,

    /// 24 (0x18) Read FIFO Queue
    ReadFifoQueue,

    /// Any other function code.
    Custom(u8),
}

impl FunctionCode {
    /// Create a new [`FunctionCode`] with `value`.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        match value {
            0x01 => Self::ReadCoils,
            0x02 => Self::ReadDiscreteInputs,
            0x03 => Self::ReadHoldingRegisters,
            0x04 => Self::ReadInputRegisters,
            0x05 => Self::WriteSingleCoil,
            0x06 => Self::WriteSingleRegister,
            0x0F => Self::WriteMultipleCoils,
            0x10 => Self::WriteMultipleRegisters,
            0x16 => Self::MaskWriteRegister,
            0x17 => Self::ReadWriteMultipleRegisters,
            0x18 => Self::ReadFifoQueue,
            code => Self::Custom(code),
        }
    }

    /// Gets the [`u8`] value of the current [`FunctionCode`].
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::ReadCoils => 0x01,
            Self::ReadDiscreteInputs => 0x02,
            Self::ReadHoldingRegisters => 0x03,
            Self::ReadInputRegisters => 0x04,
            Self::WriteSingleCoil => 0x05,
            Self::WriteSingleRegister => 0x06,
            Self::WriteMultipleCoils => 0x0F,
            Self::WriteMultipleRegisters => 0x10,
            Self::MaskWriteRegister => 0x16,
            Self::ReadWriteMultipleRegisters => 0x17,
            Self::ReadFifoQueue => 0x18,
            Self::Custom(code) => code,
        }
    }
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value().fmt(f)
    }
}

/// A 0-based protocol address.
///
/// Device manuals often number coils and registers starting at 1,
/// such addresses have to be decremented.
pub type Address = u16;

/// The state of a single bit, `true` is sent as `0xFF00` when written.
pub type Coil = bool;

/// A 16 bit register value, transmitted big-endian.
pub type Word = u16;

/// Number of items to process.
pub type Quantity = u16;

/// A request issued by the client (master).
///
/// Borrowed payloads avoid copying the caller's buffers for
/// the duration of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request<'a> {
    /// Start address and number of coils.
    ReadCoils(Address, Quantity),

    /// Start address and number of discrete inputs.
    ReadDiscreteInputs(Address, Quantity),

    /// Coil address and new state, sent as `0xFF00` or `0x0000`.
    WriteSingleCoil(Address, Coil),

    /// Start address and the states of consecutive coils.
    WriteMultipleCoils(Address, Cow<'a, [Coil]>),

    /// Start address and number of input registers.
    ReadInputRegisters(Address, Quantity),

    /// Start address and number of holding registers.
    ReadHoldingRegisters(Address, Quantity),

    /// Register address and new value.
    WriteSingleRegister(Address, Word),

    /// Start address and the values of consecutive registers.
    WriteMultipleRegisters(Address, Cow<'a, [Word]>),

    /// Register address, AND mask and OR mask.
    MaskWriteRegister(Address, Word, Word),

    /// Read address, read quantity, write address, write quantity and
    /// the big-endian bytes of the registers to write.
    ///
    /// The device performs the write before the read.
    ReadWriteMultipleRegisters(Address, Quantity, Address, Quantity, Cow<'a, [u8]>),

    /// Address of the FIFO pointer register.
    ReadFifoQueue(Address),
}

impl Request<'_> {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(..) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(..) => FunctionCode::ReadDiscreteInputs,
            Self::WriteSingleCoil(..) => FunctionCode::WriteSingleCoil,
            Self::WriteMultipleCoils(..) => FunctionCode::WriteMultipleCoils,
            Self::ReadInputRegisters(..) => FunctionCode::ReadInputRegisters,
            Self::ReadHoldingRegisters(..) => FunctionCode::ReadHoldingRegisters,
            Self::WriteSingleRegister(..) => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleRegisters(..) => FunctionCode::WriteMultipleRegisters,
            Self::MaskWriteRegister(..) => FunctionCode::MaskWriteRegister,
            Self::ReadWriteMultipleRegisters(..) => FunctionCode::ReadWriteMultipleRegisters,
            Self::ReadFifoQueue(..) => FunctionCode::ReadFifoQueue,
        }
    }
}

/// The decoded data of a successful call.
///
/// Bit reads hold exactly the requested quantity, the padding bits of
/// the last byte are dropped. Write responses carry the echoed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ReadCoils(Vec<Coil>),
    ReadDiscreteInputs(Vec<Coil>),
    /// Echoed address and state.
    WriteSingleCoil(Address, Coil),
    /// Echoed start address and quantity.
    WriteMultipleCoils(Address, Quantity),
    ReadInputRegisters(Vec<Word>),
    ReadHoldingRegisters(Vec<Word>),
    /// Echoed address and value.
    WriteSingleRegister(Address, Word),
    /// Echoed start address and quantity.
    WriteMultipleRegisters(Address, Quantity),
    /// Echoed address, AND mask and OR mask.
    MaskWriteRegister(Address, Word, Word),
    ReadWriteMultipleRegisters(Vec<Word>),
    /// The queued values, at most 31.
    ReadFifoQueue(Vec<Word>),
}

impl Response {
    #[must_use]
    pub const fn function_code(&self) -> FunctionCode {
        match self {
            Self::ReadCoils(_) => FunctionCode::ReadCoils,
            Self::ReadDiscreteInputs(_) => FunctionCode::ReadDiscreteInputs,
            Self::WriteSingleCoil(..) => FunctionCode::WriteSingleCoil,
            Self::WriteMultipleCoils(..) => FunctionCode::WriteMultipleCoils,
            Self::ReadInputRegisters(_) => FunctionCode::ReadInputRegisters,
            Self::ReadHoldingRegisters(_) => FunctionCode::ReadHoldingRegisters,
            Self::WriteSingleRegister(..) => FunctionCode::WriteSingleRegister,
            Self::WriteMultipleRegisters(..) => FunctionCode::WriteMultipleRegisters,
            Self::MaskWriteRegister(..) => FunctionCode::MaskWriteRegister,
            Self::ReadWriteMultipleRegisters(_) => FunctionCode::ReadWriteMultipleRegisters,
            Self::ReadFifoQueue(_) => FunctionCode::ReadFifoQueue,
        }
    }
}

/// A framing independent protocol data unit: function code plus payload.
///
/// Requests are built by the client, responses are produced by
/// the packagers when unwrapping a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolDataUnit {
    pub function: u8,
    pub data: Bytes,
}

impl ProtocolDataUnit {
    #[must_use]
    pub fn new(function: u8, data: impl Into<Bytes>) -> Self {
        Self {
            function,
            data: data.into(),
        }
    }

    /// Number of bytes on the wire (function code included).
    #[must_use]
    pub fn wire_len(&self) -> usize {
        1 + self.data.len()
    }

    /// The function code is not followed by any data.
    #[must_use]
    pub fn has_no_data(&self) -> bool {
        self.data.is_empty()
    }
}

/// The reason a device gives for rejecting a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetDevice,
    /// A code without a well-known meaning.
    ///
    /// Prefer [`ExceptionCode::new`] over constructing this variant
    /// for one of the named codes.
    Custom(u8),
}

impl ExceptionCode {
    #[must_use]
    pub const fn new(value: u8) -> Self {
        match value {
            0x01 => Self::IllegalFunction,
            0x02 => Self::IllegalDataAddress,
            0x03 => Self::IllegalDataValue,
            0x04 => Self::SlaveDeviceFailure,
            0x05 => Self::Acknowledge,
            0x06 => Self::SlaveDeviceBusy,
            0x08 => Self::MemoryParityError,
            0x0A => Self::GatewayPathUnavailable,
            0x0B => Self::GatewayTargetDevice,
            code => Self::Custom(code),
        }
    }

    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::IllegalFunction => 0x01,
            Self::IllegalDataAddress => 0x02,
            Self::IllegalDataValue => 0x03,
            Self::SlaveDeviceFailure => 0x04,
            Self::Acknowledge => 0x05,
            Self::SlaveDeviceBusy => 0x06,
            Self::MemoryParityError => 0x08,
            Self::GatewayPathUnavailable => 0x0A,
            Self::GatewayTargetDevice => 0x0B,
            Self::Custom(code) => code,
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::IllegalFunction => "illegal function",
            Self::IllegalDataAddress => "illegal data address",
            Self::IllegalDataValue => "illegal data value",
            Self::SlaveDeviceFailure => "slave device failure",
            Self::Acknowledge => "acknowledge",
            Self::SlaveDeviceBusy => "slave device busy",
            Self::MemoryParityError => "memory parity error",
            Self::GatewayPathUnavailable => "gateway path unavailable",
            Self::GatewayTargetDevice => "gateway target device failed to respond",
            Self::Custom(_) => "unknown",
        }
    }
}

impl From<ExceptionCode> for u8 {
    fn from(from: ExceptionCode) -> Self {
        from.value()
    }
}

/// A server (slave) exception response.
///
/// `function` is the function code as reported back by the device,
/// i.e. the request's function code with the exception bit set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionResponse {
    pub function: FunctionCode,
    pub exception: ExceptionCode,
}

impl ExceptionResponse {
    /// The function code of the request that has been rejected.
    #[must_use]
    pub const fn request_function(&self) -> FunctionCode {
        FunctionCode::new(self.function.value() & 0x7F)
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl error::Error for ExceptionCode {}

impl fmt::Display for ExceptionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "exception '{}' ({}), function '{}'",
            u8::from(self.exception),
            self.exception,
            self.function
        )
    }
}

impl error::Error for ExceptionResponse {}
