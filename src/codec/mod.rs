// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Encoding of request PDUs and validation/decoding of response PDUs.

use byteorder::{BigEndian, ByteOrder as _};

use crate::{
    bytes::{BufMut as _, BytesMut},
    error::{ArgumentError, FramingError},
    frame::{Coil, ProtocolDataUnit, Quantity, Word},
    Request, Response,
};

/// Maximum request/response PDU size.
///
/// Fixed by the Modbus application protocol for all framings.
pub(crate) const MAX_PDU_SIZE: usize = 253;

/// Maximum number of values a device returns for a FIFO read.
pub(crate) const MAX_FIFO_COUNT: u16 = 31;

const MAX_READ_BITS: u16 = 2000;
const MAX_READ_REGISTERS: u16 = 125;
const MAX_WRITE_BITS: u16 = 1968;
const MAX_WRITE_REGISTERS: u16 = 123;
const MAX_READ_WRITE_WRITE_REGISTERS: u16 = 121;

const COIL_ON: u16 = 0xFF00;
const COIL_OFF: u16 = 0x0000;

#[allow(clippy::cast_possible_truncation)]
fn u16_len(len: usize) -> u16 {
    // This type conversion should always be safe, because the
    // possible values are limited by check_request().
    debug_assert!(len <= u16::MAX.into());
    len as u16
}

#[allow(clippy::cast_possible_truncation)]
fn u8_len(len: usize) -> u8 {
    // This type conversion should always be safe, because the
    // possible values are limited by check_request().
    debug_assert!(len <= u8::MAX.into());
    len as u8
}

fn check_quantity(
    name: &'static str,
    quantity: usize,
    max: u16,
) -> std::result::Result<(), ArgumentError> {
    if quantity < 1 || quantity > max.into() {
        return Err(ArgumentError::QuantityOutOfRange {
            name,
            quantity,
            min: 1,
            max,
        });
    }
    Ok(())
}

/// Validates the request arguments against the protocol limits.
pub(crate) fn check_request(request: &Request<'_>) -> std::result::Result<(), ArgumentError> {
    use crate::frame::Request::*;
    match request {
        ReadCoils(_, quantity) | ReadDiscreteInputs(_, quantity) => {
            check_quantity("quantity", (*quantity).into(), MAX_READ_BITS)
        }
        ReadInputRegisters(_, quantity) | ReadHoldingRegisters(_, quantity) => {
            check_quantity("quantity", (*quantity).into(), MAX_READ_REGISTERS)
        }
        WriteMultipleCoils(_, coils) => {
            check_quantity("quantity (len(coils))", coils.len(), MAX_WRITE_BITS)
        }
        WriteMultipleRegisters(_, words) => {
            check_quantity("quantity (len(words))", words.len(), MAX_WRITE_REGISTERS)
        }
        ReadWriteMultipleRegisters(_, read_quantity, _, write_quantity, bytes) => {
            check_quantity(
                "quantity to read",
                (*read_quantity).into(),
                MAX_READ_REGISTERS,
            )?;
            check_quantity(
                "quantity to write",
                (*write_quantity).into(),
                MAX_READ_WRITE_WRITE_REGISTERS,
            )?;
            if bytes.len() != usize::from(*write_quantity) * 2 {
                return Err(ArgumentError::WriteByteCount {
                    quantity: *write_quantity,
                    actual: bytes.len(),
                });
            }
            Ok(())
        }
        WriteSingleCoil(_, _)
        | WriteSingleRegister(_, _)
        | MaskWriteRegister(_, _, _)
        | ReadFifoQueue(_) => Ok(()),
    }
}

/// Builds the protocol data unit of a (previously checked) request.
pub(crate) fn encode_request_pdu(request: &Request<'_>) -> ProtocolDataUnit {
    use crate::frame::Request::*;
    let mut buf = BytesMut::with_capacity(MAX_PDU_SIZE - 1);
    match request {
        ReadCoils(address, quantity)
        | ReadDiscreteInputs(address, quantity)
        | ReadInputRegisters(address, quantity)
        | ReadHoldingRegisters(address, quantity) => {
            buf.put_u16(*address);
            buf.put_u16(*quantity);
        }
        WriteSingleCoil(address, state) => {
            buf.put_u16(*address);
            buf.put_u16(bool_to_coil(*state));
        }
        WriteMultipleCoils(address, coils) => {
            buf.put_u16(*address);
            buf.put_u16(u16_len(coils.len()));
            buf.put_u8(u8_len(packed_coils_size(coils)));
            encode_packed_coils(&mut buf, coils);
        }
        WriteSingleRegister(address, word) => {
            buf.put_u16(*address);
            buf.put_u16(*word);
        }
        WriteMultipleRegisters(address, words) => {
            buf.put_u16(*address);
            let len = words.len();
            buf.put_u16(u16_len(len));
            buf.put_u8(u8_len(len * 2));
            for w in words.as_ref() {
                buf.put_u16(*w);
            }
        }
        MaskWriteRegister(address, and_mask, or_mask) => {
            buf.put_u16(*address);
            buf.put_u16(*and_mask);
            buf.put_u16(*or_mask);
        }
        ReadWriteMultipleRegisters(
            read_address,
            read_quantity,
            write_address,
            write_quantity,
            bytes,
        ) => {
            buf.put_u16(*read_address);
            buf.put_u16(*read_quantity);
            buf.put_u16(*write_address);
            buf.put_u16(*write_quantity);
            buf.put_u8(u8_len(bytes.len()));
            buf.put_slice(bytes);
        }
        ReadFifoQueue(address) => {
            buf.put_u16(*address);
        }
    }
    ProtocolDataUnit::new(request.function_code().value(), buf.freeze())
}

fn check_size(data: &[u8], expected: usize) -> std::result::Result<(), FramingError> {
    if data.len() != expected {
        return Err(FramingError::SizeMismatch {
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

fn check_echo(
    field: &'static str,
    expected: u16,
    actual: u16,
) -> std::result::Result<(), FramingError> {
    if expected != actual {
        return Err(FramingError::EchoMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Splits off the leading byte count and verifies it against the payload.
fn counted_payload(data: &[u8]) -> std::result::Result<&[u8], FramingError> {
    let Some((count, payload)) = data.split_first() else {
        return Err(FramingError::TooShort {
            length: 0,
            minimum: 1,
        });
    };
    if usize::from(*count) != payload.len() {
        return Err(FramingError::ByteCountMismatch {
            count: (*count).into(),
            actual: payload.len(),
        });
    }
    Ok(payload)
}

fn decode_coils(data: &[u8], quantity: Quantity) -> std::result::Result<Vec<Coil>, FramingError> {
    let packed_coils = counted_payload(data)?;
    let expected = (usize::from(quantity) + 7) / 8;
    if packed_coils.len() < expected {
        return Err(FramingError::SizeMismatch {
            expected,
            actual: packed_coils.len(),
        });
    }
    Ok(decode_packed_coils(packed_coils, quantity))
}

fn decode_registers(
    data: &[u8],
    quantity: Quantity,
) -> std::result::Result<Vec<Word>, FramingError> {
    let payload = counted_payload(data)?;
    check_size(payload, usize::from(quantity) * 2)?;
    Ok(decode_words(payload))
}

/// Decodes the echo of a fixed size write response into its words.
fn decode_echo(data: &[u8], len: usize) -> std::result::Result<Vec<Word>, FramingError> {
    check_size(data, len)?;
    Ok(decode_words(data))
}

/// Validates the shape of a response PDU and unpacks its payload.
///
/// Function code agreement and a non-empty payload must have
/// been verified by the caller.
pub(crate) fn decode_response_pdu(
    request: &Request<'_>,
    response: &ProtocolDataUnit,
) -> std::result::Result<Response, FramingError> {
    use crate::frame::Request::*;
    debug_assert_eq!(request.function_code().value(), response.function);
    let data = &response.data[..];
    let rsp = match request {
        ReadCoils(_, quantity) => Response::ReadCoils(decode_coils(data, *quantity)?),
        ReadDiscreteInputs(_, quantity) => {
            Response::ReadDiscreteInputs(decode_coils(data, *quantity)?)
        }
        ReadInputRegisters(_, quantity) => {
            Response::ReadInputRegisters(decode_registers(data, *quantity)?)
        }
        ReadHoldingRegisters(_, quantity) => {
            Response::ReadHoldingRegisters(decode_registers(data, *quantity)?)
        }
        ReadWriteMultipleRegisters(_, read_quantity, _, _, _) => {
            Response::ReadWriteMultipleRegisters(decode_registers(data, *read_quantity)?)
        }
        WriteSingleCoil(address, state) => {
            let echo = decode_echo(data, 4)?;
            check_echo("address", *address, echo[0])?;
            check_echo("value", bool_to_coil(*state), echo[1])?;
            Response::WriteSingleCoil(echo[0], *state)
        }
        WriteSingleRegister(address, word) => {
            let echo = decode_echo(data, 4)?;
            check_echo("address", *address, echo[0])?;
            check_echo("value", *word, echo[1])?;
            Response::WriteSingleRegister(echo[0], echo[1])
        }
        WriteMultipleCoils(address, coils) => {
            let echo = decode_echo(data, 4)?;
            check_echo("address", *address, echo[0])?;
            check_echo("quantity", u16_len(coils.len()), echo[1])?;
            Response::WriteMultipleCoils(echo[0], echo[1])
        }
        WriteMultipleRegisters(address, words) => {
            let echo = decode_echo(data, 4)?;
            check_echo("address", *address, echo[0])?;
            check_echo("quantity", u16_len(words.len()), echo[1])?;
            Response::WriteMultipleRegisters(echo[0], echo[1])
        }
        MaskWriteRegister(address, and_mask, or_mask) => {
            let echo = decode_echo(data, 6)?;
            check_echo("address", *address, echo[0])?;
            check_echo("AND-mask", *and_mask, echo[1])?;
            check_echo("OR-mask", *or_mask, echo[2])?;
            Response::MaskWriteRegister(echo[0], echo[1], echo[2])
        }
        ReadFifoQueue(_) => Response::ReadFifoQueue(decode_fifo(data)?),
    };
    Ok(rsp)
}

fn decode_fifo(data: &[u8]) -> std::result::Result<Vec<Word>, FramingError> {
    if data.len() < 4 {
        return Err(FramingError::TooShort {
            length: data.len(),
            minimum: 4,
        });
    }
    let byte_count = BigEndian::read_u16(&data[0..2]);
    if usize::from(byte_count) != data.len() - 2 {
        return Err(FramingError::ByteCountMismatch {
            count: byte_count.into(),
            actual: data.len() - 2,
        });
    }
    let fifo_count = BigEndian::read_u16(&data[2..4]);
    if fifo_count > MAX_FIFO_COUNT {
        return Err(FramingError::FifoCountExceeded {
            count: fifo_count,
            max: MAX_FIFO_COUNT,
        });
    }
    let values = &data[4..];
    check_size(values, usize::from(fifo_count) * 2)?;
    Ok(decode_words(values))
}

fn bool_to_coil(state: bool) -> u16 {
    if state {
        COIL_ON
    } else {
        COIL_OFF
    }
}

fn packed_coils_size(coils: &[Coil]) -> usize {
    (coils.len() + 7) / 8
}

fn encode_packed_coils(buf: &mut BytesMut, coils: &[Coil]) -> usize {
    let packed_coils_size = packed_coils_size(coils);
    let offset = buf.len();
    buf.resize(offset + packed_coils_size, 0);
    let buf = &mut buf[offset..];
    for (i, b) in coils.iter().enumerate() {
        let v = u8::from(*b); // 0 or 1
        buf[i / 8] |= v << (i % 8);
    }
    packed_coils_size
}

/// Unpacks `count` bits, least significant bit first.
fn decode_packed_coils(bytes: &[u8], count: u16) -> Vec<Coil> {
    let mut res = Vec::with_capacity(count.into());
    for i in 0usize..count.into() {
        res.push((bytes[i / 8] >> (i % 8)) & 0b1 > 0);
    }
    res
}

/// Big-endian words, an odd trailing byte is zero padded.
pub(crate) fn decode_words(bytes: &[u8]) -> Vec<Word> {
    bytes
        .chunks(2)
        .map(|chunk| match *chunk {
            [hi, lo] => u16::from_be_bytes([hi, lo]),
            [hi] => u16::from_be_bytes([hi, 0]),
            _ => unreachable!(),
        })
        .collect()
}

pub(crate) fn encode_words(words: &[Word]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}
