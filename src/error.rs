// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types.

use std::io;

use thiserror::Error;

use crate::{ExceptionResponse, FunctionCode};

/// Modbus client error.
#[derive(Debug, Error)]
pub enum Error {
    /// A caller supplied argument violates the protocol limits.
    ///
    /// Detected before any I/O takes place.
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    /// The transport failed or timed out.
    #[error(transparent)]
    Transport(#[from] io::Error),

    /// The response is malformed, truncated, corrupted or doesn't match the request.
    #[error(transparent)]
    Framing(#[from] FramingError),

    /// The device responded with a _Modbus_ exception.
    #[error(transparent)]
    Exception(#[from] ExceptionResponse),
}

impl Error {
    /// Whether the transport gave up waiting for the response.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.kind() == io::ErrorKind::TimedOut)
    }

    /// The exception reported by the device, if any.
    #[must_use]
    pub fn exception(&self) -> Option<&ExceptionResponse> {
        match self {
            Self::Exception(rsp) => Some(rsp),
            _ => None,
        }
    }
}

/// Invalid caller supplied arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("{name} '{quantity}' must be between '{min}' and '{max}'")]
    QuantityOutOfRange {
        name: &'static str,
        quantity: usize,
        min: u16,
        max: u16,
    },

    #[error("write byte count '{actual}' does not match quantity to write '{quantity}'")]
    WriteByteCount { quantity: u16, actual: usize },

    #[error("invalid length of words '{count}', capacity is '{capacity}'")]
    CapacityExceeded { count: usize, capacity: u16 },
}

/// Structural or integrity violation of a response frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FramingError {
    #[error("response length '{length}' does not meet minimum '{minimum}'")]
    TooShort { length: usize, minimum: usize },

    #[error("response length '{length}' exceeds maximum '{maximum}'")]
    TooLong { length: usize, maximum: usize },

    #[error("response length '{0}' is not an even number")]
    OddLength(usize),

    #[error("response frame '{actual}'... is not started with '{expected}'")]
    MissingStart { expected: char, actual: char },

    #[error("response frame ...{actual:?} is not ended with {expected:?}")]
    MissingEnd { expected: &'static str, actual: String },

    #[error("response contains invalid hex digits {0:?}")]
    InvalidHex(String),

    #[error("response slave id '{response}' does not match request '{request}'")]
    SlaveMismatch { request: u8, response: u8 },

    #[error("response transaction id '{response}' does not match request '{request}'")]
    TransactionMismatch { request: u16, response: u16 },

    #[error("response protocol id '{0}' does not match modbus protocol id '0'")]
    InvalidProtocol(u16),

    #[error("response length field '{field}' does not match actual length '{actual}'")]
    LengthMismatch { field: usize, actual: usize },

    #[error("response lrc '{actual:#04X}' does not match expected '{expected:#04X}'")]
    LrcMismatch { expected: u8, actual: u8 },

    #[error("response crc '{actual:#06X}' does not match expected '{expected:#06X}'")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("response data of function '{0}' is empty")]
    EmptyResponse(FunctionCode),

    #[error("response data size '{actual}' does not match count '{count}'")]
    ByteCountMismatch { count: usize, actual: usize },

    #[error("response data size '{actual}' does not match expected '{expected}'")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("response {field} '{actual}' does not match request '{expected}'")]
    EchoMismatch {
        field: &'static str,
        expected: u16,
        actual: u16,
    },

    #[error("fifo count '{count}' is greater than expected '{max}'")]
    FifoCountExceeded { count: u16, max: u16 },
}
