// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! _Modbus_ ASCII framing
//!
//! ```text
//! start    : 1 char  ':'
//! address  : 2 chars
//! function : 2 chars
//! data     : 0 up to 2 x 252 chars
//! lrc      : 2 chars
//! end      : 2 chars "\r\n"
//! ```

use std::io;

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    checksum::Lrc,
    codec::MAX_PDU_SIZE,
    error::FramingError,
    frame::ProtocolDataUnit,
    slave::SlaveId,
    transport::Transport,
};

use super::read_frame;

const START: u8 = b':';
const END: &[u8] = b"\r\n";
const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Start, address, function, LRC and end.
const MIN_FRAME_LEN: usize = 9;
const MAX_FRAME_LEN: usize = 513;

#[derive(Debug, Clone, Default)]
pub struct AsciiPackager {}

fn put_hex(buf: &mut BytesMut, bytes: &[u8]) {
    for b in bytes {
        buf.put_u8(HEX_DIGITS[usize::from(b >> 4)]);
        buf.put_u8(HEX_DIGITS[usize::from(b & 0x0F)]);
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

fn read_hex(chars: &[u8]) -> Result<Vec<u8>, FramingError> {
    let invalid = || FramingError::InvalidHex(String::from_utf8_lossy(chars).into_owned());
    if chars.len() % 2 != 0 {
        return Err(invalid());
    }
    chars
        .chunks(2)
        .map(|pair| match (hex_digit(pair[0]), hex_digit(pair[1])) {
            (Some(hi), Some(lo)) => Ok((hi << 4) | lo),
            _ => Err(invalid()),
        })
        .collect()
}

fn read_hex_byte(chars: &[u8]) -> Result<u8, FramingError> {
    read_hex(&chars[..2.min(chars.len())])?
        .first()
        .copied()
        .ok_or_else(|| FramingError::InvalidHex(String::from_utf8_lossy(chars).into_owned()))
}

impl AsciiPackager {
    pub fn encode(&mut self, slave: SlaveId, pdu: &ProtocolDataUnit) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + 2 * (1 + pdu.wire_len() + 1) + END.len());
        buf.put_u8(START);
        put_hex(&mut buf, &[slave, pdu.function]);
        put_hex(&mut buf, &pdu.data);
        let mut lrc = Lrc::new();
        lrc.push_byte(slave)
            .push_byte(pdu.function)
            .push_bytes(&pdu.data);
        put_hex(&mut buf, &[lrc.value()]);
        buf.put_slice(END);
        buf.freeze()
    }

    pub fn exchange(&self, transport: &mut dyn Transport, request: &[u8]) -> io::Result<Vec<u8>> {
        transport.flush()?;
        transport.write_all(request)?;
        read_frame(transport, MAX_FRAME_LEN, false, |buf| {
            (buf.len() > 3 && buf.ends_with(END)).then_some(buf.len())
        })
    }

    pub fn verify(&self, request: &[u8], response: &[u8]) -> Result<(), FramingError> {
        let length = response.len();
        if length < MIN_FRAME_LEN {
            return Err(FramingError::TooShort {
                length,
                minimum: MIN_FRAME_LEN,
            });
        }
        // Length excluding the start char must be an even number
        if length % 2 != 1 {
            return Err(FramingError::OddLength(length - 1));
        }
        if response[0] != START {
            return Err(FramingError::MissingStart {
                expected: char::from(START),
                actual: char::from(response[0]),
            });
        }
        let tail = &response[length - END.len()..];
        if tail != END {
            return Err(FramingError::MissingEnd {
                expected: "\r\n",
                actual: String::from_utf8_lossy(tail).into_owned(),
            });
        }
        let response_slave = read_hex_byte(&response[1..])?;
        let request_slave = read_hex_byte(request.get(1..).unwrap_or_default())?;
        if response_slave != request_slave {
            return Err(FramingError::SlaveMismatch {
                request: request_slave,
                response: response_slave,
            });
        }
        Ok(())
    }

    pub fn decode(&self, response: &[u8]) -> Result<ProtocolDataUnit, FramingError> {
        if response.len() < MIN_FRAME_LEN {
            return Err(FramingError::TooShort {
                length: response.len(),
                minimum: MIN_FRAME_LEN,
            });
        }
        let slave = read_hex_byte(&response[1..3])?;
        let function = read_hex_byte(&response[3..5])?;
        let data_end = response.len() - 4;
        let data = read_hex(&response[5..data_end])?;
        if data.len() > MAX_PDU_SIZE - 1 {
            return Err(FramingError::TooLong {
                length: data.len() + 1,
                maximum: MAX_PDU_SIZE,
            });
        }
        let actual = read_hex_byte(&response[data_end..data_end + 2])?;
        let mut lrc = Lrc::new();
        lrc.push_byte(slave).push_byte(function).push_bytes(&data);
        let expected = lrc.value();
        if actual != expected {
            return Err(FramingError::LrcMismatch { expected, actual });
        }
        Ok(ProtocolDataUnit::new(function, data))
    }
}
