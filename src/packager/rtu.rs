// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! _Modbus_ RTU framing
//!
//! ```text
//! address  : 1 byte
//! function : 1 byte
//! data     : 0 up to 252 bytes
//! crc      : 2 bytes, low byte first
//! ```

use std::io;

use byteorder::{BigEndian, ByteOrder as _, LittleEndian};

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    checksum::Crc,
    error::FramingError,
    frame::ProtocolDataUnit,
    slave::SlaveId,
    transport::Transport,
};

use super::read_frame;

/// Address, function and CRC.
const MIN_FRAME_LEN: usize = 1 + 1 + 2;
const MAX_FRAME_LEN: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct RtuPackager {}

fn calc_crc(bytes: &[u8]) -> u16 {
    let mut crc = Crc::new();
    crc.push_bytes(bytes);
    crc.value()
}

/// Predicts the payload length (data without function code) of a
/// response from the bytes received so far.
fn get_response_payload_len(buf: &[u8]) -> Option<usize> {
    let function = *buf.get(1)?;
    match function {
        0x01..=0x04 | 0x17 => buf.get(2).map(|count| 1 + usize::from(*count)),
        0x05 | 0x06 | 0x0F | 0x10 => Some(4),
        0x16 => Some(6),
        0x18 => buf
            .get(2..4)
            .map(|count| 2 + usize::from(BigEndian::read_u16(count))),
        0x80..=0xFF => Some(1),
        _ => None,
    }
}

/// The length of the complete frame, if it can be told yet.
fn get_response_frame_len(buf: &[u8]) -> Option<usize> {
    get_response_payload_len(buf).map(|payload_len| MIN_FRAME_LEN + payload_len)
}

impl RtuPackager {
    pub fn encode(&mut self, slave: SlaveId, pdu: &ProtocolDataUnit) -> Bytes {
        let mut buf = BytesMut::with_capacity(1 + pdu.wire_len() + 2);
        buf.put_u8(slave);
        buf.put_u8(pdu.function);
        buf.put_slice(&pdu.data);
        let crc = calc_crc(&buf);
        buf.put_u16_le(crc);
        buf.freeze()
    }

    /// Sends the request and reads the response until its predicted
    /// length is reached.
    ///
    /// A zero-length read, a read timeout after some bytes have
    /// been received or the maximum frame size also end the frame.
    pub fn exchange(&self, transport: &mut dyn Transport, request: &[u8]) -> io::Result<Vec<u8>> {
        transport.flush()?;
        transport.write_all(request)?;
        read_frame(transport, MAX_FRAME_LEN, true, get_response_frame_len)
    }

    pub fn verify(&self, request: &[u8], response: &[u8]) -> Result<(), FramingError> {
        if response.len() < MIN_FRAME_LEN {
            return Err(FramingError::TooShort {
                length: response.len(),
                minimum: MIN_FRAME_LEN,
            });
        }
        let request_slave = request.first().copied().unwrap_or_default();
        if response[0] != request_slave {
            return Err(FramingError::SlaveMismatch {
                request: request_slave,
                response: response[0],
            });
        }
        Ok(())
    }

    pub fn decode(&self, response: &[u8]) -> Result<ProtocolDataUnit, FramingError> {
        let length = response.len();
        if length < MIN_FRAME_LEN {
            return Err(FramingError::TooShort {
                length,
                minimum: MIN_FRAME_LEN,
            });
        }
        if length > MAX_FRAME_LEN {
            return Err(FramingError::TooLong {
                length,
                maximum: MAX_FRAME_LEN,
            });
        }
        let (adu, crc) = response.split_at(length - 2);
        let expected = calc_crc(adu);
        let actual = LittleEndian::read_u16(crc);
        if expected != actual {
            return Err(FramingError::CrcMismatch { expected, actual });
        }
        Ok(ProtocolDataUnit::new(adu[1], adu[2..].to_vec()))
    }
}
