// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! _Modbus_ TCP framing
//!
//! ```text
//! transaction id : 2 bytes
//! protocol id    : 2 bytes, always 0
//! length         : 2 bytes, unit id and PDU
//! unit id        : 1 byte
//! function       : 1 byte
//! data           : 0 up to 252 bytes
//! ```

use std::io;

use byteorder::{BigEndian, ByteOrder as _};

use crate::{
    bytes::{BufMut as _, Bytes, BytesMut},
    codec::MAX_PDU_SIZE,
    error::FramingError,
    frame::ProtocolDataUnit,
    slave::SlaveId,
    transport::Transport,
};

const HEADER_LEN: usize = 7;
const PROTOCOL_ID: u16 = 0x0000;

/// The MBAP header of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    transaction_id: u16,
    protocol_id: u16,
    length: u16,
    unit_id: u8,
}

impl Header {
    fn read(buf: &[u8]) -> Result<Self, FramingError> {
        if buf.len() < HEADER_LEN {
            return Err(FramingError::TooShort {
                length: buf.len(),
                minimum: HEADER_LEN,
            });
        }
        Ok(Self {
            transaction_id: BigEndian::read_u16(&buf[0..2]),
            protocol_id: BigEndian::read_u16(&buf[2..4]),
            length: BigEndian::read_u16(&buf[4..6]),
            unit_id: buf[6],
        })
    }
}

/// Numbers the requests of a session with a wrapping transaction id.
#[derive(Debug, Clone, Default)]
pub struct TcpPackager {
    transaction_id: u16,
}

impl TcpPackager {
    pub fn encode(&mut self, slave: SlaveId, pdu: &ProtocolDataUnit) -> Bytes {
        self.transaction_id = self.transaction_id.wrapping_add(1);
        let mut buf = BytesMut::with_capacity(HEADER_LEN + pdu.wire_len());
        buf.put_u16(self.transaction_id);
        buf.put_u16(PROTOCOL_ID);
        // This type conversion should always be safe, because the
        // PDU size is limited by the request encoder.
        #[allow(clippy::cast_possible_truncation)]
        let length = (pdu.wire_len() + 1) as u16;
        buf.put_u16(length);
        buf.put_u8(slave);
        buf.put_u8(pdu.function);
        buf.put_slice(&pdu.data);
        buf.freeze()
    }

    /// Reads exactly the header, then exactly the announced remainder.
    pub fn exchange(&self, transport: &mut dyn Transport, request: &[u8]) -> io::Result<Vec<u8>> {
        transport.write_all(request)?;
        let mut buf = vec![0; HEADER_LEN];
        transport.read_exact(&mut buf)?;
        let length = usize::from(BigEndian::read_u16(&buf[4..6]));
        if length == 0 || length > MAX_PDU_SIZE + 1 {
            // Consumed anyway to stay in step with the stream, rejected by decode()
            log::debug!("Invalid length field '{length}' in response header");
        }
        buf.resize(HEADER_LEN + length.saturating_sub(1), 0);
        transport.read_exact(&mut buf[HEADER_LEN..])?;
        Ok(buf)
    }

    pub fn verify(&self, request: &[u8], response: &[u8]) -> Result<(), FramingError> {
        let req_hdr = Header::read(request)?;
        let rsp_hdr = Header::read(response)?;
        if rsp_hdr.transaction_id != req_hdr.transaction_id {
            return Err(FramingError::TransactionMismatch {
                request: req_hdr.transaction_id,
                response: rsp_hdr.transaction_id,
            });
        }
        if rsp_hdr.protocol_id != PROTOCOL_ID {
            return Err(FramingError::InvalidProtocol(rsp_hdr.protocol_id));
        }
        if rsp_hdr.unit_id != req_hdr.unit_id {
            return Err(FramingError::SlaveMismatch {
                request: req_hdr.unit_id,
                response: rsp_hdr.unit_id,
            });
        }
        Ok(())
    }

    pub fn decode(&self, response: &[u8]) -> Result<ProtocolDataUnit, FramingError> {
        let header = Header::read(response)?;
        if usize::from(header.length) > MAX_PDU_SIZE + 1 {
            return Err(FramingError::TooLong {
                length: response.len(),
                maximum: HEADER_LEN + MAX_PDU_SIZE,
            });
        }
        // The length field includes the unit id
        let actual = response.len() - HEADER_LEN + 1;
        if usize::from(header.length) != actual {
            return Err(FramingError::LengthMismatch {
                field: header.length.into(),
                actual,
            });
        }
        if response.len() == HEADER_LEN {
            return Err(FramingError::TooShort {
                length: response.len(),
                minimum: HEADER_LEN + 1,
            });
        }
        Ok(ProtocolDataUnit::new(
            response[HEADER_LEN],
            response[HEADER_LEN + 1..].to_vec(),
        ))
    }
}
