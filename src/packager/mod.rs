// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Framing of protocol data units for the wire
//!
//! Each variant knows how to wrap a PDU into an application data unit,
//! how to recognize the end of a response on the byte stream and how to
//! check and unwrap the response.

use std::{fmt::Write as _, io};

use crate::{
    bytes::Bytes, error::FramingError, frame::ProtocolDataUnit, slave::SlaveId,
    transport::Transport,
};

#[cfg(feature = "ascii")]
pub mod ascii;

#[cfg(feature = "rtu")]
pub mod rtu;

#[cfg(feature = "tcp")]
pub mod tcp;

#[cfg(not(any(feature = "ascii", feature = "rtu", feature = "tcp")))]
compile_error!("at least one of the features \"ascii\", \"rtu\" or \"tcp\" must be enabled");

/// The framing variant of a client session.
#[derive(Debug, Clone)]
pub enum Packager {
    #[cfg(feature = "ascii")]
    Ascii(ascii::AsciiPackager),
    #[cfg(feature = "rtu")]
    Rtu(rtu::RtuPackager),
    #[cfg(feature = "tcp")]
    Tcp(tcp::TcpPackager),
}

impl Packager {
    #[cfg(feature = "ascii")]
    #[must_use]
    pub fn ascii() -> Self {
        Self::Ascii(ascii::AsciiPackager::default())
    }

    #[cfg(feature = "rtu")]
    #[must_use]
    pub fn rtu() -> Self {
        Self::Rtu(rtu::RtuPackager::default())
    }

    #[cfg(feature = "tcp")]
    #[must_use]
    pub fn tcp() -> Self {
        Self::Tcp(tcp::TcpPackager::default())
    }

    /// Wraps `pdu` into a frame addressed to `slave`.
    pub fn encode(&mut self, slave: SlaveId, pdu: &ProtocolDataUnit) -> Bytes {
        match self {
            #[cfg(feature = "ascii")]
            Self::Ascii(packager) => packager.encode(slave, pdu),
            #[cfg(feature = "rtu")]
            Self::Rtu(packager) => packager.encode(slave, pdu),
            #[cfg(feature = "tcp")]
            Self::Tcp(packager) => packager.encode(slave, pdu),
        }
    }

    /// Sends the request frame and receives the raw response frame.
    ///
    /// The transport must already be connected with its read timeout set.
    pub fn exchange(&self, transport: &mut dyn Transport, request: &[u8]) -> io::Result<Vec<u8>> {
        match self {
            #[cfg(feature = "ascii")]
            Self::Ascii(packager) => packager.exchange(transport, request),
            #[cfg(feature = "rtu")]
            Self::Rtu(packager) => packager.exchange(transport, request),
            #[cfg(feature = "tcp")]
            Self::Tcp(packager) => packager.exchange(transport, request),
        }
    }

    /// Checks the structural agreement between request and response.
    pub fn verify(&self, request: &[u8], response: &[u8]) -> Result<(), FramingError> {
        match self {
            #[cfg(feature = "ascii")]
            Self::Ascii(packager) => packager.verify(request, response),
            #[cfg(feature = "rtu")]
            Self::Rtu(packager) => packager.verify(request, response),
            #[cfg(feature = "tcp")]
            Self::Tcp(packager) => packager.verify(request, response),
        }
    }

    /// Unwraps the PDU of a verified response frame.
    pub fn decode(&self, response: &[u8]) -> Result<ProtocolDataUnit, FramingError> {
        match self {
            #[cfg(feature = "ascii")]
            Self::Ascii(packager) => packager.decode(response),
            #[cfg(feature = "rtu")]
            Self::Rtu(packager) => packager.decode(response),
            #[cfg(feature = "tcp")]
            Self::Tcp(packager) => packager.decode(response),
        }
    }

    /// Renders a frame for diagnostics.
    #[must_use]
    pub fn format_frame(&self, frame: &[u8]) -> String {
        match self {
            #[cfg(feature = "ascii")]
            Self::Ascii(_) => format!("{:?}", String::from_utf8_lossy(frame)),
            #[cfg(feature = "rtu")]
            Self::Rtu(_) => format_hex(frame),
            #[cfg(feature = "tcp")]
            Self::Tcp(_) => format_hex(frame),
        }
    }
}

/// Space separated hex bytes, e.g. `01 03 00 6B`.
pub(crate) fn format_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        // Writing into a String never fails
        let _ = write!(s, "{b:02X}");
    }
    s
}

/// Reads until `frame_len` can tell the length of the frame and that
/// many bytes have been received.
///
/// The buffer size limits the frame size. A zero-length read also
/// ends the frame, as does a read timeout after some bytes have been
/// received if `timeout_ends_frame` is set.
#[cfg(any(feature = "ascii", feature = "rtu"))]
pub(crate) fn read_frame(
    transport: &mut dyn Transport,
    max_size: usize,
    timeout_ends_frame: bool,
    mut frame_len: impl FnMut(&[u8]) -> Option<usize>,
) -> io::Result<Vec<u8>> {
    let mut buf = vec![0; max_size];
    let mut len = 0;
    while len < max_size {
        match transport.read(&mut buf[len..]) {
            Ok(0) => break,
            Ok(n) => len += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) if timeout_ends_frame && err.kind() == io::ErrorKind::TimedOut && len > 0 => {
                log::debug!("Read timeout after {len} byte(s), assuming end of frame");
                break;
            }
            Err(err) => return Err(err),
        }
        if let Some(frame_len) = frame_len(&buf[..len]) {
            if len >= frame_len {
                len = frame_len;
                break;
            }
        }
    }
    buf.truncate(len);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(any(feature = "ascii", feature = "rtu"))]
    use crate::transport::mock::ScriptedTransport;

    #[test]
    fn format_hex_bytes() {
        assert_eq!(format_hex(&[]), "");
        assert_eq!(format_hex(&[0x01, 0x03, 0xAB]), "01 03 AB");
    }

    #[test]
    #[cfg(any(feature = "ascii", feature = "rtu"))]
    fn read_frame_stops_at_zero_read() {
        let mut transport = ScriptedTransport::with_chunks([&[1, 2][..], &[3]]);
        let frame = read_frame(&mut transport, 16, false, |_| None).unwrap();
        assert_eq!(frame, vec![1, 2, 3]);
    }

    #[test]
    #[cfg(any(feature = "ascii", feature = "rtu"))]
    fn read_frame_stops_at_max_size() {
        let mut transport = ScriptedTransport::with_chunks([&[1, 2, 3, 4, 5][..]]);
        let frame = read_frame(&mut transport, 4, false, |_| None).unwrap();
        assert_eq!(frame, vec![1, 2, 3, 4]);
    }

    #[test]
    #[cfg(any(feature = "ascii", feature = "rtu"))]
    fn read_frame_stops_at_frame_len() {
        let mut transport = ScriptedTransport::with_chunks([&[1][..], &[2, 3], &[4]]);
        let frame = read_frame(&mut transport, 16, false, |buf| (buf.len() > 1).then_some(2));
        let frame = frame.unwrap();
        assert_eq!(frame, vec![1, 2]);
        assert_eq!(transport.reads.len(), 1);
    }

    #[test]
    #[cfg(any(feature = "ascii", feature = "rtu"))]
    fn read_frame_ends_at_timeout_after_data_if_enabled() {
        let timed_out = || -> io::Result<Vec<u8>> { Err(io::ErrorKind::TimedOut.into()) };
        let mut transport = ScriptedTransport::with_chunks([&[1, 2][..]]);
        transport.reads.push_back(timed_out());
        let frame = read_frame(&mut transport, 16, true, |_| None).unwrap();
        assert_eq!(frame, vec![1, 2]);

        let mut transport = ScriptedTransport::with_chunks([&[1, 2][..]]);
        transport.reads.push_back(timed_out());
        let err = read_frame(&mut transport, 16, false, |_| None).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    #[cfg(all(feature = "ascii", feature = "rtu", feature = "tcp"))]
    fn decode_encoded_pdus() {
        let pdus = [
            ProtocolDataUnit::new(0x03, vec![0x00_u8, 0x6B, 0x00, 0x03]),
            ProtocolDataUnit::new(0x0F, vec![0x00_u8, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01]),
            ProtocolDataUnit::new(0x18, vec![0x04_u8, 0xDE]),
            ProtocolDataUnit::new(0x2B, Vec::<u8>::new()),
        ];
        for mut packager in [Packager::ascii(), Packager::rtu(), Packager::tcp()] {
            for pdu in &pdus {
                let frame = packager.encode(0x11, pdu);
                assert_eq!(&packager.decode(&frame).unwrap(), pdu, "{packager:?}");
            }
        }
    }
}
