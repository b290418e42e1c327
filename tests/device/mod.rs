// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A simulated device behind an in-memory transport.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    fmt, io,
    sync::{Arc, Mutex},
    time::Duration,
};

use blocking_modbus::{
    checksum::{Crc, Lrc},
    prelude::*,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Ascii,
    Rtu,
    Tcp,
}

pub const ALL_FRAMINGS: [Framing; 3] = [Framing::Ascii, Framing::Rtu, Framing::Tcp];

/// Maps the request PDU to the response PDU.
///
/// An empty response PDU leaves the request unanswered.
type Handler = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub connects: usize,
    pub closes: usize,
    pub flushes: usize,
    pub timeouts: Vec<Duration>,
    /// Request PDUs in the order of arrival.
    pub requests: Vec<Vec<u8>>,
}

struct State {
    framing: Framing,
    handler: Handler,
    pending: VecDeque<u8>,
    stats: Stats,
}

#[derive(Clone)]
pub struct Device(Arc<Mutex<State>>);

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0.lock().unwrap();
        f.debug_struct("Device")
            .field("framing", &state.framing)
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Device {
    pub fn new(framing: Framing, handler: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) -> Self {
        Self(Arc::new(Mutex::new(State {
            framing,
            handler: Box::new(handler),
            pending: VecDeque::new(),
            stats: Stats::default(),
        })))
    }

    /// Answers every request with the same response PDU.
    pub fn replying(framing: Framing, response: &[u8]) -> Self {
        let response = response.to_vec();
        Self::new(framing, move |_| response.clone())
    }

    /// Echoes every request PDU, as write requests are confirmed.
    pub fn echoing(framing: Framing) -> Self {
        Self::new(framing, |pdu: &[u8]| pdu.to_vec())
    }

    pub fn stats(&self) -> Stats {
        self.0.lock().unwrap().stats.clone()
    }

    pub fn client(&self, slave: Slave) -> Client {
        let framing = self.0.lock().unwrap().framing;
        match framing {
            Framing::Ascii => ascii::attach(self.clone(), slave),
            Framing::Rtu => rtu::attach(self.clone(), slave),
            Framing::Tcp => tcp::attach_transport(self.clone(), slave),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn hex_decode(s: &[u8]) -> Vec<u8> {
    s.chunks(2)
        .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
        .collect()
}

/// Splits a request frame into the slave id and the PDU.
fn unwrap_request(framing: Framing, frame: &[u8]) -> (Vec<u8>, Vec<u8>) {
    match framing {
        Framing::Ascii => {
            assert_eq!(frame[0], b':');
            assert!(frame.ends_with(b"\r\n"));
            let bytes = hex_decode(&frame[1..frame.len() - 2]);
            let (adu, lrc) = bytes.split_at(bytes.len() - 1);
            assert_eq!(Lrc::new().push_bytes(adu).value(), lrc[0]);
            (adu[..1].to_vec(), adu[1..].to_vec())
        }
        Framing::Rtu => {
            let (adu, crc) = frame.split_at(frame.len() - 2);
            assert_eq!(
                Crc::new().push_bytes(adu).value(),
                u16::from_le_bytes([crc[0], crc[1]])
            );
            (adu[..1].to_vec(), adu[1..].to_vec())
        }
        Framing::Tcp => {
            let length = usize::from(u16::from_be_bytes([frame[4], frame[5]]));
            assert_eq!(length, frame.len() - 6);
            // Transaction id, protocol id and unit id are echoed
            let mut header = frame[..7].to_vec();
            header.drain(4..6);
            (header, frame[7..].to_vec())
        }
    }
}

fn wrap_response(framing: Framing, prefix: &[u8], pdu: &[u8]) -> Vec<u8> {
    match framing {
        Framing::Ascii => {
            let mut adu = prefix.to_vec();
            adu.extend_from_slice(pdu);
            let lrc = Lrc::new().push_bytes(&adu).value();
            adu.push(lrc);
            format!(":{}\r\n", hex_encode(&adu)).into_bytes()
        }
        Framing::Rtu => {
            let mut adu = prefix.to_vec();
            adu.extend_from_slice(pdu);
            let crc = Crc::new().push_bytes(&adu).value();
            adu.extend_from_slice(&crc.to_le_bytes());
            adu
        }
        Framing::Tcp => {
            let length = u16::try_from(pdu.len() + 1).unwrap();
            let mut adu = prefix[..4].to_vec();
            adu.extend_from_slice(&length.to_be_bytes());
            adu.push(prefix[4]);
            adu.extend_from_slice(pdu);
            adu
        }
    }
}

impl Transport for Device {
    fn connect(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().stats.connects += 1;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        if state.pending.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no response"));
        }
        let n = buf.len().min(state.pending.len());
        for (dst, src) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.0.lock().unwrap();
        let framing = state.framing;
        let (prefix, pdu) = unwrap_request(framing, buf);
        let response = (state.handler)(&pdu);
        state.stats.requests.push(pdu);
        if !response.is_empty() {
            let frame = wrap_response(framing, &prefix, &response);
            state.pending.extend(frame);
        }
        Ok(buf.len())
    }

    fn close(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().stats.closes += 1;
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.0.lock().unwrap().stats.timeouts.push(timeout);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.0.lock().unwrap();
        state.pending.clear();
        state.stats.flushes += 1;
        Ok(())
    }
}
