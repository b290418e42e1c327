// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! TCP socket transport

use std::{
    io::{self, Read as _, Write as _},
    net::{Shutdown, SocketAddr, TcpStream},
    time::Duration,
};

use socket2::{Domain, Protocol, Socket, Type};

use super::{normalize_timeout, not_connected, Transport};

const FLUSH_POLL_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy)]
enum Origin {
    /// Dials the address on demand, also after closing.
    Dial {
        addr: SocketAddr,
        connect_timeout: Duration,
    },
    /// An externally established stream that cannot be reopened.
    Attached,
}

/// A transport over a TCP stream.
#[derive(Debug)]
pub struct TcpTransport {
    origin: Origin,
    stream: Option<TcpStream>,
    read_timeout: Option<Duration>,
}

impl TcpTransport {
    /// Connects to `addr` lazily on [`Transport::connect`].
    #[must_use]
    pub fn dial(addr: SocketAddr, connect_timeout: Duration) -> Self {
        Self {
            origin: Origin::Dial {
                addr,
                connect_timeout,
            },
            stream: None,
            read_timeout: None,
        }
    }

    /// Uses an already connected stream.
    #[must_use]
    pub fn from_stream(stream: TcpStream) -> Self {
        Self {
            origin: Origin::Attached,
            stream: Some(stream),
            read_timeout: None,
        }
    }

    fn stream(&mut self) -> io::Result<&mut TcpStream> {
        self.stream.as_mut().ok_or_else(not_connected)
    }
}

fn open_stream(addr: SocketAddr, connect_timeout: Duration) -> io::Result<TcpStream> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nodelay(true)?;
    if connect_timeout.is_zero() {
        socket.connect(&addr.into())?;
    } else {
        socket.connect_timeout(&addr.into(), connect_timeout)?;
    }
    Ok(socket.into())
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> io::Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        match self.origin {
            Origin::Dial {
                addr,
                connect_timeout,
            } => {
                log::debug!("Connecting to {addr}");
                let stream = open_stream(addr, connect_timeout)?;
                stream.set_read_timeout(self.read_timeout)?;
                self.stream = Some(stream);
                Ok(())
            }
            Origin::Attached => Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection was closed, reconnecting is not supported",
            )),
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream()?.read(buf).map_err(normalize_timeout)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream()?.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        let Some(stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => Err(err),
            _ => Ok(()),
        }
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.read_timeout = (!timeout.is_zero()).then_some(timeout);
        if let Some(stream) = &self.stream {
            stream.set_read_timeout(self.read_timeout)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let read_timeout = self.read_timeout;
        let stream = self.stream()?;
        stream.set_read_timeout(Some(FLUSH_POLL_TIMEOUT))?;
        let mut buf = [0; 1024];
        let drained = loop {
            match stream.read(&mut buf) {
                Ok(0) => break Ok(()),
                Ok(n) => log::trace!("Discarded {n} pending byte(s)"),
                Err(err) => match normalize_timeout(err) {
                    err if err.kind() == io::ErrorKind::TimedOut => break Ok(()),
                    err if err.kind() == io::ErrorKind::Interrupted => {}
                    err => break Err(err),
                },
            }
        };
        stream.set_read_timeout(read_timeout)?;
        drained
    }
}
