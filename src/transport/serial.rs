// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serial line transport

use std::{
    fmt,
    io::{self, Read as _, Write as _},
    time::Duration,
};

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, SerialPortBuilder, StopBits};

use super::{not_connected, Transport};

/// Baud rate of [`SerialTransport::with_defaults`].
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Read timeout of [`SerialTransport::with_defaults`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A transport over a serial port that is opened on demand.
pub struct SerialTransport {
    builder: SerialPortBuilder,
    read_timeout: Option<Duration>,
    port: Option<Box<dyn SerialPort>>,
}

impl fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialTransport")
            .field("builder", &self.builder)
            .field("read_timeout", &self.read_timeout)
            .field("open", &self.port.is_some())
            .finish()
    }
}

impl SerialTransport {
    /// Opens the port with the given line settings on [`Transport::connect`].
    #[must_use]
    pub fn new(builder: SerialPortBuilder) -> Self {
        Self {
            builder,
            read_timeout: None,
            port: None,
        }
    }

    /// 115200 baud, 8 data bits, no parity, 1 stop bit.
    #[must_use]
    pub fn with_defaults<'a>(path: impl Into<std::borrow::Cow<'a, str>>) -> Self {
        Self::new(
            serialport::new(path, DEFAULT_BAUD_RATE)
                .data_bits(DataBits::Eight)
                .parity(Parity::None)
                .stop_bits(StopBits::One)
                .timeout(DEFAULT_TIMEOUT),
        )
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or_else(not_connected)
    }
}

impl Transport for SerialTransport {
    fn connect(&mut self) -> io::Result<()> {
        if self.port.is_some() {
            return Ok(());
        }
        let mut builder = self.builder.clone();
        if let Some(timeout) = self.read_timeout {
            builder = builder.timeout(timeout);
        }
        let port = builder.open()?;
        log::debug!("Opened serial port {:?}", port.name());
        self.port = Some(port);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.port()?.read(buf) {
            // Some drivers report an expired timeout as an empty read
            Ok(0) if !buf.is_empty() => Err(io::ErrorKind::TimedOut.into()),
            res => res,
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port()?.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(port) = self.port.take() {
            log::debug!("Closing serial port {:?}", port.name());
        }
        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        if self.read_timeout == Some(timeout) {
            return Ok(());
        }
        self.read_timeout = Some(timeout);
        if let Some(port) = &mut self.port {
            port.set_timeout(timeout)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
}
