// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a Modbus ASCII client

use std::time::Duration;

use crate::{packager::Packager, slave::Slave, transport::Transport};

use super::Client;

/// Timeout of a session if not configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a serial port with 115200 baud 8N1 for sending
/// broadcast messages.
#[cfg(feature = "serial")]
pub fn connect(path: &str) -> crate::Result<Client> {
    let builder = serialport::new(path, crate::transport::serial::DEFAULT_BAUD_RATE)
        .timeout(DEFAULT_TIMEOUT);
    connect_slave(&builder, Slave::broadcast())
}

/// Open a serial port for talking to any kind of Modbus slave device.
#[cfg(feature = "serial")]
pub fn connect_slave(
    builder: &serialport::SerialPortBuilder,
    slave: Slave,
) -> crate::Result<Client> {
    super::connect_serial(Packager::ascii(), builder, slave, DEFAULT_TIMEOUT)
}

/// Connect to an ASCII device behind a transparent TCP gateway.
#[cfg(feature = "net")]
pub fn connect_over_tcp(
    socket_addr: std::net::SocketAddr,
    slave: Slave,
    timeout: Duration,
) -> crate::Result<Client> {
    super::connect_socket(Packager::ascii(), socket_addr, slave, timeout)
}

/// Use any kind of byte stream transport.
#[must_use]
pub fn attach(transport: impl Transport + 'static, slave: Slave) -> Client {
    Client::new(transport, Packager::ascii(), slave, DEFAULT_TIMEOUT)
}
