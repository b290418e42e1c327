// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Connecting a Modbus TCP client

use std::time::Duration;

use crate::{packager::Packager, slave::Slave, transport::Transport};

use super::Client;

#[cfg(feature = "net")]
use std::net::{SocketAddr, TcpStream};

/// Timeout of a session if not configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Establish a direct connection to a Modbus TCP device.
#[cfg(feature = "net")]
pub fn connect(socket_addr: SocketAddr) -> crate::Result<Client> {
    connect_slave(socket_addr, Slave::tcp_device())
}

/// Connect to a physical, broadcast, or custom Modbus device,
/// probably through a Modbus TCP gateway that is forwarding
/// messages to/from the corresponding slave device.
#[cfg(feature = "net")]
pub fn connect_slave(socket_addr: SocketAddr, slave: Slave) -> crate::Result<Client> {
    super::connect_socket(Packager::tcp(), socket_addr, slave, DEFAULT_TIMEOUT)
}

/// Use an established connection to a Modbus TCP device.
///
/// The client cannot reconnect once it has been closed.
#[cfg(feature = "net")]
#[must_use]
pub fn attach(stream: TcpStream) -> Client {
    attach_slave(stream, Slave::tcp_device())
}

/// Use an established connection for talking to a physical, broadcast,
/// or custom Modbus device.
#[cfg(feature = "net")]
#[must_use]
pub fn attach_slave(stream: TcpStream, slave: Slave) -> Client {
    attach_transport(crate::transport::TcpTransport::from_stream(stream), slave)
}

/// Use any kind of byte stream transport.
#[must_use]
pub fn attach_transport(transport: impl Transport + 'static, slave: Slave) -> Client {
    Client::new(transport, Packager::tcp(), slave, DEFAULT_TIMEOUT)
}
