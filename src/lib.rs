// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A pure [Rust](https://www.rust-lang.org)
//! [Modbus](https://en.wikipedia.org/wiki/Modbus) master library
//! with blocking I/O.
//!
//! Modbus is based on a [master/slave](https://en.wikipedia.org/wiki/Master/slave_(technology))
//! model. The master is called *client* in this library.
//!
//! Requests are framed in one of three variants:
//!
//! - _ASCII_: hex encoded with a longitudinal redundancy check
//! - _RTU_: binary with a CRC-16, usually over a serial line
//! - _TCP_: binary with an MBAP header, over a byte stream
//!
//! ## Installation
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! blocking-modbus = "*"
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use blocking_modbus::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = tcp::connect("192.168.0.222:502".parse()?)?;
//!     let words = client.read_holding_registers(0x1000, 7)?;
//!     println!("{words:?}");
//!
//!     client.coil(0x00AC).toggle()?;
//!     Ok(())
//! }
//! ```

#![warn(rust_2018_idioms)]

pub mod bytes {
    //! Re-exported [bytes](https://docs.rs/bytes) types.
    pub use ::bytes::{Buf, BufMut, Bytes, BytesMut};
}

pub mod checksum;
pub mod client;
mod codec;
mod error;
mod frame;
pub mod packager;
pub mod prelude;
mod slave;
pub mod transport;

pub use self::{
    error::{ArgumentError, Error, FramingError},
    frame::{
        Address, Coil, ExceptionCode, ExceptionResponse, FunctionCode, ProtocolDataUnit,
        Quantity, Request, Response, Word,
    },
    slave::{Slave, SlaveContext, SlaveId},
};

/// Specialized [`std::result::Result`] type for _Modbus_ client API calls.
pub type Result<T> = std::result::Result<T, Error>;
