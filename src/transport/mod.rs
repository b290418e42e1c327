// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blocking byte stream transports

use std::{fmt, io, time::Duration};

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "net")]
pub mod tcp;

#[cfg(feature = "serial")]
pub use self::serial::SerialTransport;

#[cfg(feature = "net")]
pub use self::tcp::TcpTransport;

/// A bidirectional, blocking byte stream to a _Modbus_ device.
///
/// An expired read timeout must be reported as [`io::ErrorKind::TimedOut`].
pub trait Transport: Send + fmt::Debug {
    /// Establishes the connection, a no-op if already connected.
    fn connect(&mut self) -> io::Result<()>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Releases the connection.
    ///
    /// Whether a subsequent [`Transport::connect`] reconnects depends
    /// on the implementation.
    fn close(&mut self) -> io::Result<()>;

    /// Sets the timeout of all subsequent reads.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discards any unread bytes that are already pending.
    ///
    /// Must terminate in a bounded time even if no data is pending.
    fn flush(&mut self) -> io::Result<()>;

    /// Writes the whole buffer.
    fn write_all(&mut self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.write(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "failed to write whole frame",
                    ));
                }
                Ok(n) => buf = &buf[n..],
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Fills the whole buffer.
    fn read_exact(&mut self, mut buf: &mut [u8]) -> io::Result<()> {
        while !buf.is_empty() {
            match self.read(buf) {
                Ok(0) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "failed to read whole frame",
                    ));
                }
                Ok(n) => buf = &mut buf[n..],
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> io::Result<()> {
        (**self).connect()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        (**self).set_read_timeout(timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Maps the platform specific results of an expired socket read timeout.
pub(crate) fn normalize_timeout(err: io::Error) -> io::Error {
    match err.kind() {
        io::ErrorKind::WouldBlock => io::Error::new(io::ErrorKind::TimedOut, err),
        _ => err,
    }
}

pub(crate) fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport is not connected")
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;

    use super::*;

    /// Replays scripted read results and records everything written.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedTransport {
        pub(crate) reads: VecDeque<io::Result<Vec<u8>>>,
        pub(crate) written: Vec<u8>,
        pub(crate) timeouts: Vec<Duration>,
        pub(crate) flushes: usize,
    }

    impl ScriptedTransport {
        pub(crate) fn with_chunks<'a>(chunks: impl IntoIterator<Item = &'a [u8]>) -> Self {
            Self {
                reads: chunks.into_iter().map(|c| Ok(c.to_vec())).collect(),
                ..Default::default()
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn connect(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        self.reads.push_front(Ok(chunk.split_off(n)));
                    }
                    Ok(n)
                }
                Some(Err(err)) => Err(err),
                None => Ok(0),
            }
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.timeouts.push(timeout);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn read_exact_spans_chunks() {
        let mut transport = ScriptedTransport::with_chunks([&[1, 2][..], &[3], &[4, 5]]);
        let mut buf = [0; 4];
        transport.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(transport.reads.len(), 1);
    }

    #[test]
    fn read_exact_fails_on_end_of_stream() {
        let mut transport = ScriptedTransport::with_chunks([&[1, 2][..]]);
        let mut buf = [0; 4];
        let err = transport.read_exact(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn normalize_would_block() {
        let err = normalize_timeout(io::ErrorKind::WouldBlock.into());
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        let err = normalize_timeout(io::ErrorKind::BrokenPipe.into());
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
