// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modbus clients

use std::{
    borrow::Cow,
    fmt,
    sync::{
        atomic::{AtomicU8, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};

use crate::{
    codec,
    error::FramingError,
    frame::*,
    packager::Packager,
    slave::*,
    transport::Transport,
    Result,
};

#[cfg(feature = "ascii")]
pub mod ascii;

#[cfg(feature = "rtu")]
pub mod rtu;

#[cfg(feature = "tcp")]
pub mod tcp;

mod view;

pub use self::view::*;

/// A sink for the diagnostic output of a client session.
///
/// Receives one line per frame sent or received.
pub trait Logger: Send + Sync {
    fn output(&self, line: &str);
}

impl<F> Logger for F
where
    F: Fn(&str) + Send + Sync,
{
    fn output(&self, line: &str) {
        self(line);
    }
}

/// _Modbus_ reader
pub trait Reader {
    /// Read multiple coils (0x01)
    fn read_coils(&self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple discrete inputs (0x02)
    fn read_discrete_inputs(&self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>>;

    /// Read multiple holding registers (0x03)
    fn read_holding_registers(&self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read multiple input registers (0x04)
    fn read_input_registers(&self, addr: Address, cnt: Quantity) -> Result<Vec<Word>>;

    /// Read and write multiple holding registers (0x17)
    ///
    /// `write_data` holds the big-endian bytes of `write_count` registers.
    ///
    /// The write operation is performed before the read unlike
    /// the name of the operation might suggest!
    fn read_write_multiple_registers(
        &self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_count: Quantity,
        write_data: &[u8],
    ) -> Result<Vec<Word>>;

    /// Read the contents of a FIFO queue of registers (0x18)
    fn read_fifo_queue(&self, addr: Address) -> Result<Vec<Word>>;
}

/// _Modbus_ writer
pub trait Writer {
    /// Write a single coil (0x05)
    fn write_single_coil(&self, addr: Address, coil: Coil) -> Result<()>;

    /// Write a single holding register (0x06)
    fn write_single_register(&self, addr: Address, word: Word) -> Result<()>;

    /// Write multiple coils (0x0F)
    fn write_multiple_coils(&self, addr: Address, coils: &[Coil]) -> Result<()>;

    /// Write multiple holding registers (0x10)
    fn write_multiple_registers(&self, addr: Address, words: &[Word]) -> Result<()>;

    /// Set or clear individual bits of a holding register (0x16)
    ///
    /// The new value is `(current AND and_mask) OR (or_mask AND (NOT and_mask))`.
    fn masked_write_register(&self, addr: Address, and_mask: Word, or_mask: Word) -> Result<()>;
}

struct Session {
    transport: Box<dyn Transport>,
    packager: Packager,
    timeout: Duration,
    logger: Option<Box<dyn Logger>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("packager", &self.packager)
            .field("timeout", &self.timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl Session {
    fn log_frame(&self, direction: &str, frame: &[u8]) {
        if self.logger.is_none() && !log::log_enabled!(log::Level::Trace) {
            return;
        }
        let line = format!("modbus: {direction} {}", self.packager.format_frame(frame));
        log::trace!("{line}");
        if let Some(logger) = &self.logger {
            logger.output(&line);
        }
    }

    /// Runs a single request/response exchange with the device.
    fn transceive(&mut self, slave: SlaveId, pdu: &ProtocolDataUnit) -> Result<ProtocolDataUnit> {
        let request = self.packager.encode(slave, pdu);
        self.transport.connect()?;
        if !self.timeout.is_zero() {
            self.transport.set_read_timeout(self.timeout)?;
        }
        self.log_frame("sending", &request);
        let response = self.packager.exchange(&mut *self.transport, &request)?;
        self.log_frame("received", &response);
        self.packager.verify(&request, &response)?;
        let response = self.packager.decode(&response)?;
        Ok(response)
    }
}

/// A _Modbus_ client session.
///
/// Concurrent calls on a shared client are serialized, only one
/// request is in flight at any time.
#[derive(Debug)]
pub struct Client {
    session: Mutex<Session>,
    slave: AtomicU8,
}

impl Client {
    /// Creates a session that talks to `slave` over `transport`.
    ///
    /// The transport is connected by the first request.
    pub fn new(
        transport: impl Transport + 'static,
        packager: Packager,
        slave: Slave,
        timeout: Duration,
    ) -> Self {
        Self {
            session: Mutex::new(Session {
                transport: Box::new(transport),
                packager,
                timeout,
                logger: None,
            }),
            slave: AtomicU8::new(slave.into()),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        // A panicking logger must not disable the session
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The timeout that is applied to every exchange.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.lock_session().timeout
    }

    /// A zero duration keeps the current read timeout of the transport.
    pub fn set_timeout(&self, timeout: Duration) {
        self.lock_session().timeout = timeout;
    }

    pub fn set_logger(&self, logger: impl Logger + 'static) {
        self.lock_session().logger = Some(Box::new(logger));
    }

    pub fn clear_logger(&self) {
        self.lock_session().logger = None;
    }

    /// Connects the transport.
    pub fn connect(&self) -> Result<()> {
        self.lock_session().transport.connect()?;
        Ok(())
    }

    /// Closes the transport.
    pub fn close(&self) -> Result<()> {
        self.lock_session().transport.close()?;
        Ok(())
    }

    /// Invokes a _Modbus_ function.
    pub fn call(&self, request: Request<'_>) -> Result<Response> {
        log::debug!("Call {:?}", request);
        codec::check_request(&request)?;
        let req_pdu = codec::encode_request_pdu(&request);

        let mut session = self.lock_session();
        let slave = self.slave.load(Ordering::Acquire);
        let rsp_pdu = session.transceive(slave, &req_pdu).map_err(|err| {
            log::debug!("Failed to call {:?}: {err}", request.function_code());
            err
        })?;

        if rsp_pdu.function != req_pdu.function {
            let exception = ExceptionResponse {
                function: FunctionCode::new(rsp_pdu.function),
                exception: ExceptionCode::new(rsp_pdu.data.first().copied().unwrap_or_default()),
            };
            log::debug!("Device {} responded with {exception}", Slave(slave));
            return Err(exception.into());
        }
        if rsp_pdu.has_no_data() {
            return Err(FramingError::EmptyResponse(FunctionCode::new(rsp_pdu.function)).into());
        }
        let response = codec::decode_response_pdu(&request, &rsp_pdu)?;
        debug_assert_eq!(response.function_code(), request.function_code());
        Ok(response)
    }
}

impl SlaveContext for Client {
    fn set_slave(&self, slave: Slave) {
        self.slave.store(slave.into(), Ordering::Release);
    }

    fn slave(&self) -> Slave {
        Slave(self.slave.load(Ordering::Acquire))
    }
}

impl Reader for Client {
    fn read_coils(&self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        match self.call(Request::ReadCoils(addr, cnt))? {
            Response::ReadCoils(coils) => {
                debug_assert_eq!(coils.len(), cnt.into());
                Ok(coils)
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn read_discrete_inputs(&self, addr: Address, cnt: Quantity) -> Result<Vec<Coil>> {
        match self.call(Request::ReadDiscreteInputs(addr, cnt))? {
            Response::ReadDiscreteInputs(coils) => {
                debug_assert_eq!(coils.len(), cnt.into());
                Ok(coils)
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn read_holding_registers(&self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        match self.call(Request::ReadHoldingRegisters(addr, cnt))? {
            Response::ReadHoldingRegisters(words) => {
                debug_assert_eq!(words.len(), cnt.into());
                Ok(words)
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn read_input_registers(&self, addr: Address, cnt: Quantity) -> Result<Vec<Word>> {
        match self.call(Request::ReadInputRegisters(addr, cnt))? {
            Response::ReadInputRegisters(words) => {
                debug_assert_eq!(words.len(), cnt.into());
                Ok(words)
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn read_write_multiple_registers(
        &self,
        read_addr: Address,
        read_count: Quantity,
        write_addr: Address,
        write_count: Quantity,
        write_data: &[u8],
    ) -> Result<Vec<Word>> {
        match self.call(Request::ReadWriteMultipleRegisters(
            read_addr,
            read_count,
            write_addr,
            write_count,
            Cow::Borrowed(write_data),
        ))? {
            Response::ReadWriteMultipleRegisters(words) => {
                debug_assert_eq!(words.len(), read_count.into());
                Ok(words)
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn read_fifo_queue(&self, addr: Address) -> Result<Vec<Word>> {
        match self.call(Request::ReadFifoQueue(addr))? {
            Response::ReadFifoQueue(words) => Ok(words),
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }
}

impl Writer for Client {
    fn write_single_coil(&self, addr: Address, coil: Coil) -> Result<()> {
        match self.call(Request::WriteSingleCoil(addr, coil))? {
            Response::WriteSingleCoil(rsp_addr, rsp_coil) => {
                debug_assert_eq!(addr, rsp_addr);
                debug_assert_eq!(coil, rsp_coil);
                Ok(())
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn write_single_register(&self, addr: Address, word: Word) -> Result<()> {
        match self.call(Request::WriteSingleRegister(addr, word))? {
            Response::WriteSingleRegister(rsp_addr, rsp_word) => {
                debug_assert_eq!(addr, rsp_addr);
                debug_assert_eq!(word, rsp_word);
                Ok(())
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn write_multiple_coils(&self, addr: Address, coils: &[Coil]) -> Result<()> {
        let cnt = coils.len();
        match self.call(Request::WriteMultipleCoils(addr, Cow::Borrowed(coils)))? {
            Response::WriteMultipleCoils(rsp_addr, rsp_cnt) => {
                debug_assert_eq!(addr, rsp_addr);
                debug_assert_eq!(cnt, rsp_cnt.into());
                Ok(())
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn write_multiple_registers(&self, addr: Address, words: &[Word]) -> Result<()> {
        let cnt = words.len();
        match self.call(Request::WriteMultipleRegisters(addr, Cow::Borrowed(words)))? {
            Response::WriteMultipleRegisters(rsp_addr, rsp_cnt) => {
                debug_assert_eq!(addr, rsp_addr);
                debug_assert_eq!(cnt, rsp_cnt.into());
                Ok(())
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }

    fn masked_write_register(&self, addr: Address, and_mask: Word, or_mask: Word) -> Result<()> {
        match self.call(Request::MaskWriteRegister(addr, and_mask, or_mask))? {
            Response::MaskWriteRegister(rsp_addr, rsp_and_mask, rsp_or_mask) => {
                debug_assert_eq!(addr, rsp_addr);
                debug_assert_eq!(and_mask, rsp_and_mask);
                debug_assert_eq!(or_mask, rsp_or_mask);
                Ok(())
            }
            _ => unreachable!("call() should reject mismatching responses"),
        }
    }
}

/// Opens a serial line session.
#[cfg(all(feature = "serial", any(feature = "ascii", feature = "rtu")))]
fn connect_serial(
    packager: Packager,
    builder: &serialport::SerialPortBuilder,
    slave: Slave,
    timeout: Duration,
) -> Result<Client> {
    let transport = crate::transport::SerialTransport::new(builder.clone());
    let client = Client::new(transport, packager, slave, timeout);
    client.connect()?;
    Ok(client)
}

/// Opens a session that dials `socket_addr` and redials after closing.
#[cfg(feature = "net")]
fn connect_socket(
    packager: Packager,
    socket_addr: std::net::SocketAddr,
    slave: Slave,
    timeout: Duration,
) -> Result<Client> {
    let transport = crate::transport::TcpTransport::dial(socket_addr, timeout);
    let client = Client::new(transport, packager, slave, timeout);
    client.connect()?;
    Ok(client)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::{
        io,
        sync::{Arc, Mutex as StdMutex},
    };

    use super::*;
    use crate::{transport::mock::ScriptedTransport, Error};

    /// Wraps a scripted transport so that it can be inspected after
    /// being moved into a client.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct SharedTransport(pub(crate) Arc<StdMutex<ScriptedTransport>>);

    impl Transport for SharedTransport {
        fn connect(&mut self) -> io::Result<()> {
            self.0.lock().unwrap().connect()
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.lock().unwrap().read(buf)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn close(&mut self) -> io::Result<()> {
            self.0.lock().unwrap().close()
        }

        fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
            self.0.lock().unwrap().set_read_timeout(timeout)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.0.lock().unwrap().flush()
        }
    }

    fn rtu_client(response: &[u8]) -> (Client, SharedTransport) {
        let transport = SharedTransport::default();
        transport
            .0
            .lock()
            .unwrap()
            .reads
            .push_back(Ok(response.to_vec()));
        let client = Client::new(
            transport.clone(),
            Packager::rtu(),
            Slave(0x11),
            Duration::from_secs(1),
        );
        (client, transport)
    }

    #[test]
    fn read_holding_registers_over_rtu() {
        // 11 03 06 AE41 5652 4340 49AD
        let (client, transport) =
            rtu_client(&[0x11, 0x03, 0x06, 0xAE, 0x41, 0x56, 0x52, 0x43, 0x40, 0x49, 0xAD]);
        let words = client.read_holding_registers(0x006B, 3).unwrap();
        assert_eq!(words, vec![0xAE41, 0x5652, 0x4340]);

        let transport = transport.0.lock().unwrap();
        assert_eq!(
            transport.written,
            [0x11, 0x03, 0x00, 0x6B, 0x00, 0x03, 0x76, 0x87]
        );
        assert_eq!(transport.timeouts, vec![Duration::from_secs(1)]);
    }

    #[test]
    fn map_exception_response() {
        let (client, _) = rtu_client(&[0x11, 0x83, 0x02, 0xC1, 0x34]);
        let err = client.read_holding_registers(0x006B, 3).unwrap_err();
        let Error::Exception(rsp) = err else {
            panic!("unexpected error: {err}");
        };
        assert_eq!(rsp.function, FunctionCode::new(0x83));
        assert_eq!(rsp.exception, ExceptionCode::IllegalDataAddress);
    }

    #[test]
    fn reject_invalid_arguments_without_io() {
        let (client, transport) = rtu_client(&[]);
        let err = client.read_holding_registers(0, 0).unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
        assert!(transport.0.lock().unwrap().written.is_empty());
    }

    #[test]
    fn slave_change_applies_to_next_request() {
        let (client, transport) = rtu_client(&[0x12, 0x06, 0x00, 0x01, 0x00, 0x03, 0x9A, 0xA8]);
        assert_eq!(client.slave(), Slave(0x11));
        client.set_slave(Slave(0x12));
        assert_eq!(client.slave(), Slave(0x12));
        client.write_single_register(0x0001, 0x0003).unwrap();
        assert_eq!(transport.0.lock().unwrap().written[0], 0x12);
    }

    #[test]
    fn logger_receives_frames() {
        let (client, _) = rtu_client(&[0x11, 0x83, 0x02, 0xC1, 0x34]);
        let lines = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&lines);
        client.set_logger(move |line: &str| sink.lock().unwrap().push(line.to_owned()));
        let _ = client.read_holding_registers(0x006B, 3);
        let lines = lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "modbus: sending 11 03 00 6B 00 03 76 87".to_owned(),
                "modbus: received 11 83 02 C1 34".to_owned(),
            ]
        );
    }
}
