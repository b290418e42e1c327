// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execute this test only if the `tcp` and `net` features are selected.

#![cfg(all(feature = "tcp", feature = "net"))]

use std::{
    io::{Read as _, Write as _},
    net::{TcpListener, TcpStream},
    thread,
    time::Duration,
};

use blocking_modbus::prelude::*;

/// Serves holding register reads until the client disconnects.
///
/// Every register holds its own address.
fn serve(mut stream: TcpStream) -> anyhow::Result<usize> {
    let mut served = 0;
    loop {
        let mut header = [0; 7];
        if let Err(err) = stream.read_exact(&mut header) {
            if err.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(served);
            }
            return Err(err.into());
        }
        let len = usize::from(u16::from_be_bytes([header[4], header[5]])) - 1;
        let mut pdu = vec![0; len];
        stream.read_exact(&mut pdu)?;
        anyhow::ensure!(pdu[0] == 0x03, "unexpected function {:#04X}", pdu[0]);

        let addr = u16::from_be_bytes([pdu[1], pdu[2]]);
        let cnt = u16::from_be_bytes([pdu[3], pdu[4]]);
        let mut rsp = vec![0x03, u8::try_from(cnt * 2)?];
        for i in 0..cnt {
            rsp.extend_from_slice(&(addr + i).to_be_bytes());
        }
        let mut adu = header[..4].to_vec();
        adu.extend_from_slice(&u16::try_from(rsp.len() + 1)?.to_be_bytes());
        adu.push(header[6]);
        adu.extend_from_slice(&rsp);
        stream.write_all(&adu)?;
        served += 1;
    }
}

#[test]
fn connect_read_and_close() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let socket_addr = listener.local_addr()?;
    let server = thread::spawn(move || -> anyhow::Result<usize> {
        let (stream, _) = listener.accept()?;
        serve(stream)
    });

    let client = tcp::connect(socket_addr)?;
    assert_eq!(client.timeout(), tcp::DEFAULT_TIMEOUT);
    assert_eq!(client.read_holding_registers(0x10, 3)?, [0x10, 0x11, 0x12]);
    assert_eq!(client.holding_register(0x20).read()?, 0x20);
    client.close()?;

    let served = server.join().expect("server thread")?;
    assert_eq!(served, 2);
    Ok(())
}

#[test]
fn attach_to_established_stream() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let socket_addr = listener.local_addr()?;
    let server = thread::spawn(move || -> anyhow::Result<usize> {
        let (stream, _) = listener.accept()?;
        serve(stream)
    });

    let stream = TcpStream::connect(socket_addr)?;
    let client = tcp::attach_slave(stream, Slave(0x07));
    client.set_timeout(Duration::from_secs(1));
    assert_eq!(client.read_holding_registers(0x00, 1)?, [0x00]);
    client.close()?;
    // Attached streams cannot be redialed
    assert!(client.read_holding_registers(0x00, 1).is_err());

    assert_eq!(server.join().expect("server thread")?, 1);
    Ok(())
}

#[test]
fn connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let socket_addr = listener.local_addr().unwrap();
    drop(listener);
    let err = tcp::connect(socket_addr).unwrap_err();
    assert!(matches!(err, blocking_modbus::Error::Transport(_)));
}
