// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

#![cfg(all(feature = "ascii", feature = "rtu", feature = "tcp"))]

mod device;

use blocking_modbus::{prelude::*, ArgumentError, Error};

use crate::device::{Device, Framing};

#[test]
fn toggle_coil() -> anyhow::Result<()> {
    let device = Device::new(Framing::Rtu, |pdu| match pdu[0] {
        0x01 => vec![0x01, 0x01, 0x01],
        0x05 => pdu.to_vec(),
        _ => unreachable!(),
    });
    let client = device.client(Slave(0x01));
    client.coil(0xAC).toggle()?;

    let requests = device.stats().requests;
    assert_eq!(
        requests,
        [
            vec![0x01, 0x00, 0xAC, 0x00, 0x01],
            vec![0x05, 0x00, 0xAC, 0x00, 0x00],
        ]
    );
    Ok(())
}

#[test]
fn set_and_clear_coil() -> anyhow::Result<()> {
    let device = Device::echoing(Framing::Tcp);
    let client = device.client(Slave::tcp_device());
    let coil = client.coil(0x01);
    coil.set()?;
    coil.clear()?;
    coil.set_state(true)?;
    assert_eq!(
        device.stats().requests,
        [
            vec![0x05, 0x00, 0x01, 0xFF, 0x00],
            vec![0x05, 0x00, 0x01, 0x00, 0x00],
            vec![0x05, 0x00, 0x01, 0xFF, 0x00],
        ]
    );
    Ok(())
}

#[test]
fn test_discrete_input() -> anyhow::Result<()> {
    let device = Device::replying(Framing::Ascii, &[0x02, 0x01, 0x01]);
    let client = device.client(Slave(0x01));
    assert!(client.discrete_input(0x10).test()?);
    assert_eq!(device.stats().requests, [vec![0x02, 0x00, 0x10, 0x00, 0x01]]);
    Ok(())
}

#[test]
fn read_text_from_input_registers() -> anyhow::Result<()> {
    let device = Device::replying(
        Framing::Rtu,
        &[0x04, 0x08, b'M', b'o', b'd', b'b', b'u', b's', 0x00, 0x00],
    );
    let client = device.client(Slave(0x01));
    assert_eq!(client.input_registers(0x20, 4).read_string()?, "Modbus");
    Ok(())
}

#[test]
fn write_text_to_holding_registers() -> anyhow::Result<()> {
    let device = Device::new(Framing::Rtu, |pdu| pdu[..5].to_vec());
    let client = device.client(Slave(0x01));
    client.holding_registers(0x20, 4).write_string("Hello")?;
    assert_eq!(
        device.stats().requests,
        [vec![
            0x10, 0x00, 0x20, 0x00, 0x03, 0x06, b'H', b'e', b'l', b'l', b'o', 0x00
        ]]
    );
    Ok(())
}

#[test]
fn text_exceeding_capacity_is_rejected_before_any_io() {
    let device = Device::echoing(Framing::Rtu);
    let client = device.client(Slave(0x01));
    let err = client
        .holding_registers(0x20, 2)
        .write_string("Hello")
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Argument(ArgumentError::CapacityExceeded {
            count: 3,
            capacity: 2
        })
    ));
    assert!(device.stats().requests.is_empty());
}

#[test]
fn register_blocks() -> anyhow::Result<()> {
    let device = Device::new(Framing::Tcp, |pdu| match pdu[0] {
        0x03 => vec![0x03, 0x04, 0x12, 0x34, 0x56, 0x78],
        0x10 => pdu[..5].to_vec(),
        _ => unreachable!(),
    });
    let client = device.client(Slave::tcp_device());
    let block = client.holding_registers(0x00, 2);
    assert_eq!(block.read()?, [0x1234, 0x5678]);
    block.write(&[0xABCD][..])?;
    assert_eq!(
        device.stats().requests[1],
        [0x10, 0x00, 0x00, 0x00, 0x01, 0x02, 0xAB, 0xCD]
    );
    Ok(())
}
