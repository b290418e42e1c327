// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Frame checksums.
//!
//! Both accumulators must be fed in wire order: slave id, function code, data.

/// Longitudinal redundancy check of _Modbus_ ASCII frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lrc {
    sum: u8,
}

impl Lrc {
    #[must_use]
    pub const fn new() -> Self {
        Self { sum: 0 }
    }

    pub fn reset(&mut self) -> &mut Self {
        self.sum = 0;
        self
    }

    pub fn push_byte(&mut self, byte: u8) -> &mut Self {
        self.sum = self.sum.wrapping_add(byte);
        self
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for byte in bytes {
            self.push_byte(*byte);
        }
        self
    }

    /// Two's complement of the accumulated sum.
    #[must_use]
    pub const fn value(&self) -> u8 {
        self.sum.wrapping_neg()
    }
}

/// CRC-16/MODBUS of _Modbus_ RTU frames.
///
/// Polynomial `0xA001` (reflected `0x8005`), initial value `0xFFFF`.
/// The value is transmitted little-endian, i.e. low byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc {
    crc: u16,
}

impl Default for Crc {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc {
    #[must_use]
    pub const fn new() -> Self {
        Self { crc: 0xFFFF }
    }

    pub fn reset(&mut self) -> &mut Self {
        self.crc = 0xFFFF;
        self
    }

    pub fn push_byte(&mut self, byte: u8) -> &mut Self {
        self.crc ^= u16::from(byte);
        for _ in 0..8 {
            if (self.crc & 0x0001) != 0 {
                self.crc >>= 1;
                self.crc ^= 0xA001;
            } else {
                self.crc >>= 1;
            }
        }
        self
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        for byte in bytes {
            self.push_byte(*byte);
        }
        self
    }

    #[must_use]
    pub const fn value(&self) -> u16 {
        self.crc
    }
}
