// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Addressable views on the data model of a device
//!
//! A view borrows its [`Client`] and delegates to the raw operations.

use crate::{
    codec::{decode_words, encode_words},
    error::ArgumentError,
    frame::{Address, Coil, Quantity, Word},
    Result,
};

use super::{Client, Reader as _, Writer as _};

/// A bit that can be tested.
pub trait Testable {
    fn test(&self) -> Result<Coil>;
}

/// A bit that can be changed.
pub trait Settable: Testable {
    fn set_state(&self, state: Coil) -> Result<()>;

    fn set(&self) -> Result<()> {
        self.set_state(true)
    }

    fn clear(&self) -> Result<()> {
        self.set_state(false)
    }

    /// Reads the current state and writes the opposite.
    ///
    /// Two separate exchanges: a concurrent writer may interleave.
    fn toggle(&self) -> Result<()> {
        let state = self.test()?;
        self.set_state(!state)
    }
}

/// A value that can be read.
pub trait Readable<V> {
    fn read(&self) -> Result<V>;
}

/// A value that can be written.
pub trait Writable<V> {
    fn write(&self, value: V) -> Result<()>;
}

/// A discrete input.
#[derive(Debug, Clone, Copy)]
pub struct RoBit<'a> {
    client: &'a Client,
    address: Address,
}

/// A coil.
#[derive(Debug, Clone, Copy)]
pub struct RwBit<'a> {
    client: &'a Client,
    address: Address,
}

/// An input register.
#[derive(Debug, Clone, Copy)]
pub struct RoRegister<'a> {
    client: &'a Client,
    address: Address,
}

/// A holding register.
#[derive(Debug, Clone, Copy)]
pub struct RwRegister<'a> {
    client: &'a Client,
    address: Address,
}

/// A block of input registers.
#[derive(Debug, Clone, Copy)]
pub struct RoRegisters<'a> {
    client: &'a Client,
    address: Address,
    count: Quantity,
}

/// A block of holding registers.
#[derive(Debug, Clone, Copy)]
pub struct RwRegisters<'a> {
    client: &'a Client,
    address: Address,
    count: Quantity,
}

impl Client {
    #[must_use]
    pub fn discrete_input(&self, address: Address) -> RoBit<'_> {
        RoBit {
            client: self,
            address,
        }
    }

    #[must_use]
    pub fn coil(&self, address: Address) -> RwBit<'_> {
        RwBit {
            client: self,
            address,
        }
    }

    #[must_use]
    pub fn input_register(&self, address: Address) -> RoRegister<'_> {
        RoRegister {
            client: self,
            address,
        }
    }

    #[must_use]
    pub fn holding_register(&self, address: Address) -> RwRegister<'_> {
        RwRegister {
            client: self,
            address,
        }
    }

    #[must_use]
    pub fn input_registers(&self, address: Address, count: Quantity) -> RoRegisters<'_> {
        RoRegisters {
            client: self,
            address,
            count,
        }
    }

    #[must_use]
    pub fn holding_registers(&self, address: Address, count: Quantity) -> RwRegisters<'_> {
        RwRegisters {
            client: self,
            address,
            count,
        }
    }
}

/// The only element of a single valued read.
fn single<T: Copy>(values: &[T]) -> T {
    // The response length has been checked against the quantity
    values[0]
}

impl Testable for RoBit<'_> {
    fn test(&self) -> Result<Coil> {
        let coils = self.client.read_discrete_inputs(self.address, 1)?;
        Ok(single(&coils))
    }
}

impl Testable for RwBit<'_> {
    fn test(&self) -> Result<Coil> {
        let coils = self.client.read_coils(self.address, 1)?;
        Ok(single(&coils))
    }
}

impl Settable for RwBit<'_> {
    fn set_state(&self, state: Coil) -> Result<()> {
        self.client.write_single_coil(self.address, state)
    }
}

impl Readable<Word> for RoRegister<'_> {
    fn read(&self) -> Result<Word> {
        let words = self.client.read_input_registers(self.address, 1)?;
        Ok(single(&words))
    }
}

impl Readable<Word> for RwRegister<'_> {
    fn read(&self) -> Result<Word> {
        let words = self.client.read_holding_registers(self.address, 1)?;
        Ok(single(&words))
    }
}

impl Writable<Word> for RwRegister<'_> {
    fn write(&self, word: Word) -> Result<()> {
        self.client.write_single_register(self.address, word)
    }
}

impl Readable<Vec<Word>> for RoRegisters<'_> {
    fn read(&self) -> Result<Vec<Word>> {
        self.client.read_input_registers(self.address, self.count)
    }
}

impl Readable<Vec<Word>> for RwRegisters<'_> {
    fn read(&self) -> Result<Vec<Word>> {
        self.client.read_holding_registers(self.address, self.count)
    }
}

impl Writable<&[Word]> for RwRegisters<'_> {
    /// Writes at most `count` words, starting at the first register.
    fn write(&self, words: &[Word]) -> Result<()> {
        if words.len() > usize::from(self.count) {
            return Err(ArgumentError::CapacityExceeded {
                count: words.len(),
                capacity: self.count,
            }
            .into());
        }
        self.client.write_multiple_registers(self.address, words)
    }
}

/// Interprets the words as big-endian bytes without trailing zeros.
fn words_to_string(words: &[Word]) -> String {
    let mut bytes = encode_words(words);
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

impl RoRegisters<'_> {
    pub fn read_string(&self) -> Result<String> {
        self.read().map(|words| words_to_string(&words))
    }
}

impl RwRegisters<'_> {
    pub fn read_string(&self) -> Result<String> {
        self.read().map(|words| words_to_string(&words))
    }

    /// Writes the bytes of `s`, the last word is zero padded.
    pub fn write_string(&self, s: &str) -> Result<()> {
        let words = decode_words(s.as_bytes());
        self.write(&words[..])
    }
}
