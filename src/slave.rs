// SPDX-FileCopyrightText: Copyright (c) 2017-2025 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::fmt;

/// The raw unit identifier on the wire.
pub type SlaveId = u8;

/// The addressed device on a shared line or behind a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slave(pub SlaveId);

impl Slave {
    /// Addresses all devices on a serial line, none of them answers.
    #[must_use]
    pub const fn broadcast() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn min_device() -> Self {
        Self(1)
    }

    #[must_use]
    pub const fn max_device() -> Self {
        Self(247)
    }

    /// The unit identifier of a device that is reached directly
    /// over TCP and not through a gateway.
    #[must_use]
    pub const fn tcp_device() -> Self {
        Self(0xFF)
    }

    #[must_use]
    pub fn is_broadcast(self) -> bool {
        self == Self::broadcast()
    }

    #[must_use]
    pub fn is_single_device(self) -> bool {
        self >= Self::min_device() && self <= Self::max_device()
    }

    #[must_use]
    pub fn is_reserved(self) -> bool {
        self > Self::max_device()
    }
}

impl From<SlaveId> for Slave {
    fn from(from: SlaveId) -> Self {
        Self(from)
    }
}

impl From<Slave> for SlaveId {
    fn from(from: Slave) -> Self {
        from.0
    }
}

impl fmt::Display for Slave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:0>2X})", self.0, self.0)
    }
}

/// Selects the addressed device of a shared client session.
pub trait SlaveContext {
    /// Select a slave device for all subsequent outgoing requests.
    ///
    /// A request that is already in flight keeps its slave id.
    fn set_slave(&self, slave: Slave);

    /// The currently selected slave device.
    fn slave(&self) -> Slave;
}
