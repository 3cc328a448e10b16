//! Memory and IO bus fabric.
//!
//! Both buses are dense tables mapping every address (2^20 bytes) or port
//! (2^16 ports) to the slot of its owning device, so dispatch is a single
//! indexed load. Slot 0 is reserved for the open bus; claiming a range that
//! contains any non-open-bus entry fails with the matching overlap error.
//!
//! The debugger overlay is the one device allowed to take over an owned
//! range: it snapshots the previous owners first, then uses [`MemoryBus::claim_all`].

use crate::memory::{Pointer, ADDRESS_SPACE};
use crate::peripheral::{InstallError, Slot};

/// Slot of the built-in open-bus device.
pub const OPEN_BUS_SLOT: Slot = 0;

const PORT_SPACE: usize = 0x1_0000;

/// Byte-granular owner table for the 1 MiB address space.
pub struct MemoryBus {
    map: Vec<Slot>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            map: vec![OPEN_BUS_SLOT; ADDRESS_SPACE],
        }
    }

    /// Claim the inclusive range `from..=to` for `slot`.
    pub fn claim(&mut self, slot: Slot, from: Pointer, to: Pointer) -> Result<(), InstallError> {
        let (lo, hi) = (from.index(), to.index());
        if self.map[lo..=hi].iter().any(|&s| s != OPEN_BUS_SLOT) {
            return Err(InstallError::AddressOverlap { from, to });
        }
        self.map[lo..=hi].fill(slot);
        Ok(())
    }

    /// Overlay path for the debugger: take ownership of the whole space,
    /// previous owners included.
    pub fn claim_all(&mut self, slot: Slot) {
        self.map.fill(slot);
    }

    /// The slot owning `addr`.
    #[inline]
    pub fn owner(&self, addr: Pointer) -> Slot {
        self.map[addr.index()]
    }
}

/// Port owner table for the 64 Ki port space.
pub struct IoBus {
    map: Vec<Slot>,
}

impl Default for IoBus {
    fn default() -> Self {
        Self::new()
    }
}

impl IoBus {
    pub fn new() -> Self {
        Self {
            map: vec![OPEN_BUS_SLOT; PORT_SPACE],
        }
    }

    /// Claim the inclusive port range `from..=to` for `slot`.
    pub fn claim(&mut self, slot: Slot, from: u16, to: u16) -> Result<(), InstallError> {
        let (lo, hi) = (from as usize, to as usize);
        if self.map[lo..=hi].iter().any(|&s| s != OPEN_BUS_SLOT) {
            return Err(InstallError::PortOverlap { from, to });
        }
        self.map[lo..=hi].fill(slot);
        Ok(())
    }

    /// The slot owning `port`.
    #[inline]
    pub fn owner(&self, port: u16) -> Slot {
        self.map[port as usize]
    }
}
