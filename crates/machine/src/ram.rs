//! Conventional memory.
//!
//! Power-on contents are scrambled to mimic real DRAM; test setups use the
//! cleared constructor for deterministic memory images. Warm reset leaves a
//! scrambled device untouched (garbage survives reset on hardware) and
//! re-zeroes a cleared one, so reset stays deterministic either way.

use rand::RngCore;

use rxt_core::{InstallError, Peripheral, Pointer, Processor, Slot};

pub struct Ram {
    base: Pointer,
    data: Vec<u8>,
    clear: bool,
}

impl Ram {
    /// RAM with scrambled power-on contents.
    pub fn new(base: Pointer, size: usize) -> Self {
        let mut data = vec![0u8; size];
        rand::thread_rng().fill_bytes(&mut data);
        Self {
            base,
            data,
            clear: false,
        }
    }

    /// Zero-filled RAM for deterministic test setups.
    pub fn cleared(base: Pointer, size: usize) -> Self {
        Self {
            base,
            data: vec![0u8; size],
            clear: true,
        }
    }

    #[inline]
    fn index(&self, addr: Pointer) -> usize {
        addr.linear().wrapping_sub(self.base.linear()) as usize % self.data.len()
    }
}

impl Peripheral for Ram {
    fn name(&self) -> &str {
        "RAM"
    }

    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError> {
        let to = self.base.wrapping_add(self.data.len() as u32 - 1);
        cpu.install_memory_device(slot, self.base, to)
    }

    fn reset(&mut self) {
        if self.clear {
            self.data.fill(0);
        }
    }

    fn read_byte(&self, addr: Pointer) -> u8 {
        self.data[self.index(addr)]
    }

    fn write_byte(&mut self, addr: Pointer, value: u8) {
        let i = self.index(addr);
        self.data[i] = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn cleared_ram_reads_zero() {
        let mut cpu = Processor::new();
        cpu.install(Rc::new(RefCell::new(Ram::cleared(
            Pointer::from_linear(0),
            0x1000,
        ))))
        .unwrap();
        assert_eq!(cpu.read_byte(Pointer::from_linear(0x123)), 0);
    }

    #[test]
    fn reads_back_writes() {
        let mut cpu = Processor::new();
        cpu.install(Rc::new(RefCell::new(Ram::new(
            Pointer::from_linear(0x1000),
            0x1000,
        ))))
        .unwrap();
        cpu.write_byte(Pointer::from_linear(0x1800), 0x5A);
        assert_eq!(cpu.read_byte(Pointer::from_linear(0x1800)), 0x5A);
    }

    #[test]
    fn cleared_ram_rezeroes_on_reset() {
        let mut ram = Ram::cleared(Pointer::from_linear(0), 0x100);
        ram.write_byte(Pointer::from_linear(0x10), 0xAA);
        ram.reset();
        assert_eq!(ram.read_byte(Pointer::from_linear(0x10)), 0);
    }

    #[test]
    fn scrambled_ram_survives_reset() {
        let mut ram = Ram::new(Pointer::from_linear(0), 0x100);
        ram.write_byte(Pointer::from_linear(0x10), 0xAA);
        ram.reset();
        assert_eq!(ram.read_byte(Pointer::from_linear(0x10)), 0xAA);
    }
}
