//! Read-only memory images (BIOS, option ROMs, test programs).

use rxt_core::logging::{log, LogCategory, LogLevel};
use rxt_core::{InstallError, Peripheral, Pointer, Processor, Slot};

pub struct Rom {
    label: String,
    base: Pointer,
    data: Vec<u8>,
}

impl Rom {
    pub fn new(label: impl Into<String>, base: Pointer, data: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            base,
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Peripheral for Rom {
    fn name(&self) -> &str {
        &self.label
    }

    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError> {
        let to = self.base.wrapping_add(self.data.len() as u32 - 1);
        cpu.install_memory_device(slot, self.base, to)
    }

    fn read_byte(&self, addr: Pointer) -> u8 {
        self.data[addr.linear().wrapping_sub(self.base.linear()) as usize % self.data.len()]
    }

    fn write_byte(&mut self, addr: Pointer, _value: u8) {
        log(LogCategory::Bus, LogLevel::Trace, || {
            format!("dropped write to ROM at {}", addr)
        });
    }
}
