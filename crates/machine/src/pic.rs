//! Programmable interrupt controller: the 8259A subset an XT-class machine
//! uses.
//!
//! One controller, eight lines, command/data ports 0x20/0x21. The guest
//! programs it with the ICW1-ICW4 sequence and then talks OCWs: OCW1 is the
//! mask, OCW2 carries EOI, OCW3 selects which register a command-port read
//! returns. The processor polls [`InterruptController::next_pending`] at
//! every instruction boundary and acknowledges with `ack`, which hands back
//! the spurious vector (base+7) if the request disappeared in between.
//!
//! Priority is fixed: the lowest IRQ index wins, and a bit still in service
//! blocks every lower-priority line until the guest signals EOI.

use rxt_core::logging::{log, LogCategory, LogLevel};
use rxt_core::{InstallError, InterruptController, Peripheral, Processor, Slot};

const PORT_COMMAND: u16 = 0x20;
const PORT_DATA: u16 = 0x21;

/// Initialization sequence position after an ICW1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InitState {
    Ready,
    ExpectIcw2,
    ExpectIcw3,
    ExpectIcw4,
}

pub struct Pic {
    /// Interrupt request register: lines raised, not yet acknowledged.
    irr: u8,
    /// In-service register: acknowledged, waiting for EOI.
    isr: u8,
    /// Interrupt mask register (OCW1).
    imr: u8,
    /// Vector base from ICW2. The BIOS maps IRQ 0-7 to vectors 8-15.
    base: u8,
    init: InitState,
    /// ICW1 bit 0: an ICW4 write follows the sequence.
    expect_icw4: bool,
    /// ICW1 bit 1: single controller, no ICW3.
    single: bool,
    /// OCW3 selector: command-port reads return ISR instead of IRR.
    read_isr: bool,
}

impl Default for Pic {
    fn default() -> Self {
        Self::new()
    }
}

impl Pic {
    pub fn new() -> Self {
        Self {
            irr: 0,
            isr: 0,
            imr: 0,
            base: 8,
            init: InitState::Ready,
            expect_icw4: false,
            single: true,
            read_isr: false,
        }
    }

    fn command_write(&mut self, value: u8) {
        if value & 0x10 != 0 {
            // ICW1 restarts the initialization sequence and clears state.
            self.expect_icw4 = value & 0x01 != 0;
            self.single = value & 0x02 != 0;
            self.init = InitState::ExpectIcw2;
            self.irr = 0;
            self.isr = 0;
            self.imr = 0;
            self.read_isr = false;
            log(LogCategory::Interrupts, LogLevel::Trace, || {
                format!("ICW1 {:#04X}", value)
            });
        } else if value & 0x08 != 0 {
            // OCW3: register read-back select.
            if value & 0x02 != 0 {
                self.read_isr = value & 0x01 != 0;
            }
        } else {
            // OCW2: EOI forms.
            match value & 0xE0 {
                0x20 => {
                    // Non-specific EOI clears the highest-priority bit in
                    // service.
                    for i in 0..8 {
                        let mask = 1 << i;
                        if self.isr & mask != 0 {
                            self.isr &= !mask;
                            break;
                        }
                    }
                }
                0x60 => {
                    // Specific EOI.
                    self.isr &= !(1 << (value & 0x07));
                }
                _ => {}
            }
        }
    }

    fn data_write(&mut self, value: u8) {
        match self.init {
            InitState::ExpectIcw2 => {
                self.base = value & 0xF8;
                self.init = if self.single {
                    if self.expect_icw4 {
                        InitState::ExpectIcw4
                    } else {
                        InitState::Ready
                    }
                } else {
                    InitState::ExpectIcw3
                };
            }
            InitState::ExpectIcw3 => {
                self.init = if self.expect_icw4 {
                    InitState::ExpectIcw4
                } else {
                    InitState::Ready
                };
            }
            InitState::ExpectIcw4 => {
                self.init = InitState::Ready;
            }
            InitState::Ready => {
                // OCW1.
                self.imr = value;
            }
        }
    }
}

impl Peripheral for Pic {
    fn name(&self) -> &str {
        "Programmable Interrupt Controller"
    }

    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError> {
        cpu.install_io_device(slot, PORT_COMMAND, PORT_DATA)
    }

    fn reset(&mut self) {
        *self = Pic::new();
    }

    fn io_in(&mut self, port: u16) -> u8 {
        match port {
            PORT_COMMAND => {
                if self.read_isr {
                    self.isr
                } else {
                    self.irr
                }
            }
            _ => self.imr,
        }
    }

    fn io_out(&mut self, port: u16, value: u8) {
        match port {
            PORT_COMMAND => self.command_write(value),
            _ => self.data_write(value),
        }
    }
}

impl InterruptController for Pic {
    fn raise(&mut self, irq: u8) {
        self.irr |= 1 << (irq & 7);
    }

    fn next_pending(&mut self) -> Option<u8> {
        for i in 0..8 {
            let mask = 1 << i;
            // A line in service blocks itself and everything below it.
            if self.isr & mask != 0 {
                return None;
            }
            if self.irr & mask != 0 && self.imr & mask == 0 {
                return Some(self.base + i);
            }
        }
        None
    }

    fn ack(&mut self, vector: u8) -> u8 {
        let irq = vector.wrapping_sub(self.base) & 7;
        let mask = 1 << irq;
        if self.irr & mask == 0 {
            // The request vanished before the acknowledge.
            return self.base + 7;
        }
        self.irr &= !mask;
        self.isr |= mask;
        vector
    }
}
