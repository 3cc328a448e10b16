//! The peripheral framework: lifecycle, bus capabilities, and the interrupt
//! controller contract.
//!
//! A peripheral is anything the processor can own: RAM, ROM, the PIC, the
//! video adapter, the debugger overlay. One trait carries both the lifecycle
//! (`install`/`reset`/`step`/`close`) and the bus capabilities, with open-bus
//! defaults so a device only overrides what it actually decodes.
//!
//! Devices are held by the processor as `Rc<RefCell<_>>` for its whole
//! lifetime. They never store a back-pointer to the processor; `install`,
//! `step`, and interrupt handlers receive it as a parameter instead.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;

use crate::cpu::Processor;
use crate::memory::Pointer;

/// Index of a device in the processor's device table. Slot 0 is the open
/// bus.
pub type Slot = u16;

/// Shared handle to an installed device.
pub type DeviceRef = Rc<RefCell<dyn Peripheral>>;

/// Errors raised while wiring devices into the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("memory range {from}..={to} overlaps an installed device")]
    AddressOverlap { from: Pointer, to: Pointer },
    #[error("io port range {from:#06X}..={to:#06X} overlaps an installed device")]
    PortOverlap { from: u16, to: u16 },
}

/// Errors raised while stepping the machine. `CpuHalt` and `DebugQuit` are
/// normal termination signals, not faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StepError {
    #[error("invalid opcode {opcode:#04X} at {cs:04X}:{ip:04X}")]
    InvalidOpcode { opcode: u8, cs: u16, ip: u16 },
    #[error("cpu halted")]
    CpuHalt,
    #[error("debugger quit")]
    DebugQuit,
    #[error("device io error: {0}")]
    DeviceIo(String),
}

/// A device the processor owns and routes bus traffic to.
pub trait Peripheral {
    /// Display name, used by the debugger's memory map.
    fn name(&self) -> &str;

    /// Claim bus ranges and start background work. Called exactly once, with
    /// the slot this device was assigned in the processor's table.
    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError>;

    /// Return to power-on state. Must not depend on install order.
    fn reset(&mut self) {}

    /// Advance device time by the cycle cost of the last instruction.
    fn step(&mut self, _cpu: &mut Processor, _cycles: u32) -> Result<(), StepError> {
        Ok(())
    }

    /// Stop background work. Called once at shutdown.
    fn close(&mut self) {}

    /// Memory read. Open bus reads 0xFF.
    fn read_byte(&self, _addr: Pointer) -> u8 {
        0xFF
    }

    /// Memory write. Open bus drops writes.
    fn write_byte(&mut self, _addr: Pointer, _value: u8) {}

    /// Port read. Unmapped ports read 0.
    fn io_in(&mut self, _port: u16) -> u8 {
        0
    }

    /// Port write. Unmapped ports drop writes.
    fn io_out(&mut self, _port: u16, _value: u8) {}
}

/// The PIC as seen from the processor's instruction boundary.
pub trait InterruptController {
    /// Assert an IRQ line.
    fn raise(&mut self, irq: u8);

    /// The vector of the highest-priority pending, unmasked, unserviced IRQ,
    /// if any. Does not change controller state.
    fn next_pending(&mut self) -> Option<u8>;

    /// Acknowledge `vector`: move it from requested to in-service. Returns
    /// the vector to dispatch, which is the spurious vector if the request
    /// vanished before the acknowledge.
    fn ack(&mut self, vector: u8) -> u8;
}

/// Intercepts a software `INT n` before it vectors through the IVT. The
/// handler works on registers and memory directly and the instruction
/// completes without touching CS:IP or the stack.
pub trait InterruptHandler {
    fn handle_interrupt(&mut self, cpu: &mut Processor, vector: u8) -> Result<(), StepError>;
}

/// Shared handle to the machine's interrupt controller.
pub type InterruptControllerRef = Rc<RefCell<dyn InterruptController>>;

/// Shared handle to a software-interrupt handler.
pub type InterruptHandlerRef = Rc<RefCell<dyn InterruptHandler>>;
