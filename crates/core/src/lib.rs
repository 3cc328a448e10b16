//! RXT emulation core.
//!
//! The core models an 8088/V20-class processor with a 1 MiB address space and
//! port-mapped I/O. Pluggable peripherals claim byte and port ranges on the
//! two bus tables; the processor dispatches every access to the owning
//! device, polls the interrupt controller at instruction boundaries, and
//! drives peripheral time in the same step loop.

pub mod bus;
pub mod cpu;
#[cfg(test)]
mod cpu_tests;
pub mod logging;
pub mod memory;
pub mod peripheral;
pub mod registers;

pub use cpu::{Processor, ScratchRam, Stats};
pub use memory::{Pointer, ADDRESS_SPACE};
pub use peripheral::{
    DeviceRef, InstallError, InterruptController, InterruptControllerRef, InterruptHandler,
    InterruptHandlerRef, Peripheral, Slot, StepError,
};
pub use registers::Registers;
