//! Interpreter tests, organized by instruction family:
//! - `tests_alu`: arithmetic, logic, shifts, BCD adjust, multiply/divide
//! - `tests_flow`: jumps, calls, stack, flag transfer
//! - `tests_strings`: string instructions and REP semantics
//! - `tests_interrupts`: INT/IRET, handler interception, IRQ delivery, faults
//! - `tests_v20`: 80186/V20 extensions and the 8088 alias opcodes

use std::cell::RefCell;
use std::rc::Rc;

use crate::cpu::{Processor, ScratchRam};
use crate::memory::{Pointer, ADDRESS_SPACE};
use crate::peripheral::StepError;

mod tests_alu;
mod tests_flow;
mod tests_interrupts;
mod tests_strings;
mod tests_v20;

/// Origin used by [`cpu_with_program`]: programs run at F000:0100.
pub const ORG_SEG: u16 = 0xF000;
pub const ORG_OFF: u16 = 0x0100;

/// A processor with flat RAM over the whole address space and `program`
/// loaded at F000:0100, ready to step.
pub fn cpu_with_program(program: &[u8]) -> Processor {
    let mut cpu = Processor::new();
    cpu.install(Rc::new(RefCell::new(ScratchRam::new(
        Pointer::from_linear(0),
        ADDRESS_SPACE,
    ))))
    .unwrap();

    for (i, b) in program.iter().enumerate() {
        cpu.write_byte(Pointer::new(ORG_SEG, ORG_OFF + i as u16), *b);
    }
    cpu.regs.cs = ORG_SEG;
    cpu.regs.ip = ORG_OFF;
    cpu.regs.ss = 0x0000;
    cpu.regs.sp = 0xFFFE;
    cpu
}

/// Step `n` instructions, panicking on any error.
pub fn step_n(cpu: &mut Processor, n: usize) {
    for i in 0..n {
        if let Err(e) = cpu.step() {
            panic!("step {} failed: {}", i, e);
        }
    }
}

/// Run until HLT raises `CpuHalt`; anything else is a test failure.
pub fn run_until_halt(cpu: &mut Processor) {
    loop {
        match cpu.step() {
            Ok(_) => {}
            Err(StepError::CpuHalt) => return,
            Err(e) => panic!("unexpected step error: {}", e),
        }
    }
}
