//! INT/IRET, handler interception, IRQ delivery, and guest-visible faults.

use std::cell::RefCell;
use std::rc::Rc;

use super::{cpu_with_program, run_until_halt, step_n, ORG_OFF, ORG_SEG};
use crate::cpu::Processor;
use crate::memory::Pointer;
use crate::peripheral::{InterruptController, InterruptHandler, StepError};
use crate::registers::{FLAG_CF, FLAG_IF, FLAG_OF, FLAG_TF};

/// Single-line test controller: one pending IRQ, fixed vector base 8.
struct TestPic {
    pending: Option<u8>,
    acked: Vec<u8>,
}

impl TestPic {
    fn new() -> Self {
        Self {
            pending: None,
            acked: Vec::new(),
        }
    }
}

impl InterruptController for TestPic {
    fn raise(&mut self, irq: u8) {
        self.pending = Some(irq);
    }

    fn next_pending(&mut self) -> Option<u8> {
        self.pending.map(|irq| 8 + irq)
    }

    fn ack(&mut self, vector: u8) -> u8 {
        self.pending = None;
        self.acked.push(vector);
        vector
    }
}

/// Writes a marker into BX so interception is observable.
struct MarkerHandler;

impl InterruptHandler for MarkerHandler {
    fn handle_interrupt(&mut self, cpu: &mut Processor, vector: u8) -> Result<(), StepError> {
        cpu.regs.bx = 0xCAFE;
        cpu.regs.set_al(vector);
        Ok(())
    }
}

fn set_ivt(cpu: &Processor, vector: u8, seg: u16, off: u16) {
    let entry = Pointer::from_linear(vector as u32 * 4);
    cpu.write_word(entry, off);
    cpu.write_word(entry.wrapping_add(2), seg);
}

#[test]
fn software_int_vectors_through_ivt() {
    // INT 0x20; handler at 0x2000:0x0010 does MOV BL, 7; IRET
    let mut cpu = cpu_with_program(&[0xCD, 0x20, 0xF4]);
    set_ivt(&cpu, 0x20, 0x2000, 0x0010);
    cpu.write_byte(Pointer::new(0x2000, 0x10), 0xB3);
    cpu.write_byte(Pointer::new(0x2000, 0x11), 0x07);
    cpu.write_byte(Pointer::new(0x2000, 0x12), 0xCF);

    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.cs, 0x2000);
    assert_eq!(cpu.regs.ip, 0x0010);
    assert!(!cpu.regs.flag(FLAG_IF));
    assert!(!cpu.regs.flag(FLAG_TF));

    run_until_halt(&mut cpu);
    assert_eq!(cpu.regs.bl(), 7);
    assert_eq!(cpu.regs.cs, ORG_SEG);
}

#[test]
fn int_iret_round_trip_restores_flags() {
    // STC; INT 0x21; HLT -- handler is a bare IRET
    let mut cpu = cpu_with_program(&[0xF9, 0xCD, 0x21, 0xF4]);
    set_ivt(&cpu, 0x21, 0x2000, 0x0000);
    cpu.write_byte(Pointer::new(0x2000, 0), 0xCF);

    let sp0 = cpu.regs.sp;
    run_until_halt(&mut cpu);
    assert!(cpu.regs.flag(FLAG_CF));
    assert_eq!(cpu.regs.sp, sp0);
    assert_eq!(cpu.regs.cs, ORG_SEG);
    assert_eq!(cpu.regs.ip, ORG_OFF + 4);
}

#[test]
fn handler_intercepts_before_vectoring() {
    // INT 0x60 with a registered handler: no stack push, no CS:IP change
    let mut cpu = cpu_with_program(&[0xCD, 0x60, 0xF4]);
    cpu.install_interrupt_handler(0x60, Rc::new(RefCell::new(MarkerHandler)));

    let sp0 = cpu.regs.sp;
    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.bx, 0xCAFE);
    assert_eq!(cpu.regs.al(), 0x60);
    assert_eq!(cpu.regs.sp, sp0);
    assert_eq!(cpu.regs.cs, ORG_SEG);
    assert_eq!(cpu.regs.ip, ORG_OFF + 2);
}

#[test]
fn hardware_irq_delivered_at_instruction_boundary() {
    // STI; NOP; NOP; CLI; HLT -- IRQ 0 (vector 8) raised before the first step
    let mut cpu = cpu_with_program(&[0xFB, 0x90, 0x90, 0xFA, 0xF4]);
    let pic = Rc::new(RefCell::new(TestPic::new()));
    cpu.set_interrupt_controller(pic.clone());
    set_ivt(&cpu, 8, 0x2000, 0x0000);
    cpu.write_byte(Pointer::new(0x2000, 0), 0xCF); // IRET

    pic.borrow_mut().raise(0);
    // IF is clear out of reset: the IRQ waits until STI takes effect.
    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.cs, ORG_SEG);

    // Next boundary: vector 8 is acknowledged and the handler's IRET runs
    // within the same step, returning to the interrupted stream.
    step_n(&mut cpu, 1);
    assert_eq!(pic.borrow().acked, vec![8]);
    assert_eq!(cpu.regs.cs, ORG_SEG);
    run_until_halt(&mut cpu);
}

#[test]
fn halted_cpu_wakes_on_interrupt() {
    // STI; HLT; MOV BL, 1; HLT
    let mut cpu = cpu_with_program(&[0xFB, 0xF4, 0xB3, 0x01, 0xF4]);
    let pic = Rc::new(RefCell::new(TestPic::new()));
    cpu.set_interrupt_controller(pic.clone());
    set_ivt(&cpu, 8, 0x2000, 0x0000);
    cpu.write_byte(Pointer::new(0x2000, 0), 0xCF);

    step_n(&mut cpu, 2); // STI, HLT
    assert!(cpu.regs.halted);

    // Idle steps burn cycles but stay halted.
    step_n(&mut cpu, 3);
    assert!(cpu.regs.halted);

    pic.borrow_mut().raise(0);
    // One step: halt cleared, vectoring, and the handler's IRET.
    step_n(&mut cpu, 1);
    assert!(!cpu.regs.halted);
    assert_eq!(cpu.regs.cs, ORG_SEG);

    step_n(&mut cpu, 1); // MOV BL, 1 past the HLT
    assert_eq!(cpu.regs.bl(), 1);
}

#[test]
fn hlt_with_interrupts_disabled_is_fatal() {
    let mut cpu = cpu_with_program(&[0xF4]);
    assert_eq!(cpu.step().unwrap_err(), StepError::CpuHalt);
}

#[test]
fn divide_by_zero_injects_vector_zero() {
    // MOV BL, 0; DIV BL; HLT -- vector 0 handler sets a marker
    let mut cpu = cpu_with_program(&[0xB3, 0x00, 0xF6, 0xF3, 0xF4]);
    set_ivt(&cpu, 0, 0x2000, 0x0000);
    // MOV DL, 0xEE; IRET
    cpu.write_byte(Pointer::new(0x2000, 0), 0xB2);
    cpu.write_byte(Pointer::new(0x2000, 1), 0xEE);
    cpu.write_byte(Pointer::new(0x2000, 2), 0xCF);

    run_until_halt(&mut cpu);
    assert_eq!(cpu.regs.dl(), 0xEE);
}

#[test]
fn quotient_overflow_injects_vector_zero() {
    // MOV AX, 0x1000; MOV BL, 1; DIV BL -- quotient > 0xFF
    let mut cpu = cpu_with_program(&[0xB8, 0x00, 0x10, 0xB3, 0x01, 0xF6, 0xF3, 0xF4]);
    set_ivt(&cpu, 0, 0x2000, 0x0000);
    cpu.write_byte(Pointer::new(0x2000, 0), 0xB2);
    cpu.write_byte(Pointer::new(0x2000, 1), 0xEE);
    cpu.write_byte(Pointer::new(0x2000, 2), 0xCF);

    run_until_halt(&mut cpu);
    assert_eq!(cpu.regs.dl(), 0xEE);
    assert_eq!(cpu.regs.ax, 0x1000); // operands untouched on fault
}

#[test]
fn into_fires_only_on_overflow() {
    // MOV AL, 0x7F; ADD AL, 1 (sets OF); INTO; HLT
    let mut cpu = cpu_with_program(&[0xB0, 0x7F, 0x04, 0x01, 0xCE, 0xF4]);
    set_ivt(&cpu, 4, 0x2000, 0x0000);
    cpu.write_byte(Pointer::new(0x2000, 0), 0xB2);
    cpu.write_byte(Pointer::new(0x2000, 1), 0x44);
    cpu.write_byte(Pointer::new(0x2000, 2), 0xCF);

    run_until_halt(&mut cpu);
    assert_eq!(cpu.regs.dl(), 0x44);

    // Without overflow INTO is a fall-through.
    let mut cpu = cpu_with_program(&[0xB0, 0x01, 0x04, 0x01, 0xCE, 0xF4]);
    run_until_halt(&mut cpu);
    assert!(!cpu.regs.flag(FLAG_OF));
    assert_eq!(cpu.regs.dl(), 0);
}

#[test]
fn int3_uses_vector_three() {
    let mut cpu = cpu_with_program(&[0xCC, 0xF4]);
    set_ivt(&cpu, 3, 0x2000, 0x0000);
    cpu.write_byte(Pointer::new(0x2000, 0), 0xB2);
    cpu.write_byte(Pointer::new(0x2000, 1), 0x33);
    cpu.write_byte(Pointer::new(0x2000, 2), 0xCF);

    run_until_halt(&mut cpu);
    assert_eq!(cpu.regs.dl(), 0x33);
}

#[test]
fn invalid_opcode_is_reported() {
    // 0x0F is an extended opcode under V20 support and must fault there.
    let mut cpu = cpu_with_program(&[0x0F]);
    cpu.set_v20_support(true);
    match cpu.step() {
        Err(StepError::InvalidOpcode { opcode, cs, ip }) => {
            assert_eq!(opcode, 0x0F);
            assert_eq!(cs, ORG_SEG);
            assert_eq!(ip, ORG_OFF);
        }
        other => panic!("expected InvalidOpcode, got {:?}", other),
    }
}

#[test]
fn rep_movsb_interrupted_at_iteration_boundary() {
    // STI; REP MOVSB with CX = 4; an IRQ arrives after the first iteration
    // and is serviced with CX preserved at the remaining count.
    let mut cpu = cpu_with_program(&[0xFB, 0xF3, 0xA4, 0xFA, 0xF4]);
    let pic = Rc::new(RefCell::new(TestPic::new()));
    cpu.set_interrupt_controller(pic.clone());
    set_ivt(&cpu, 8, 0x2000, 0x0000);
    // Handler records CX into DX, then IRET.
    cpu.write_byte(Pointer::new(0x2000, 0), 0x89); // MOV DX, CX
    cpu.write_byte(Pointer::new(0x2000, 1), 0xCA);
    cpu.write_byte(Pointer::new(0x2000, 2), 0xCF); // IRET

    cpu.regs.si = 0x400;
    cpu.regs.di = 0x500;
    cpu.regs.cx = 4;

    step_n(&mut cpu, 1); // STI
    step_n(&mut cpu, 1); // first MOVSB iteration, CX 4 -> 3, IP rewound
    assert_eq!(cpu.regs.cx, 3);

    pic.borrow_mut().raise(0);
    // Vectoring and the handler's first instruction share one step.
    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.dx, 3); // CX observed unchanged by the handler
    step_n(&mut cpu, 1); // IRET back onto the prefix

    // The string instruction resumes and finishes.
    while cpu.regs.cx != 0 {
        step_n(&mut cpu, 1);
    }
    assert_eq!(cpu.regs.di, 0x504);
    run_until_halt(&mut cpu);
}
