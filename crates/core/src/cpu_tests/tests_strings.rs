//! String instructions and REP repeat semantics.

use super::{cpu_with_program, step_n};
use crate::memory::Pointer;
use crate::registers::{FLAG_DF, FLAG_ZF};

#[test]
fn movsb_copies_one_byte_forward() {
    // MOVSB with DS:SI = 0:0x400, ES:DI = 0:0x500
    let mut cpu = cpu_with_program(&[0xA4]);
    cpu.regs.si = 0x400;
    cpu.regs.di = 0x500;
    cpu.write_byte(Pointer::from_linear(0x400), 0xAB);
    step_n(&mut cpu, 1);
    assert_eq!(cpu.read_byte(Pointer::from_linear(0x500)), 0xAB);
    assert_eq!(cpu.regs.si, 0x401);
    assert_eq!(cpu.regs.di, 0x501);
}

#[test]
fn movsw_respects_direction_flag() {
    // STD; MOVSW
    let mut cpu = cpu_with_program(&[0xFD, 0xA5]);
    cpu.regs.si = 0x400;
    cpu.regs.di = 0x500;
    cpu.write_word(Pointer::from_linear(0x400), 0x1234);
    step_n(&mut cpu, 2);
    assert!(cpu.regs.flag(FLAG_DF));
    assert_eq!(cpu.read_word(Pointer::from_linear(0x500)), 0x1234);
    assert_eq!(cpu.regs.si, 0x3FE);
    assert_eq!(cpu.regs.di, 0x4FE);
}

#[test]
fn rep_movsb_copies_block() {
    // REP MOVSB, CX = 8
    let mut cpu = cpu_with_program(&[0xF3, 0xA4]);
    cpu.regs.si = 0x400;
    cpu.regs.di = 0x500;
    cpu.regs.cx = 8;
    for i in 0..8u32 {
        cpu.write_byte(Pointer::from_linear(0x400 + i), i as u8 + 1);
    }

    // One iteration per step; IP rewinds until CX runs out.
    while cpu.regs.cx != 0 {
        step_n(&mut cpu, 1);
    }
    for i in 0..8u32 {
        assert_eq!(cpu.read_byte(Pointer::from_linear(0x500 + i)), i as u8 + 1);
    }
    assert_eq!(cpu.regs.si, 0x408);
    assert_eq!(cpu.regs.di, 0x508);
    // IP has moved past the instruction only after the last iteration.
    assert_eq!(cpu.regs.ip, super::ORG_OFF + 2);
}

#[test]
fn rep_with_zero_count_is_a_nop() {
    // REP STOSB with CX = 0
    let mut cpu = cpu_with_program(&[0xF3, 0xAA]);
    cpu.regs.di = 0x500;
    cpu.regs.cx = 0;
    cpu.regs.set_al(0xEE);
    step_n(&mut cpu, 1);
    assert_eq!(cpu.read_byte(Pointer::from_linear(0x500)), 0);
    assert_eq!(cpu.regs.di, 0x500);
}

#[test]
fn rep_stosw_fills_words() {
    // REP STOSW, CX = 4, AX = 0xBEEF
    let mut cpu = cpu_with_program(&[0xF3, 0xAB]);
    cpu.regs.di = 0x600;
    cpu.regs.cx = 4;
    cpu.regs.ax = 0xBEEF;
    while cpu.regs.cx != 0 {
        step_n(&mut cpu, 1);
    }
    for i in 0..4u32 {
        assert_eq!(cpu.read_word(Pointer::from_linear(0x600 + i * 2)), 0xBEEF);
    }
}

#[test]
fn repe_cmpsb_stops_at_mismatch() {
    // REPE CMPSB over "ABCX" vs "ABCY", CX = 4
    let mut cpu = cpu_with_program(&[0xF3, 0xA6]);
    cpu.regs.si = 0x400;
    cpu.regs.di = 0x500;
    cpu.regs.cx = 4;
    for (i, b) in b"ABCX".iter().enumerate() {
        cpu.write_byte(Pointer::from_linear(0x400 + i as u32), *b);
    }
    for (i, b) in b"ABCY".iter().enumerate() {
        cpu.write_byte(Pointer::from_linear(0x500 + i as u32), *b);
    }

    // Three matching iterations, the fourth mismatches and stops the repeat.
    for _ in 0..4 {
        step_n(&mut cpu, 1);
    }
    assert_eq!(cpu.regs.cx, 0);
    assert!(!cpu.regs.flag(FLAG_ZF));
    assert_eq!(cpu.regs.ip, super::ORG_OFF + 2);
}

#[test]
fn repne_scasb_finds_byte() {
    // REPNE SCASB hunting for AL = 'C' in "ABCD", CX = 4
    let mut cpu = cpu_with_program(&[0xF2, 0xAE]);
    cpu.regs.di = 0x500;
    cpu.regs.cx = 4;
    cpu.regs.set_al(b'C');
    for (i, b) in b"ABCD".iter().enumerate() {
        cpu.write_byte(Pointer::from_linear(0x500 + i as u32), *b);
    }

    for _ in 0..3 {
        step_n(&mut cpu, 1);
    }
    // Found at the third element: CX counted down to 1, DI one past the hit.
    assert_eq!(cpu.regs.cx, 1);
    assert_eq!(cpu.regs.di, 0x503);
    assert!(cpu.regs.flag(FLAG_ZF));
}

#[test]
fn lodsb_loads_and_advances() {
    let mut cpu = cpu_with_program(&[0xAC]);
    cpu.regs.si = 0x400;
    cpu.write_byte(Pointer::from_linear(0x400), 0x42);
    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.al(), 0x42);
    assert_eq!(cpu.regs.si, 0x401);
}

#[test]
fn rep_reapplies_segment_override_each_iteration() {
    // ES: REP MOVSB -- the override must survive the IP rewind
    let mut cpu = cpu_with_program(&[0x26, 0xF3, 0xA4]);
    cpu.regs.es = 0x3000;
    cpu.regs.si = 0x10;
    cpu.regs.di = 0x20;
    cpu.regs.cx = 2;
    cpu.write_byte(Pointer::new(0x3000, 0x10), 0x11);
    cpu.write_byte(Pointer::new(0x3000, 0x11), 0x22);

    while cpu.regs.cx != 0 {
        step_n(&mut cpu, 1);
    }
    // Source read from ES:SI, destination always ES:DI.
    assert_eq!(cpu.read_byte(Pointer::new(0x3000, 0x20)), 0x11);
    assert_eq!(cpu.read_byte(Pointer::new(0x3000, 0x21)), 0x22);
}

#[test]
fn rep_iteration_preserves_cx_for_resume() {
    // A REP MOVSB interrupted between iterations resumes with the remaining
    // count: stepping once leaves CX = 2 and IP back on the prefix.
    let mut cpu = cpu_with_program(&[0xF3, 0xA4]);
    cpu.regs.si = 0x400;
    cpu.regs.di = 0x500;
    cpu.regs.cx = 3;
    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.cx, 2);
    assert_eq!(cpu.regs.ip, super::ORG_OFF);
}

#[test]
fn plain_scasw_compares_once() {
    let mut cpu = cpu_with_program(&[0xAF]);
    cpu.regs.di = 0x500;
    cpu.regs.ax = 0x1234;
    cpu.write_word(Pointer::from_linear(0x500), 0x1234);
    step_n(&mut cpu, 1);
    assert!(cpu.regs.flag(FLAG_ZF));
    assert_eq!(cpu.regs.di, 0x502);
}

#[test]
fn rep_before_non_string_instruction_is_ignored() {
    // REP MOV AL, 5 -- the prefix applies to nothing and the MOV executes
    let mut cpu = cpu_with_program(&[0xF3, 0xB0, 0x05]);
    step_n(&mut cpu, 1);
    assert_eq!(cpu.regs.al(), 5);
}
