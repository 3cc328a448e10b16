//! Program-level seed suite.
//!
//! Each scenario builds a 64 KiB boot image mapped at F000:0000 whose reset
//! vector jumps to hand-assembled code at the image start, runs the machine
//! until HLT, and verifies low memory. When a `testdata/` directory with the
//! classic golden test binaries is present, the same harness runs them and
//! compares low memory against the recorded result blobs.

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use rxt_core::{Pointer, Processor, StepError};
use rxt_machine::{Pic, Ram, Rom};

const ROM_SEG: u16 = 0xF000;

/// 64 KiB image with `code` at offset 0 and a far jump to it at the reset
/// vector offset.
fn boot_image(code: &[u8]) -> Vec<u8> {
    let mut image = vec![0u8; 0x1_0000];
    image[..code.len()].copy_from_slice(code);
    // jmp F000:0000
    image[0xFFF0..0xFFF5].copy_from_slice(&[0xEA, 0x00, 0x00, 0x00, 0xF0]);
    image
}

fn run_image(image: Vec<u8>, label: &str) -> Processor {
    let mut cpu = Processor::new();
    cpu.install(Rc::new(RefCell::new(Ram::cleared(
        Pointer::from_linear(0),
        0xA0000,
    ))))
    .unwrap();
    cpu.install(Rc::new(RefCell::new(Rom::new(
        label,
        Pointer::new(ROM_SEG, 0),
        image,
    ))))
    .unwrap();
    let pic = Rc::new(RefCell::new(Pic::new()));
    cpu.install(pic.clone()).unwrap();
    cpu.set_interrupt_controller(pic);

    // The classic test programs are written for 80186-class machines.
    cpu.set_v20_support(true);
    cpu.reset();
    cpu.regs.cs = ROM_SEG;
    cpu.regs.ip = 0xFFF0;

    loop {
        match cpu.step() {
            Ok(_) => assert!(!cpu.regs.debug, "cpu hit a breakpoint"),
            Err(StepError::CpuHalt) => break,
            Err(e) => panic!("{}: {}", label, e),
        }
    }
    cpu
}

fn expect_low_memory(cpu: &Processor, expected: &[(u16, u8)]) {
    for &(offset, value) in expected {
        let got = cpu.read_byte(Pointer::new(0, offset));
        assert_eq!(
            got, value,
            "offset 0x{:X}: got 0x{:X}, expected 0x{:X}",
            offset, got, value,
        );
    }
}

#[test]
fn add_and_carry_chain() {
    let code = [
        0xB0, 0x12, // mov al, 0x12
        0x04, 0x34, // add al, 0x34
        0xA2, 0x10, 0x00, // mov [0x10], al
        0xB8, 0xFF, 0x00, // mov ax, 0x00FF
        0x05, 0x01, 0x00, // add ax, 1
        0xA3, 0x11, 0x00, // mov [0x11], ax
        0xB3, 0xFF, // mov bl, 0xFF
        0x80, 0xC3, 0x01, // add bl, 1 (sets CF)
        0xB0, 0x00, // mov al, 0
        0x14, 0x00, // adc al, 0 -> carry lands in al
        0xA2, 0x15, 0x00, // mov [0x15], al
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: add");
    expect_low_memory(
        &cpu,
        &[(0x10, 0x46), (0x11, 0x00), (0x12, 0x01), (0x15, 0x01)],
    );
}

#[test]
fn bitwise_operations() {
    let code = [
        0xB0, 0xCA, // mov al, 0xCA
        0x24, 0xF0, // and al, 0xF0
        0xA2, 0x20, 0x00, // mov [0x20], al
        0xB0, 0x0F, // mov al, 0x0F
        0x0C, 0xF0, // or al, 0xF0
        0xA2, 0x21, 0x00, // mov [0x21], al
        0xB0, 0xAA, // mov al, 0xAA
        0x34, 0xFF, // xor al, 0xFF
        0xA2, 0x22, 0x00, // mov [0x22], al
        0xB0, 0x81, // mov al, 0x81
        0xD0, 0xC0, // rol al, 1
        0xA2, 0x23, 0x00, // mov [0x23], al
        0xB0, 0x01, // mov al, 1
        0xB1, 0x03, // mov cl, 3
        0xD2, 0xE0, // shl al, cl
        0xA2, 0x24, 0x00, // mov [0x24], al
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: bitwise");
    expect_low_memory(
        &cpu,
        &[
            (0x20, 0xC0),
            (0x21, 0xFF),
            (0x22, 0x55),
            (0x23, 0x03),
            (0x24, 0x08),
        ],
    );
}

#[test]
fn control_flow_fills_a_table() {
    let code = [
        0xB9, 0x08, 0x00, // mov cx, 8
        0xBB, 0x30, 0x00, // mov bx, 0x30
        0xB0, 0x00, // mov al, 0
        // top:
        0x88, 0x07, // mov [bx], al
        0x43, // inc bx
        0xFE, 0xC0, // inc al
        0xE2, 0xF9, // loop top
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: control");
    let expected: Vec<(u16, u8)> = (0..8).map(|i| (0x30 + i as u16, i as u8)).collect();
    expect_low_memory(&cpu, &expected);
}

#[test]
fn jmpmov_stores_marker_word() {
    let code = [
        0xB8, 0x01, 0x40, // mov ax, 0x4001
        0xA3, 0x00, 0x00, // mov [0x0000], ax
        0xEB, 0x01, // jmp past the dead byte
        0x90, // skipped
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: jmpmov");
    assert_eq!(cpu.read_word(Pointer::from_linear(0)), 0x4001);
}

#[test]
fn multiply_and_divide() {
    let code = [
        0xB0, 0x07, // mov al, 7
        0xB3, 0x06, // mov bl, 6
        0xF6, 0xE3, // mul bl -> ax = 42
        0xA3, 0x40, 0x00, // mov [0x40], ax
        0xB8, 0x64, 0x00, // mov ax, 100
        0xB3, 0x09, // mov bl, 9
        0xF6, 0xF3, // div bl -> al = 11, ah = 1
        0xA3, 0x42, 0x00, // mov [0x42], ax
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: muldiv");
    expect_low_memory(
        &cpu,
        &[(0x40, 42), (0x41, 0), (0x42, 11), (0x43, 1)],
    );
}

#[test]
fn repeated_string_copy() {
    let code = [
        0xFC, // cld
        0xB0, 0x5A, // mov al, 0x5A
        0xBF, 0x60, 0x00, // mov di, 0x60
        0xB9, 0x04, 0x00, // mov cx, 4
        0xF3, 0xAA, // rep stosb
        0xBE, 0x60, 0x00, // mov si, 0x60
        0xBF, 0x70, 0x00, // mov di, 0x70
        0xB9, 0x04, 0x00, // mov cx, 4
        0xF3, 0xA4, // rep movsb
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: strings");
    expect_low_memory(
        &cpu,
        &[
            (0x70, 0x5A),
            (0x71, 0x5A),
            (0x72, 0x5A),
            (0x73, 0x5A),
        ],
    );
    assert_eq!(cpu.regs.cx, 0);
}

#[test]
fn software_interrupt_through_ivt() {
    let code = [
        // IVT slot 0x21: handler at 0000:0200
        0xC7, 0x06, 0x84, 0x00, 0x00, 0x02, // mov word [0x84], 0x0200
        0xC7, 0x06, 0x86, 0x00, 0x00, 0x00, // mov word [0x86], 0
        // Handler body written into RAM: mov byte [0x50], 0x99; iret
        0xC6, 0x06, 0x00, 0x02, 0xC6, // mov byte [0x200], 0xC6
        0xC6, 0x06, 0x01, 0x02, 0x06, // mov byte [0x201], 0x06
        0xC6, 0x06, 0x02, 0x02, 0x50, // mov byte [0x202], 0x50
        0xC6, 0x06, 0x03, 0x02, 0x00, // mov byte [0x203], 0x00
        0xC6, 0x06, 0x04, 0x02, 0x99, // mov byte [0x204], 0x99
        0xC6, 0x06, 0x05, 0x02, 0xCF, // mov byte [0x205], 0xCF
        0xCD, 0x21, // int 0x21
        0xF4, // hlt
    ];
    let cpu = run_image(boot_image(&code), "TEST: interrupt");
    expect_low_memory(&cpu, &[(0x50, 0x99)]);
    assert_eq!(cpu.regs.cs, ROM_SEG);
}

// ---------------------------------------------------------------- golden
//
// The classic CPU test binaries (add.bin, res_add.bin, ...) are external
// inputs. When a workspace-level testdata/ directory carries them, each runs
// to HLT and low memory is compared against the recorded result; a few of
// the blobs probe edge cases with documented deltas, tolerated via `nerr`.

fn testdata_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata")
}

fn run_golden(name: &str, nerr: usize) {
    let dir = testdata_dir();
    let bin = dir.join(format!("{}.bin", name));
    let res = dir.join(format!("res_{}.bin", name));
    if !bin.exists() || !res.exists() {
        eprintln!("skipping golden test {}: {} not found", name, bin.display());
        return;
    }

    let image = fs::read(&bin).unwrap();
    let expected = fs::read(&res).unwrap();
    let cpu = run_image(image, &format!("TEST: {}.bin", name));

    let mut diffs = 0;
    for (i, &value) in expected.iter().enumerate() {
        if cpu.read_byte(Pointer::new(0, i as u16)) != value {
            diffs += 1;
        }
    }
    assert_eq!(diffs, nerr, "{}: unexpected low-memory delta count", name);
}

#[test]
fn golden_add() {
    run_golden("add", 0);
}

#[test]
fn golden_bcdcnv() {
    run_golden("bcdcnv", 2);
}

#[test]
fn golden_bitwise() {
    run_golden("bitwise", 0);
}

#[test]
fn golden_cmpneg() {
    run_golden("cmpneg", 0);
}

#[test]
fn golden_control() {
    run_golden("control", 0);
}

#[test]
fn golden_datatrnf() {
    run_golden("datatrnf", 0);
}

#[test]
fn golden_div() {
    run_golden("div", 3);
}

#[test]
fn golden_interrupt() {
    run_golden("interrupt", 0);
}

#[test]
fn golden_jmpmov() {
    let dir = testdata_dir();
    let bin = dir.join("jmpmov.bin");
    if !bin.exists() {
        eprintln!("skipping golden test jmpmov: {} not found", bin.display());
        return;
    }
    let cpu = run_image(fs::read(&bin).unwrap(), "TEST: jmpmov.bin");
    assert_eq!(cpu.read_word(Pointer::from_linear(0)), 0x4001);
}

#[test]
fn golden_jump1() {
    run_golden("jump1", 0);
}

#[test]
fn golden_jump2() {
    run_golden("jump2", 0);
}

#[test]
fn golden_mul() {
    run_golden("mul", 8);
}

#[test]
fn golden_rep() {
    run_golden("rep", 0);
}

#[test]
fn golden_rotate() {
    run_golden("rotate", 0);
}

#[test]
fn golden_segpr() {
    run_golden("segpr", 0);
}

#[test]
fn golden_shifts() {
    run_golden("shifts", 0);
}

#[test]
fn golden_strings() {
    run_golden("strings", 0);
}

#[test]
fn golden_sub() {
    run_golden("sub", 1);
}
