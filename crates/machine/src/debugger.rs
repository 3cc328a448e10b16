//! Interactive debugger overlay.
//!
//! The debugger installs itself as the memory owner for the entire 1 MiB
//! space after snapshotting the previous owner of every byte. Reads and
//! writes delegate to the snapshot, which lets it watch all bus traffic
//! without disturbing routing: the guest sees the same machine, the debugger
//! sees everything.
//!
//! At every step boundary (before the instruction at the current CS:IP
//! executes) it evaluates its break conditions and, once broken, runs a
//! line-oriented REPL until a command resumes execution. The processor is
//! frozen for the whole REPL; `q` tears the machine down by propagating
//! [`StepError::DebugQuit`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rxt_core::registers::{
    FLAG_AF, FLAG_CF, FLAG_DF, FLAG_IF, FLAG_OF, FLAG_PF, FLAG_SF, FLAG_TF, FLAG_ZF,
};
use rxt_core::{
    DeviceRef, InstallError, Peripheral, Pointer, Processor, Slot, Stats, StepError,
    ADDRESS_SPACE,
};

/// Output lines ending in this sequence have their terminator suppressed,
/// letting several writes compose one visible line.
pub const MAGIC_SUFFIX: &str = "<<<!\n";

const HISTORY_CAPACITY: usize = 128;

/// The debugger's line-oriented front-end connection.
pub trait DebugStream: Send {
    /// Next command line, without its terminator. An error (including EOF)
    /// quits the emulator.
    fn read_line(&mut self) -> io::Result<String>;

    /// Write raw text, honoring the [`MAGIC_SUFFIX`] suppression rule.
    fn write_text(&mut self, text: &str);
}

/// Stdin/stdout stream used by the CLI.
pub struct StdioStream;

impl DebugStream for StdioStream {
    fn read_line(&mut self) -> io::Result<String> {
        let mut line = String::new();
        let n = io::stdin().lock().read_line(&mut line)?;
        if n == 0 {
            return Err(io::ErrorKind::UnexpectedEof.into());
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn write_text(&mut self, text: &str) {
        let payload = text.strip_suffix(MAGIC_SUFFIX).unwrap_or(text);
        let stdout = io::stdout();
        let mut out = stdout.lock();
        let _ = out.write_all(payload.as_bytes());
        let _ = out.flush();
    }
}

fn to_ascii(b: u8) -> char {
    match b {
        0 => '.',
        b if b < 0x20 => '?',
        b if b > 0x7E => '#',
        b => b as char,
    }
}

fn instruction_to_string(op: u8) -> String {
    format!("{} (0x{:X})", opcode_name(op), op)
}

pub struct Debugger {
    stream: Box<dyn DebugStream>,
    /// Populate the instruction history ring.
    trace: bool,
    break_active: bool,
    break_on_iret: bool,
    /// BIOS-error byte value captured by the bus-write rule, applied at the
    /// next step boundary.
    pending_bios_break: Option<u8>,
    last_instruction: Option<Pointer>,
    breakpoints: Vec<u16>,
    history: VecDeque<String>,
    lost: u64,
    code_offset: u16,
    /// Previous owner of every byte, captured at install.
    shadow: Vec<DeviceRef>,
    /// Host-settable break request (e.g. wired to SIGINT by the front-end).
    interrupt: Arc<AtomicBool>,
    stats: Stats,
    mips: f64,
    stats_at: Instant,
    counted_instructions: u64,
}

impl Debugger {
    pub fn new(stream: Box<dyn DebugStream>, trace: bool, break_on_start: bool) -> Self {
        Self {
            stream,
            trace,
            break_active: break_on_start,
            break_on_iret: false,
            pending_bios_break: None,
            last_instruction: None,
            breakpoints: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            lost: 0,
            code_offset: 0,
            shadow: Vec::new(),
            interrupt: Arc::new(AtomicBool::new(false)),
            stats: Stats::default(),
            mips: 0.0,
            stats_at: Instant::now(),
            counted_instructions: 0,
        }
    }

    /// A latch the front-end may set from a signal handler to request a
    /// break at the next step boundary.
    pub fn interrupt_latch(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    fn log_line(&mut self, text: &str) {
        self.stream.write_text(&format!("{}\n", text));
    }

    fn shadow_read(&self, addr: Pointer) -> u8 {
        self.shadow[addr.index()].borrow().read_byte(addr)
    }

    fn break_now(&mut self, cpu: &mut Processor) {
        self.break_active = true;
        cpu.regs.debug = true;
    }

    fn resume(&mut self, cpu: &mut Processor) {
        self.break_active = false;
        cpu.regs.debug = false;
    }

    fn cs_name(&self, cs: u16) -> String {
        match cs {
            0xF000 => "BIOS".to_string(),
            0x7C00 => "BOOT".to_string(),
            other => format!("0x{:X}", other),
        }
    }

    fn push_history(&mut self, entry: String) {
        if self.history.len() == HISTORY_CAPACITY {
            self.history.pop_front();
            self.lost += 1;
        }
        self.history.push_back(entry);
    }

    fn flags_string(&self, cpu: &Processor) -> String {
        let flags = [
            (FLAG_CF, 'C'),
            (FLAG_PF, 'P'),
            (FLAG_AF, 'A'),
            (FLAG_ZF, 'Z'),
            (FLAG_SF, 'S'),
            (FLAG_TF, 'T'),
            (FLAG_IF, 'I'),
            (FLAG_DF, 'D'),
            (FLAG_OF, 'O'),
        ];
        flags
            .iter()
            .map(|&(bit, ch)| if cpu.regs.flag(bit) { ch } else { '-' })
            .collect()
    }

    fn print_registers(&mut self, cpu: &Processor) {
        let r = &cpu.regs;
        let line1 = format!(
            "AL 0x{:X} ({})\tCL 0x{:X} ({})\tDL 0x{:X} ({})\tBL 0x{:X} ({})",
            r.al(), r.al(), r.cl(), r.cl(), r.dl(), r.dl(), r.bl(), r.bl(),
        );
        let line2 = format!(
            "AH 0x{:X} ({})\tCH 0x{:X} ({})\tDH 0x{:X} ({})\tBH 0x{:X} ({})",
            r.ah(), r.ah(), r.ch(), r.ch(), r.dh(), r.dh(), r.bh(), r.bh(),
        );
        let line3 = format!(
            "AX 0x{:X} ({})\tCX 0x{:X} ({})\tDX 0x{:X} ({})\tBX 0x{:X} ({})",
            r.ax, r.ax, r.cx, r.cx, r.dx, r.dx, r.bx, r.bx,
        );
        let line4 = format!(
            "SP 0x{:X} ({})\tBP 0x{:X} ({})\nSI 0x{:X} ({})\tDI 0x{:X} ({})",
            r.sp, r.sp, r.bp, r.bp, r.si, r.si, r.di, r.di,
        );
        let line5 = format!(
            "ES 0x{:X} ({})\tCS 0x{:X} ({})\nSS 0x{:X} ({})\tDS 0x{:X} ({})",
            r.es, r.es, r.cs, r.cs, r.ss, r.ss, r.ds, r.ds,
        );
        let flags = self.flags_string(cpu);

        self.log_line(&line1);
        self.log_line(&line2);
        self.log_line(&line3);
        self.log_line("");
        self.log_line(&line4);
        self.log_line("");
        self.log_line(&line5);
        self.log_line("");
        self.log_line(&flags);
        let mips = format!("MIPS: {:.2}", self.mips);
        self.log_line(&mips);
    }

    fn render_video(&mut self) {
        // Assume 80-column CGA text at the canonical address.
        let mut p = Pointer::from_linear(0xB8000);
        for _ in 0..25 {
            self.log_line("| <<<!");
            for _ in 0..80 {
                let b = self.shadow_read(p);
                self.log_line(&format!("{}<<<!", to_ascii(b)));
                p = p.wrapping_add(2);
            }
            self.log_line("");
        }
    }

    fn show_memory(&mut self, arg: &str) {
        let parts: Vec<&str> = arg.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [one] => match u32::from_str_radix(one, 16) {
                Ok(a) => {
                    let d = self.shadow_read(Pointer::from_linear(a));
                    self.log_line(&format!("0x{:X}: 0x{:X} ({})", a, d, d));
                }
                Err(_) => self.log_line("invalid memory range"),
            },
            [from, to] => {
                let (from, to) = match (
                    u32::from_str_radix(from, 16),
                    u32::from_str_radix(to, 16),
                ) {
                    (Ok(f), Ok(t)) if t >= f => (f, t),
                    _ => {
                        self.log_line("invalid memory range");
                        return;
                    }
                };
                for row_start in (from..=to).step_by(16) {
                    let mut hex = String::new();
                    let mut ascii = String::new();
                    for a in row_start..=(row_start + 15).min(to) {
                        let b = self.shadow_read(Pointer::from_linear(a));
                        hex.push_str(&format!("{:02X} ", b));
                        ascii.push(to_ascii(b));
                    }
                    let line = format!("0x{:05X}  {:<48} |{}|", row_start, hex, ascii);
                    self.log_line(&line);
                }
            }
            _ => self.log_line("invalid memory range"),
        }
    }

    fn set_code_offset(&mut self, arg: &str) {
        if let Ok(o) = u16::from_str_radix(arg.trim(), 16) {
            self.log_line(&format!("Code offset at: 0x{:X}", o));
            self.code_offset = o;
        }
    }

    fn show_breakpoints(&mut self) {
        let list: Vec<(usize, u16)> = self.breakpoints.iter().copied().enumerate().collect();
        for (i, bp) in list {
            self.log_line(&format!("{}:\t0x{:X}", i, bp));
        }
    }

    fn set_breakpoint(&mut self, arg: &str) {
        if let Ok(b) = u16::from_str_radix(arg.trim(), 16) {
            self.log_line(&format!("Breakpoint set at: CS:0x{:X}", b));
            self.breakpoints.push(b);
        }
    }

    fn remove_breakpoint(&mut self, arg: &str) {
        if let Ok(i) = arg.trim().parse::<usize>() {
            if i < self.breakpoints.len() {
                let bp = self.breakpoints.remove(i);
                self.log_line(&format!("Removed breakpoint {} at: CS:0x{:X}", i, bp));
            }
        }
    }

    fn show_history(&mut self, count: usize) {
        let lost = format!("| Lost instructions: {}", self.lost);
        self.log_line(&lost);
        let start = self.history.len().saturating_sub(count);
        let lines: Vec<String> = self.history.iter().skip(start).cloned().collect();
        for line in lines {
            self.log_line(&line);
        }
    }

    fn show_history_with_length(&mut self, arg: &str) {
        match arg.trim().parse::<usize>() {
            Ok(0) => self.show_history(usize::MAX),
            Ok(n) => self.show_history(n),
            Err(_) => self.log_line("invalid history range"),
        }
    }

    fn clear_history(&mut self) {
        self.log_line("Clear trace!");
        self.lost += self.history.len() as u64;
        self.history.clear();
    }

    fn show_mem_map(&mut self) {
        use std::rc::Rc;

        let mut start = 0usize;
        let mut current = self.shadow[0].clone();
        for i in 1..=self.shadow.len() {
            let boundary = i == self.shadow.len() || !Rc::ptr_eq(&self.shadow[i], &current);
            if !boundary {
                continue;
            }
            let name = current.borrow().name().to_string();
            let end = i - 1;
            let line = if start == end {
                format!("0x{:05X}: {}", start, name)
            } else {
                format!("0x{:05X}-0x{:05X}: {}", start, end, name)
            };
            self.log_line(&line);
            if i < self.shadow.len() {
                current = self.shadow[i].clone();
                start = i;
            }
        }
    }

    /// One REPL command. `Ok(())` keeps the REPL looping while the break is
    /// active; `q` propagates the quit.
    fn dispatch(
        &mut self,
        cpu: &mut Processor,
        line: &str,
        ip: Pointer,
        inst: &str,
    ) -> Result<(), StepError> {
        match line {
            "q" => return Err(StepError::DebugQuit),
            "c" => self.resume(cpu),
            "" | "s" => {
                self.resume(cpu);
                self.last_instruction = Some(ip);
            }
            "i" => {
                self.resume(cpu);
                self.break_on_iret = true;
            }
            "r" => self.print_registers(cpu),
            "v" => self.render_video(),
            "t" => self.show_history(16),
            "ct" => self.clear_history(),
            "@" => {
                let at = ip.wrapping_sub(self.code_offset as u32);
                self.log_line(&format!("{} ({})", at, at.linear()));
                self.log_line(inst);
            }
            "cb" => {
                self.log_line("Clear breakpoints!");
                self.breakpoints.clear();
            }
            "b" => self.show_breakpoints(),
            "p" => self.show_mem_map(),
            _ => {
                if let Some(arg) = line.strip_prefix("o ") {
                    self.set_code_offset(arg);
                } else if let Some(arg) = line.strip_prefix("t ") {
                    self.show_history_with_length(arg);
                } else if let Some(arg) = line.strip_prefix("b ") {
                    self.set_breakpoint(arg);
                } else if let Some(arg) = line.strip_prefix("rb ") {
                    self.remove_breakpoint(arg);
                } else if let Some(arg) = line.strip_prefix("m ") {
                    self.show_memory(arg);
                } else {
                    self.log_line(&format!("unknown command: {}", line));
                }
            }
        }
        Ok(())
    }
}

impl Peripheral for Debugger {
    fn name(&self) -> &str {
        "Debug Device"
    }

    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError> {
        let mut shadow = Vec::with_capacity(ADDRESS_SPACE);
        for i in 0..ADDRESS_SPACE {
            shadow.push(cpu.get_mapped_memory_device(Pointer::from_linear(i as u32)));
        }
        self.shadow = shadow;
        cpu.install_memory_overlay(slot);

        if self.break_active {
            cpu.regs.debug = true;
        }
        self.stats_at = Instant::now();
        Ok(())
    }

    fn step(&mut self, cpu: &mut Processor, _cycles: u32) -> Result<(), StepError> {
        if self.stats_at.elapsed() >= Duration::from_secs(1) {
            let stats = cpu.get_stats();
            self.mips = (stats.instructions - self.counted_instructions) as f64 / 1_000_000.0;
            self.counted_instructions = stats.instructions;
            self.stats = stats;
            self.stats_at = Instant::now();
        }

        if self.interrupt.swap(false, Ordering::Relaxed) {
            self.log_line("BREAK!");
            self.break_now(cpu);
        }

        if let Some(value) = self.pending_bios_break.take() {
            self.log_line(&format!("BIOS Error: 0x{:X}", value));
            self.break_now(cpu);
        }

        if cpu.regs.debug {
            self.break_active = true;
        }

        let ip = Pointer::new(cpu.regs.cs, cpu.regs.ip);
        let op = self.shadow_read(ip);
        let inst = instruction_to_string(op);

        // Single-step re-arms as soon as execution moves off the recorded
        // instruction.
        if let Some(last) = self.last_instruction {
            if last != ip {
                self.last_instruction = None;
                self.break_now(cpu);
                self.log_line(&inst);
            }
        }

        if self.break_on_iret && op == 0xCF {
            self.break_on_iret = false;
            self.break_now(cpu);
            self.log_line(&inst);
        }

        // Breakpoints compare the raw IP, not CS:IP.
        let hits: Vec<usize> = self
            .breakpoints
            .iter()
            .enumerate()
            .filter(|&(_, bp)| *bp == cpu.regs.ip)
            .map(|(i, _)| i)
            .collect();
        for i in hits {
            self.log_line(&format!("BREAK: {}", i));
            self.break_now(cpu);
        }

        while self.break_active {
            let prompt = format!(
                "[{}:0x{:X}] DEBUG><<<!",
                self.cs_name(cpu.regs.cs),
                cpu.regs.ip.wrapping_sub(self.code_offset),
            );
            self.log_line(&prompt);

            let line = match self.stream.read_line() {
                Ok(line) => line,
                Err(_) => return Err(StepError::DebugQuit),
            };
            self.dispatch(cpu, line.trim(), ip, &inst)?;
        }

        if self.trace {
            let entry = format!(
                "| [{}:0x{:X}] {}",
                self.cs_name(cpu.regs.cs),
                cpu.regs.ip.wrapping_sub(self.code_offset),
                inst,
            );
            self.push_history(entry);
        }
        Ok(())
    }

    fn read_byte(&self, addr: Pointer) -> u8 {
        self.shadow_read(addr)
    }

    fn write_byte(&mut self, addr: Pointer, value: u8) {
        self.shadow[addr.index()].borrow_mut().write_byte(addr, value);
        // A nonzero write to the BIOS data area error byte (0040:0015)
        // stops the machine for inspection.
        if value != 0 && addr == Pointer::new(0x40, 0x15) {
            self.pending_bios_break = Some(value);
        }
    }
}

fn opcode_name(op: u8) -> &'static str {
    match op {
        0x00..=0x05 => "ADD",
        0x06 => "PUSH ES",
        0x07 => "POP ES",
        0x08..=0x0D => "OR",
        0x0E => "PUSH CS",
        0x0F => "POP CS",
        0x10..=0x15 => "ADC",
        0x16 => "PUSH SS",
        0x17 => "POP SS",
        0x18..=0x1D => "SBB",
        0x1E => "PUSH DS",
        0x1F => "POP DS",
        0x20..=0x25 => "AND",
        0x26 => "ES:",
        0x27 => "DAA",
        0x28..=0x2D => "SUB",
        0x2E => "CS:",
        0x2F => "DAS",
        0x30..=0x35 => "XOR",
        0x36 => "SS:",
        0x37 => "AAA",
        0x38..=0x3D => "CMP",
        0x3E => "DS:",
        0x3F => "AAS",
        0x40..=0x47 => "INC",
        0x48..=0x4F => "DEC",
        0x50..=0x57 => "PUSH",
        0x58..=0x5F => "POP",
        0x60 => "PUSHA",
        0x61 => "POPA",
        0x62 => "BOUND",
        0x63..=0x67 => "DB",
        0x68 | 0x6A => "PUSH",
        0x69 | 0x6B => "IMUL",
        0x6C => "INSB",
        0x6D => "INSW",
        0x6E => "OUTSB",
        0x6F => "OUTSW",
        0x70 => "JO",
        0x71 => "JNO",
        0x72 => "JB",
        0x73 => "JNB",
        0x74 => "JZ",
        0x75 => "JNZ",
        0x76 => "JBE",
        0x77 => "JA",
        0x78 => "JS",
        0x79 => "JNS",
        0x7A => "JPE",
        0x7B => "JPO",
        0x7C => "JL",
        0x7D => "JGE",
        0x7E => "JLE",
        0x7F => "JG",
        0x80..=0x83 => "GRP1",
        0x84 | 0x85 => "TEST",
        0x86 | 0x87 => "XCHG",
        0x88..=0x8C => "MOV",
        0x8D => "LEA",
        0x8E => "MOV",
        0x8F => "POP",
        0x90 => "NOP",
        0x91..=0x97 => "XCHG",
        0x98 => "CBW",
        0x99 => "CWD",
        0x9A => "CALL",
        0x9B => "WAIT",
        0x9C => "PUSHF",
        0x9D => "POPF",
        0x9E => "SAHF",
        0x9F => "LAHF",
        0xA0..=0xA3 => "MOV",
        0xA4 => "MOVSB",
        0xA5 => "MOVSW",
        0xA6 => "CMPSB",
        0xA7 => "CMPSW",
        0xA8 | 0xA9 => "TEST",
        0xAA => "STOSB",
        0xAB => "STOSW",
        0xAC => "LODSB",
        0xAD => "LODSW",
        0xAE => "SCASB",
        0xAF => "SCASW",
        0xB0..=0xBF => "MOV",
        0xC0 | 0xC1 => "GRP2",
        0xC2 | 0xC3 => "RET",
        0xC4 => "LES",
        0xC5 => "LDS",
        0xC6 | 0xC7 => "MOV",
        0xC8 => "ENTER",
        0xC9 => "LEAVE",
        0xCA | 0xCB => "RETF",
        0xCC => "INT3",
        0xCD => "INT",
        0xCE => "INTO",
        0xCF => "IRET",
        0xD0..=0xD3 => "GRP2",
        0xD4 => "AAM",
        0xD5 => "AAD",
        0xD6 => "SALC",
        0xD7 => "XLAT",
        0xD8..=0xDF => "ESC",
        0xE0 => "LOOPNZ",
        0xE1 => "LOOPZ",
        0xE2 => "LOOP",
        0xE3 => "JCXZ",
        0xE4 | 0xE5 | 0xEC | 0xED => "IN",
        0xE6 | 0xE7 | 0xEE | 0xEF => "OUT",
        0xE8 => "CALL",
        0xE9..=0xEB => "JMP",
        0xF0 | 0xF1 => "LOCK",
        0xF2 => "REPNE",
        0xF3 => "REP",
        0xF4 => "HLT",
        0xF5 => "CMC",
        0xF6 | 0xF7 => "GRP3",
        0xF8 => "CLC",
        0xF9 => "STC",
        0xFA => "CLI",
        0xFB => "STI",
        0xFC => "CLD",
        0xFD => "STD",
        0xFE => "GRP4",
        0xFF => "GRP5",
    }
}
