//! The 8088/V20 processor: bus fabric, peripheral table, and the
//! fetch/decode/execute core.
//!
//! Every memory access is routed through a 2^20-entry owner table and every
//! port access through a 2^16-entry table, so a device claim is O(range) at
//! install time and dispatch is O(1). Peripherals are stepped at the top of
//! [`Processor::step`] with the previous instruction's cycle cost; the
//! debugger overlay therefore gets control before the instruction at the
//! current CS:IP executes, which is what breakpoint and single-step semantics
//! require.
//!
//! The interpreter executes one instruction per step. Repeated string
//! instructions run one iteration and rewind IP over the prefix bytes while
//! the repeat condition holds, so a pending IRQ is serviced at an iteration
//! boundary with CX preserved, as on hardware.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::bus::{IoBus, MemoryBus};
use crate::logging::{log, LogCategory, LogLevel};
use crate::memory::Pointer;
use crate::peripheral::{
    DeviceRef, InstallError, InterruptControllerRef, InterruptHandlerRef, Peripheral, Slot,
    StepError,
};
use crate::registers::{
    Registers, FLAG_AF, FLAG_CF, FLAG_DF, FLAG_IF, FLAG_OF, FLAG_PF, FLAG_SF, FLAG_TF, FLAG_ZF,
};

/// Execution counters, readable through [`Processor::get_stats`].
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct Stats {
    /// Instructions retired.
    pub instructions: u64,
    /// Approximate clock cycles consumed.
    pub cycles: u64,
    /// Interrupts vectored (hardware, software, and injected faults).
    pub interrupts: u64,
}

/// Default device for unclaimed addresses and ports: memory reads 0xFF,
/// port reads 0, writes are dropped.
struct OpenBus;

impl Peripheral for OpenBus {
    fn name(&self) -> &str {
        "Open Bus"
    }

    fn install(&mut self, _cpu: &mut Processor, _slot: Slot) -> Result<(), InstallError> {
        Ok(())
    }
}

/// Segment override prefix captured during decode. Decode-local; it never
/// outlives the instruction it was fetched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentOverride {
    Es,
    Cs,
    Ss,
    Ds,
}

/// REP/REPNE prefix captured during decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RepPrefix {
    /// 0xF3: REP / REPE / REPZ.
    Eq,
    /// 0xF2: REPNE / REPNZ.
    Ne,
}

/// A decoded r/m operand location.
#[derive(Debug, Clone, Copy)]
enum Operand {
    Reg(u8),
    Mem(u16, u16),
}

#[inline]
fn sign_extend(v: u8) -> u16 {
    v as i8 as i16 as u16
}

#[inline]
fn parity(v: u8) -> bool {
    v.count_ones() % 2 == 0
}

/// The processor and everything it owns: registers, buses, devices,
/// interrupt plumbing, and counters.
pub struct Processor {
    pub regs: Registers,
    devices: Vec<DeviceRef>,
    memory_bus: MemoryBus,
    io_bus: IoBus,
    interrupt_handlers: Vec<Option<InterruptHandlerRef>>,
    pic: Option<InterruptControllerRef>,
    stats: Stats,
    v20: bool,
    last_cycles: u32,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            devices: vec![Rc::new(RefCell::new(OpenBus)) as DeviceRef],
            memory_bus: MemoryBus::new(),
            io_bus: IoBus::new(),
            interrupt_handlers: vec![None; 256],
            pic: None,
            stats: Stats::default(),
            v20: false,
            last_cycles: 0,
        }
    }

    // ---------------------------------------------------------------- wiring

    /// Register a peripheral and run its `install`, which claims bus ranges.
    pub fn install(&mut self, device: DeviceRef) -> Result<(), InstallError> {
        let slot = self.devices.len() as Slot;
        self.devices.push(device.clone());
        device.borrow_mut().install(self, slot)
    }

    /// Claim the inclusive byte range `from..=to` for the device in `slot`.
    ///
    /// Called from a device's own `install`, so the device cell is already
    /// mutably borrowed; only the slot number is logged.
    pub fn install_memory_device(
        &mut self,
        slot: Slot,
        from: Pointer,
        to: Pointer,
    ) -> Result<(), InstallError> {
        log(LogCategory::Bus, LogLevel::Debug, || {
            format!("slot {} claims memory {}..={}", slot, from, to)
        });
        self.memory_bus.claim(slot, from, to)
    }

    /// Claim the inclusive port range `from..=to` for the device in `slot`.
    pub fn install_io_device(
        &mut self,
        slot: Slot,
        from: u16,
        to: u16,
    ) -> Result<(), InstallError> {
        log(LogCategory::Bus, LogLevel::Debug, || {
            format!("slot {} claims ports {:#05X}..={:#05X}", slot, from, to)
        });
        self.io_bus.claim(slot, from, to)
    }

    /// Overlay path for the debugger: take over the whole memory space,
    /// previously owned ranges included. The caller is expected to have
    /// snapshotted the prior owners via [`Processor::get_mapped_memory_device`].
    pub fn install_memory_overlay(&mut self, slot: Slot) {
        log(LogCategory::Bus, LogLevel::Debug, || {
            format!("slot {} overlays the full address space", slot)
        });
        self.memory_bus.claim_all(slot);
    }

    /// Intercept software `INT vector` with `handler` instead of vectoring
    /// through the IVT.
    pub fn install_interrupt_handler(&mut self, vector: u8, handler: InterruptHandlerRef) {
        self.interrupt_handlers[vector as usize] = Some(handler);
    }

    /// Wire the interrupt controller polled at instruction boundaries.
    pub fn set_interrupt_controller(&mut self, pic: InterruptControllerRef) {
        self.pic = Some(pic);
    }

    /// The machine's interrupt controller, for peripherals that raise IRQs.
    pub fn get_interrupt_controller(&self) -> Option<InterruptControllerRef> {
        self.pic.clone()
    }

    /// Enable NEC V20 / 80186 extensions.
    pub fn set_v20_support(&mut self, enabled: bool) {
        self.v20 = enabled;
    }

    // ---------------------------------------------------------- introspection

    pub fn get_registers(&self) -> &Registers {
        &self.regs
    }

    pub fn get_registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn get_stats(&self) -> Stats {
        self.stats
    }

    /// The device currently owning `addr`.
    pub fn get_mapped_memory_device(&self, addr: Pointer) -> DeviceRef {
        self.devices[self.memory_bus.owner(addr) as usize].clone()
    }

    // -------------------------------------------------------------- bus access

    pub fn read_byte(&self, addr: Pointer) -> u8 {
        let slot = self.memory_bus.owner(addr);
        self.devices[slot as usize].borrow().read_byte(addr)
    }

    pub fn write_byte(&self, addr: Pointer, value: u8) {
        let slot = self.memory_bus.owner(addr);
        self.devices[slot as usize].borrow_mut().write_byte(addr, value);
    }

    /// Little-endian word read; the high byte wraps at the top of the
    /// address space.
    pub fn read_word(&self, addr: Pointer) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    pub fn write_word(&self, addr: Pointer, value: u16) {
        self.write_byte(addr, (value & 0xFF) as u8);
        self.write_byte(addr.wrapping_add(1), (value >> 8) as u8);
    }

    pub fn io_read(&self, port: u16) -> u8 {
        let slot = self.io_bus.owner(port);
        self.devices[slot as usize].borrow_mut().io_in(port)
    }

    pub fn io_write(&self, port: u16, value: u8) {
        let slot = self.io_bus.owner(port);
        self.devices[slot as usize].borrow_mut().io_out(port, value);
    }

    // Segment-relative accessors. Offsets wrap inside the segment, the
    // resulting linear address wraps at 2^20.

    #[inline]
    fn mem_read8(&self, seg: u16, off: u16) -> u8 {
        self.read_byte(Pointer::new(seg, off))
    }

    #[inline]
    fn mem_write8(&self, seg: u16, off: u16, value: u8) {
        self.write_byte(Pointer::new(seg, off), value);
    }

    #[inline]
    fn mem_read16(&self, seg: u16, off: u16) -> u16 {
        let lo = self.mem_read8(seg, off) as u16;
        let hi = self.mem_read8(seg, off.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn mem_write16(&self, seg: u16, off: u16, value: u16) {
        self.mem_write8(seg, off, (value & 0xFF) as u8);
        self.mem_write8(seg, off.wrapping_add(1), (value >> 8) as u8);
    }

    #[inline]
    fn fetch8(&mut self) -> u8 {
        let v = self.mem_read8(self.regs.cs, self.regs.ip);
        self.regs.ip = self.regs.ip.wrapping_add(1);
        v
    }

    #[inline]
    fn fetch16(&mut self) -> u16 {
        let lo = self.fetch8() as u16;
        let hi = self.fetch8() as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push16(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        self.mem_write16(self.regs.ss, self.regs.sp, value);
    }

    #[inline]
    fn pop16(&mut self) -> u16 {
        let v = self.mem_read16(self.regs.ss, self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        v
    }

    // ------------------------------------------------------------- lifecycle

    /// Reset registers, counters, and every installed peripheral.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.stats = Stats::default();
        self.last_cycles = 0;
        for i in 1..self.devices.len() {
            let dev = self.devices[i].clone();
            dev.borrow_mut().reset();
        }
    }

    /// Shut peripherals down, most recently installed first.
    pub fn close(&mut self) {
        for i in (1..self.devices.len()).rev() {
            let dev = self.devices[i].clone();
            dev.borrow_mut().close();
        }
    }

    // ------------------------------------------------------------------ step

    /// Advance the machine by one instruction.
    pub fn step(&mut self) -> Result<u32, StepError> {
        let budget = self.last_cycles;
        for i in 1..self.devices.len() {
            let dev = self.devices[i].clone();
            dev.borrow_mut().step(self, budget)?;
        }

        // At most one interrupt is acknowledged per boundary.
        if self.regs.flag(FLAG_IF) {
            let vector = self.pic.clone().and_then(|pic| {
                let mut pic = pic.borrow_mut();
                pic.next_pending().map(|v| pic.ack(v))
            });
            if let Some(vector) = vector {
                log(LogCategory::Interrupts, LogLevel::Trace, || {
                    format!("dispatching vector {:#04X}", vector)
                });
                self.interrupt(vector);
            }
        }

        if self.regs.halted {
            self.stats.cycles += 2;
            self.last_cycles = 2;
            return Ok(2);
        }

        let cycles = self.execute()?;
        self.stats.instructions += 1;
        self.stats.cycles += cycles as u64;
        self.last_cycles = cycles;
        Ok(cycles)
    }

    /// Vector through the IVT. Used for hardware IRQs, software INT, and
    /// injected faults; on the 8088 the pushed IP always points past the
    /// current instruction.
    pub fn interrupt(&mut self, vector: u8) {
        self.push16(self.regs.flags_word());
        self.regs.set_flag(FLAG_IF, false);
        self.regs.set_flag(FLAG_TF, false);
        self.push16(self.regs.cs);
        self.push16(self.regs.ip);

        let entry = Pointer::from_linear(vector as u32 * 4);
        self.regs.ip = self.read_word(entry);
        self.regs.cs = self.read_word(entry.wrapping_add(2));
        self.regs.halted = false;
        self.stats.interrupts += 1;
    }

    /// Software interrupt: a registered handler intercepts the vectoring
    /// entirely.
    fn software_interrupt(&mut self, vector: u8) -> Result<(), StepError> {
        if let Some(handler) = self.interrupt_handlers[vector as usize].clone() {
            handler.borrow_mut().handle_interrupt(self, vector)
        } else {
            self.interrupt(vector);
            Ok(())
        }
    }

    // ------------------------------------------------------------- operands

    #[inline]
    fn segment(&self, default: u16, over: Option<SegmentOverride>) -> u16 {
        match over {
            None => default,
            Some(SegmentOverride::Es) => self.regs.es,
            Some(SegmentOverride::Cs) => self.regs.cs,
            Some(SegmentOverride::Ss) => self.regs.ss,
            Some(SegmentOverride::Ds) => self.regs.ds,
        }
    }

    #[inline]
    fn fetch_modrm(&mut self) -> (u8, u8, u8) {
        let m = self.fetch8();
        (m >> 6, (m >> 3) & 7, m & 7)
    }

    /// Effective address for a memory r/m operand: segment value, offset,
    /// and the EA cycle cost.
    fn effective_address(
        &mut self,
        modbits: u8,
        rm: u8,
        over: Option<SegmentOverride>,
    ) -> (u16, u16, u32) {
        let disp = match modbits {
            0 => {
                if rm == 6 {
                    self.fetch16()
                } else {
                    0
                }
            }
            1 => sign_extend(self.fetch8()),
            _ => self.fetch16(),
        };

        let (base, stack_default, base_cycles) = match rm {
            0 => (self.regs.bx.wrapping_add(self.regs.si), false, 7),
            1 => (self.regs.bx.wrapping_add(self.regs.di), false, 8),
            2 => (self.regs.bp.wrapping_add(self.regs.si), true, 8),
            3 => (self.regs.bp.wrapping_add(self.regs.di), true, 7),
            4 => (self.regs.si, false, 5),
            5 => (self.regs.di, false, 5),
            6 => {
                if modbits == 0 {
                    (0, false, 6)
                } else {
                    (self.regs.bp, true, 5)
                }
            }
            _ => (self.regs.bx, false, 5),
        };

        let offset = base.wrapping_add(disp);
        let default = if stack_default { self.regs.ss } else { self.regs.ds };
        let seg = self.segment(default, over);
        let cycles = if modbits == 1 || modbits == 2 {
            base_cycles + 4
        } else {
            base_cycles
        };
        (seg, offset, cycles)
    }

    /// Resolve an r/m field to a register or memory location.
    fn rm_operand(
        &mut self,
        modbits: u8,
        rm: u8,
        over: Option<SegmentOverride>,
    ) -> (Operand, u32) {
        if modbits == 3 {
            (Operand::Reg(rm), 0)
        } else {
            let (seg, off, cycles) = self.effective_address(modbits, rm, over);
            (Operand::Mem(seg, off), cycles)
        }
    }

    fn load8(&self, op: Operand) -> u8 {
        match op {
            Operand::Reg(r) => self.get_reg8(r),
            Operand::Mem(seg, off) => self.mem_read8(seg, off),
        }
    }

    fn store8(&mut self, op: Operand, value: u8) {
        match op {
            Operand::Reg(r) => self.set_reg8(r, value),
            Operand::Mem(seg, off) => self.mem_write8(seg, off, value),
        }
    }

    fn load16(&self, op: Operand) -> u16 {
        match op {
            Operand::Reg(r) => self.get_reg16(r),
            Operand::Mem(seg, off) => self.mem_read16(seg, off),
        }
    }

    fn store16(&mut self, op: Operand, value: u16) {
        match op {
            Operand::Reg(r) => self.set_reg16(r, value),
            Operand::Mem(seg, off) => self.mem_write16(seg, off, value),
        }
    }

    fn get_reg8(&self, reg: u8) -> u8 {
        match reg & 7 {
            0 => self.regs.al(),
            1 => self.regs.cl(),
            2 => self.regs.dl(),
            3 => self.regs.bl(),
            4 => self.regs.ah(),
            5 => self.regs.ch(),
            6 => self.regs.dh(),
            _ => self.regs.bh(),
        }
    }

    fn set_reg8(&mut self, reg: u8, value: u8) {
        match reg & 7 {
            0 => self.regs.set_al(value),
            1 => self.regs.set_cl(value),
            2 => self.regs.set_dl(value),
            3 => self.regs.set_bl(value),
            4 => self.regs.set_ah(value),
            5 => self.regs.set_ch(value),
            6 => self.regs.set_dh(value),
            _ => self.regs.set_bh(value),
        }
    }

    fn get_reg16(&self, reg: u8) -> u16 {
        match reg & 7 {
            0 => self.regs.ax,
            1 => self.regs.cx,
            2 => self.regs.dx,
            3 => self.regs.bx,
            4 => self.regs.sp,
            5 => self.regs.bp,
            6 => self.regs.si,
            _ => self.regs.di,
        }
    }

    fn set_reg16(&mut self, reg: u8, value: u16) {
        match reg & 7 {
            0 => self.regs.ax = value,
            1 => self.regs.cx = value,
            2 => self.regs.dx = value,
            3 => self.regs.bx = value,
            4 => self.regs.sp = value,
            5 => self.regs.bp = value,
            6 => self.regs.si = value,
            _ => self.regs.di = value,
        }
    }

    fn get_seg(&self, seg: u8) -> u16 {
        match seg & 3 {
            0 => self.regs.es,
            1 => self.regs.cs,
            2 => self.regs.ss,
            _ => self.regs.ds,
        }
    }

    fn set_seg(&mut self, seg: u8, value: u16) {
        match seg & 3 {
            0 => self.regs.es = value,
            1 => self.regs.cs = value,
            2 => self.regs.ss = value,
            _ => self.regs.ds = value,
        }
    }

    // ----------------------------------------------------------------- flags

    fn set_szp8(&mut self, v: u8) {
        self.regs.set_flag(FLAG_SF, v & 0x80 != 0);
        self.regs.set_flag(FLAG_ZF, v == 0);
        self.regs.set_flag(FLAG_PF, parity(v));
    }

    fn set_szp16(&mut self, v: u16) {
        self.regs.set_flag(FLAG_SF, v & 0x8000 != 0);
        self.regs.set_flag(FLAG_ZF, v == 0);
        self.regs.set_flag(FLAG_PF, parity((v & 0xFF) as u8));
    }

    fn add8(&mut self, a: u8, b: u8, carry: bool) -> u8 {
        let wide = a as u16 + b as u16 + carry as u16;
        let r = wide as u8;
        self.regs.set_flag(FLAG_CF, wide > 0xFF);
        self.regs.set_flag(FLAG_OF, (a ^ r) & (b ^ r) & 0x80 != 0);
        self.regs.set_flag(FLAG_AF, (a ^ b ^ r) & 0x10 != 0);
        self.set_szp8(r);
        r
    }

    fn add16(&mut self, a: u16, b: u16, carry: bool) -> u16 {
        let wide = a as u32 + b as u32 + carry as u32;
        let r = wide as u16;
        self.regs.set_flag(FLAG_CF, wide > 0xFFFF);
        self.regs.set_flag(FLAG_OF, (a ^ r) & (b ^ r) & 0x8000 != 0);
        self.regs.set_flag(FLAG_AF, (a ^ b ^ r) & 0x10 != 0);
        self.set_szp16(r);
        r
    }

    fn sub8(&mut self, a: u8, b: u8, borrow: bool) -> u8 {
        let r = a.wrapping_sub(b).wrapping_sub(borrow as u8);
        self.regs
            .set_flag(FLAG_CF, (b as u16 + borrow as u16) > a as u16);
        self.regs.set_flag(FLAG_OF, (a ^ b) & (a ^ r) & 0x80 != 0);
        self.regs.set_flag(FLAG_AF, (a ^ b ^ r) & 0x10 != 0);
        self.set_szp8(r);
        r
    }

    fn sub16(&mut self, a: u16, b: u16, borrow: bool) -> u16 {
        let r = a.wrapping_sub(b).wrapping_sub(borrow as u16);
        self.regs
            .set_flag(FLAG_CF, (b as u32 + borrow as u32) > a as u32);
        self.regs.set_flag(FLAG_OF, (a ^ b) & (a ^ r) & 0x8000 != 0);
        self.regs.set_flag(FLAG_AF, (a ^ b ^ r) & 0x10 != 0);
        self.set_szp16(r);
        r
    }

    fn logic_flags8(&mut self, r: u8) {
        self.regs.set_flag(FLAG_CF, false);
        self.regs.set_flag(FLAG_OF, false);
        self.regs.set_flag(FLAG_AF, false);
        self.set_szp8(r);
    }

    fn logic_flags16(&mut self, r: u16) {
        self.regs.set_flag(FLAG_CF, false);
        self.regs.set_flag(FLAG_OF, false);
        self.regs.set_flag(FLAG_AF, false);
        self.set_szp16(r);
    }

    /// INC/DEC leave CF alone.
    fn inc8(&mut self, v: u8) -> u8 {
        let cf = self.regs.flag(FLAG_CF);
        let r = self.add8(v, 1, false);
        self.regs.set_flag(FLAG_CF, cf);
        r
    }

    fn dec8(&mut self, v: u8) -> u8 {
        let cf = self.regs.flag(FLAG_CF);
        let r = self.sub8(v, 1, false);
        self.regs.set_flag(FLAG_CF, cf);
        r
    }

    fn inc16(&mut self, v: u16) -> u16 {
        let cf = self.regs.flag(FLAG_CF);
        let r = self.add16(v, 1, false);
        self.regs.set_flag(FLAG_CF, cf);
        r
    }

    fn dec16(&mut self, v: u16) -> u16 {
        let cf = self.regs.flag(FLAG_CF);
        let r = self.sub16(v, 1, false);
        self.regs.set_flag(FLAG_CF, cf);
        r
    }

    // ALU operation wrappers shared by the register, r/m, and immediate
    // encodings. `a` is always the destination operand.

    fn op_add8(&mut self, a: u8, b: u8) -> u8 {
        self.add8(a, b, false)
    }

    fn op_or8(&mut self, a: u8, b: u8) -> u8 {
        let r = a | b;
        self.logic_flags8(r);
        r
    }

    fn op_adc8(&mut self, a: u8, b: u8) -> u8 {
        let c = self.regs.flag(FLAG_CF);
        self.add8(a, b, c)
    }

    fn op_sbb8(&mut self, a: u8, b: u8) -> u8 {
        let c = self.regs.flag(FLAG_CF);
        self.sub8(a, b, c)
    }

    fn op_and8(&mut self, a: u8, b: u8) -> u8 {
        let r = a & b;
        self.logic_flags8(r);
        r
    }

    fn op_sub8(&mut self, a: u8, b: u8) -> u8 {
        self.sub8(a, b, false)
    }

    fn op_xor8(&mut self, a: u8, b: u8) -> u8 {
        let r = a ^ b;
        self.logic_flags8(r);
        r
    }

    fn op_add16(&mut self, a: u16, b: u16) -> u16 {
        self.add16(a, b, false)
    }

    fn op_or16(&mut self, a: u16, b: u16) -> u16 {
        let r = a | b;
        self.logic_flags16(r);
        r
    }

    fn op_adc16(&mut self, a: u16, b: u16) -> u16 {
        let c = self.regs.flag(FLAG_CF);
        self.add16(a, b, c)
    }

    fn op_sbb16(&mut self, a: u16, b: u16) -> u16 {
        let c = self.regs.flag(FLAG_CF);
        self.sub16(a, b, c)
    }

    fn op_and16(&mut self, a: u16, b: u16) -> u16 {
        let r = a & b;
        self.logic_flags16(r);
        r
    }

    fn op_sub16(&mut self, a: u16, b: u16) -> u16 {
        self.sub16(a, b, false)
    }

    fn op_xor16(&mut self, a: u16, b: u16) -> u16 {
        let r = a ^ b;
        self.logic_flags16(r);
        r
    }

    // ALU encoding forms. Cycle costs follow the 8088 column of the Intel
    // tables, rounded: reg,reg 3; mem,reg 16+EA on store, 9+EA on read.

    fn alu_rm_r8(
        &mut self,
        f: fn(&mut Self, u8, u8) -> u8,
        over: Option<SegmentOverride>,
        store: bool,
    ) -> u32 {
        let (modbits, reg, rm) = self.fetch_modrm();
        let (opnd, ea) = self.rm_operand(modbits, rm, over);
        let a = self.load8(opnd);
        let b = self.get_reg8(reg);
        let r = f(self, a, b);
        if store {
            self.store8(opnd, r);
        }
        match opnd {
            Operand::Reg(_) => 3,
            Operand::Mem(..) => {
                if store {
                    16 + ea
                } else {
                    9 + ea
                }
            }
        }
    }

    fn alu_rm_r16(
        &mut self,
        f: fn(&mut Self, u16, u16) -> u16,
        over: Option<SegmentOverride>,
        store: bool,
    ) -> u32 {
        let (modbits, reg, rm) = self.fetch_modrm();
        let (opnd, ea) = self.rm_operand(modbits, rm, over);
        let a = self.load16(opnd);
        let b = self.get_reg16(reg);
        let r = f(self, a, b);
        if store {
            self.store16(opnd, r);
        }
        match opnd {
            Operand::Reg(_) => 3,
            Operand::Mem(..) => {
                if store {
                    16 + ea
                } else {
                    9 + ea
                }
            }
        }
    }

    fn alu_r_rm8(
        &mut self,
        f: fn(&mut Self, u8, u8) -> u8,
        over: Option<SegmentOverride>,
        store: bool,
    ) -> u32 {
        let (modbits, reg, rm) = self.fetch_modrm();
        let (opnd, ea) = self.rm_operand(modbits, rm, over);
        let a = self.get_reg8(reg);
        let b = self.load8(opnd);
        let r = f(self, a, b);
        if store {
            self.set_reg8(reg, r);
        }
        match opnd {
            Operand::Reg(_) => 3,
            Operand::Mem(..) => 9 + ea,
        }
    }

    fn alu_r_rm16(
        &mut self,
        f: fn(&mut Self, u16, u16) -> u16,
        over: Option<SegmentOverride>,
        store: bool,
    ) -> u32 {
        let (modbits, reg, rm) = self.fetch_modrm();
        let (opnd, ea) = self.rm_operand(modbits, rm, over);
        let a = self.get_reg16(reg);
        let b = self.load16(opnd);
        let r = f(self, a, b);
        if store {
            self.set_reg16(reg, r);
        }
        match opnd {
            Operand::Reg(_) => 3,
            Operand::Mem(..) => 9 + ea,
        }
    }

    fn alu_al_imm(&mut self, f: fn(&mut Self, u8, u8) -> u8, store: bool) -> u32 {
        let b = self.fetch8();
        let a = self.regs.al();
        let r = f(self, a, b);
        if store {
            self.regs.set_al(r);
        }
        4
    }

    fn alu_ax_imm(&mut self, f: fn(&mut Self, u16, u16) -> u16, store: bool) -> u32 {
        let b = self.fetch16();
        let a = self.regs.ax;
        let r = f(self, a, b);
        if store {
            self.regs.ax = r;
        }
        4
    }

    // -------------------------------------------------------- shifts/rotates

    fn shift_rotate8(&mut self, val: u8, op: u8, count: u8) -> u8 {
        let count = if self.v20 { count & 0x1F } else { count };
        if count == 0 {
            return val;
        }
        let mut v = val;
        match op & 7 {
            0 => {
                // ROL
                for _ in 0..count {
                    let c = v >> 7;
                    v = (v << 1) | c;
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (v & 0x80 != 0) != cf);
                }
            }
            1 => {
                // ROR
                for _ in 0..count {
                    let c = v & 1;
                    v = (v >> 1) | (c << 7);
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
                if count == 1 {
                    self.regs.set_flag(FLAG_OF, ((v >> 7) ^ (v >> 6)) & 1 != 0);
                }
            }
            2 => {
                // RCL
                for _ in 0..count {
                    let c = v >> 7;
                    v = (v << 1) | self.regs.flag(FLAG_CF) as u8;
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (v & 0x80 != 0) != cf);
                }
            }
            3 => {
                // RCR
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (val & 0x80 != 0) != cf);
                }
                for _ in 0..count {
                    let c = v & 1;
                    v = (v >> 1) | ((self.regs.flag(FLAG_CF) as u8) << 7);
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
            }
            4 | 6 => {
                // SHL
                for _ in 0..count {
                    self.regs.set_flag(FLAG_CF, v & 0x80 != 0);
                    v <<= 1;
                }
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (v & 0x80 != 0) != cf);
                }
                self.set_szp8(v);
            }
            5 => {
                // SHR
                if count == 1 {
                    self.regs.set_flag(FLAG_OF, val & 0x80 != 0);
                }
                for _ in 0..count {
                    self.regs.set_flag(FLAG_CF, v & 1 != 0);
                    v >>= 1;
                }
                self.set_szp8(v);
            }
            _ => {
                // SAR
                for _ in 0..count {
                    self.regs.set_flag(FLAG_CF, v & 1 != 0);
                    v = ((v as i8) >> 1) as u8;
                }
                if count == 1 {
                    self.regs.set_flag(FLAG_OF, false);
                }
                self.set_szp8(v);
            }
        }
        v
    }

    fn shift_rotate16(&mut self, val: u16, op: u8, count: u8) -> u16 {
        let count = if self.v20 { count & 0x1F } else { count };
        if count == 0 {
            return val;
        }
        let mut v = val;
        match op & 7 {
            0 => {
                for _ in 0..count {
                    let c = v >> 15;
                    v = (v << 1) | c;
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (v & 0x8000 != 0) != cf);
                }
            }
            1 => {
                for _ in 0..count {
                    let c = v & 1;
                    v = (v >> 1) | (c << 15);
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
                if count == 1 {
                    self.regs.set_flag(FLAG_OF, ((v >> 15) ^ (v >> 14)) & 1 != 0);
                }
            }
            2 => {
                for _ in 0..count {
                    let c = v >> 15;
                    v = (v << 1) | self.regs.flag(FLAG_CF) as u16;
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (v & 0x8000 != 0) != cf);
                }
            }
            3 => {
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (val & 0x8000 != 0) != cf);
                }
                for _ in 0..count {
                    let c = v & 1;
                    v = (v >> 1) | ((self.regs.flag(FLAG_CF) as u16) << 15);
                    self.regs.set_flag(FLAG_CF, c != 0);
                }
            }
            4 | 6 => {
                for _ in 0..count {
                    self.regs.set_flag(FLAG_CF, v & 0x8000 != 0);
                    v <<= 1;
                }
                if count == 1 {
                    let cf = self.regs.flag(FLAG_CF);
                    self.regs.set_flag(FLAG_OF, (v & 0x8000 != 0) != cf);
                }
                self.set_szp16(v);
            }
            5 => {
                if count == 1 {
                    self.regs.set_flag(FLAG_OF, val & 0x8000 != 0);
                }
                for _ in 0..count {
                    self.regs.set_flag(FLAG_CF, v & 1 != 0);
                    v >>= 1;
                }
                self.set_szp16(v);
            }
            _ => {
                for _ in 0..count {
                    self.regs.set_flag(FLAG_CF, v & 1 != 0);
                    v = ((v as i16) >> 1) as u16;
                }
                if count == 1 {
                    self.regs.set_flag(FLAG_OF, false);
                }
                self.set_szp16(v);
            }
        }
        v
    }

    // ---------------------------------------------------------- multiply/divide

    fn mul8(&mut self, src: u8) {
        let r = self.regs.al() as u16 * src as u16;
        self.regs.ax = r;
        let high = r & 0xFF00 != 0;
        self.regs.set_flag(FLAG_CF, high);
        self.regs.set_flag(FLAG_OF, high);
        self.set_szp8((r & 0xFF) as u8);
    }

    fn imul8(&mut self, src: u8) {
        let r = (self.regs.al() as i8 as i16) * (src as i8 as i16);
        self.regs.ax = r as u16;
        let fits = r == r as i8 as i16;
        self.regs.set_flag(FLAG_CF, !fits);
        self.regs.set_flag(FLAG_OF, !fits);
        self.set_szp8((r & 0xFF) as u8);
    }

    fn mul16(&mut self, src: u16) {
        let r = self.regs.ax as u32 * src as u32;
        self.regs.ax = (r & 0xFFFF) as u16;
        self.regs.dx = (r >> 16) as u16;
        let high = self.regs.dx != 0;
        self.regs.set_flag(FLAG_CF, high);
        self.regs.set_flag(FLAG_OF, high);
        self.set_szp16(self.regs.ax);
    }

    fn imul16(&mut self, src: u16) {
        let r = (self.regs.ax as i16 as i32) * (src as i16 as i32);
        self.regs.ax = (r & 0xFFFF) as u16;
        self.regs.dx = ((r >> 16) & 0xFFFF) as u16;
        let fits = r == r as i16 as i32;
        self.regs.set_flag(FLAG_CF, !fits);
        self.regs.set_flag(FLAG_OF, !fits);
        self.set_szp16(self.regs.ax);
    }

    fn div8(&mut self, src: u8) -> Result<(), ()> {
        if src == 0 {
            return Err(());
        }
        let num = self.regs.ax;
        let q = num / src as u16;
        if q > 0xFF {
            return Err(());
        }
        self.regs.set_al(q as u8);
        self.regs.set_ah((num % src as u16) as u8);
        Ok(())
    }

    fn idiv8(&mut self, src: u8) -> Result<(), ()> {
        let s = src as i8 as i16;
        if s == 0 {
            return Err(());
        }
        let num = self.regs.ax as i16;
        let q = num.wrapping_div(s);
        if !(-0x80..=0x7F).contains(&q) {
            return Err(());
        }
        self.regs.set_al(q as u8);
        self.regs.set_ah(num.wrapping_rem(s) as u8);
        Ok(())
    }

    fn div16(&mut self, src: u16) -> Result<(), ()> {
        if src == 0 {
            return Err(());
        }
        let num = ((self.regs.dx as u32) << 16) | self.regs.ax as u32;
        let q = num / src as u32;
        if q > 0xFFFF {
            return Err(());
        }
        self.regs.ax = q as u16;
        self.regs.dx = (num % src as u32) as u16;
        Ok(())
    }

    fn idiv16(&mut self, src: u16) -> Result<(), ()> {
        let s = src as i16 as i32;
        if s == 0 {
            return Err(());
        }
        let num = (((self.regs.dx as u32) << 16) | self.regs.ax as u32) as i32;
        let q = num.wrapping_div(s);
        if !(-0x8000..=0x7FFF).contains(&q) {
            return Err(());
        }
        self.regs.ax = q as u16;
        self.regs.dx = num.wrapping_rem(s) as u16;
        Ok(())
    }

    // --------------------------------------------------------------- strings

    #[inline]
    fn string_delta(&self, width: u16) -> u16 {
        if self.regs.flag(FLAG_DF) {
            width.wrapping_neg()
        } else {
            width
        }
    }

    fn advance_si(&mut self, width: u16) {
        let d = self.string_delta(width);
        self.regs.si = self.regs.si.wrapping_add(d);
    }

    fn advance_di(&mut self, width: u16) {
        let d = self.string_delta(width);
        self.regs.di = self.regs.di.wrapping_add(d);
    }

    /// One iteration of a string instruction, plus the REP bookkeeping. When
    /// repeating, IP is rewound over the prefixes so the instruction resumes
    /// at the next step with CX preserved; a pending interrupt is then taken
    /// at the ordinary instruction boundary.
    fn string_op(
        &mut self,
        opcode: u8,
        rep: Option<RepPrefix>,
        over: Option<SegmentOverride>,
        start_ip: u16,
    ) -> u32 {
        if rep.is_some() && self.regs.cx == 0 {
            return 2;
        }

        let src_seg = self.segment(self.regs.ds, over);
        let cycles = match opcode {
            0xA4 => {
                // MOVSB
                let v = self.mem_read8(src_seg, self.regs.si);
                self.mem_write8(self.regs.es, self.regs.di, v);
                self.advance_si(1);
                self.advance_di(1);
                18
            }
            0xA5 => {
                // MOVSW
                let v = self.mem_read16(src_seg, self.regs.si);
                self.mem_write16(self.regs.es, self.regs.di, v);
                self.advance_si(2);
                self.advance_di(2);
                26
            }
            0xA6 => {
                // CMPSB
                let a = self.mem_read8(src_seg, self.regs.si);
                let b = self.mem_read8(self.regs.es, self.regs.di);
                self.sub8(a, b, false);
                self.advance_si(1);
                self.advance_di(1);
                22
            }
            0xA7 => {
                // CMPSW
                let a = self.mem_read16(src_seg, self.regs.si);
                let b = self.mem_read16(self.regs.es, self.regs.di);
                self.sub16(a, b, false);
                self.advance_si(2);
                self.advance_di(2);
                30
            }
            0xAA => {
                // STOSB
                self.mem_write8(self.regs.es, self.regs.di, self.regs.al());
                self.advance_di(1);
                11
            }
            0xAB => {
                // STOSW
                self.mem_write16(self.regs.es, self.regs.di, self.regs.ax);
                self.advance_di(2);
                15
            }
            0xAC => {
                // LODSB
                let v = self.mem_read8(src_seg, self.regs.si);
                self.regs.set_al(v);
                self.advance_si(1);
                12
            }
            0xAD => {
                // LODSW
                let v = self.mem_read16(src_seg, self.regs.si);
                self.regs.ax = v;
                self.advance_si(2);
                16
            }
            0xAE => {
                // SCASB
                let b = self.mem_read8(self.regs.es, self.regs.di);
                let a = self.regs.al();
                self.sub8(a, b, false);
                self.advance_di(1);
                15
            }
            0xAF => {
                // SCASW
                let b = self.mem_read16(self.regs.es, self.regs.di);
                let a = self.regs.ax;
                self.sub16(a, b, false);
                self.advance_di(2);
                19
            }
            0x6C => {
                // INSB
                let v = self.io_read(self.regs.dx);
                self.mem_write8(self.regs.es, self.regs.di, v);
                self.advance_di(1);
                14
            }
            0x6D => {
                // INSW
                let lo = self.io_read(self.regs.dx);
                let hi = self.io_read(self.regs.dx.wrapping_add(1));
                self.mem_write16(self.regs.es, self.regs.di, ((hi as u16) << 8) | lo as u16);
                self.advance_di(2);
                14
            }
            0x6E => {
                // OUTSB
                let v = self.mem_read8(src_seg, self.regs.si);
                self.io_write(self.regs.dx, v);
                self.advance_si(1);
                14
            }
            _ => {
                // OUTSW
                let v = self.mem_read16(src_seg, self.regs.si);
                self.io_write(self.regs.dx, (v & 0xFF) as u8);
                self.io_write(self.regs.dx.wrapping_add(1), (v >> 8) as u8);
                self.advance_si(2);
                14
            }
        };

        if let Some(rep) = rep {
            self.regs.cx = self.regs.cx.wrapping_sub(1);
            let again = match opcode {
                // CMPS/SCAS also terminate on the ZF condition.
                0xA6 | 0xA7 | 0xAE | 0xAF => {
                    self.regs.cx != 0
                        && (rep == RepPrefix::Eq) == self.regs.flag(FLAG_ZF)
                }
                _ => self.regs.cx != 0,
            };
            if again {
                self.regs.ip = start_ip;
            }
        }
        cycles
    }

    // ------------------------------------------------------------ conditions

    fn condition(&self, cc: u8) -> bool {
        let r = &self.regs;
        match cc & 0xF {
            0x0 => r.flag(FLAG_OF),
            0x1 => !r.flag(FLAG_OF),
            0x2 => r.flag(FLAG_CF),
            0x3 => !r.flag(FLAG_CF),
            0x4 => r.flag(FLAG_ZF),
            0x5 => !r.flag(FLAG_ZF),
            0x6 => r.flag(FLAG_CF) || r.flag(FLAG_ZF),
            0x7 => !r.flag(FLAG_CF) && !r.flag(FLAG_ZF),
            0x8 => r.flag(FLAG_SF),
            0x9 => !r.flag(FLAG_SF),
            0xA => r.flag(FLAG_PF),
            0xB => !r.flag(FLAG_PF),
            0xC => r.flag(FLAG_SF) != r.flag(FLAG_OF),
            0xD => r.flag(FLAG_SF) == r.flag(FLAG_OF),
            0xE => r.flag(FLAG_ZF) || (r.flag(FLAG_SF) != r.flag(FLAG_OF)),
            _ => !r.flag(FLAG_ZF) && r.flag(FLAG_SF) == r.flag(FLAG_OF),
        }
    }

    fn jump_rel8(&mut self, taken: bool) -> u32 {
        let rel = sign_extend(self.fetch8());
        if taken {
            self.regs.ip = self.regs.ip.wrapping_add(rel);
            16
        } else {
            4
        }
    }

    // --------------------------------------------------------------- execute

    fn execute(&mut self) -> Result<u32, StepError> {
        let start_ip = self.regs.ip;
        let mut over: Option<SegmentOverride> = None;
        let mut rep: Option<RepPrefix> = None;
        let mut prefix_cycles = 0u32;

        let opcode = loop {
            let op = self.fetch8();
            match op {
                0x26 => over = Some(SegmentOverride::Es),
                0x2E => over = Some(SegmentOverride::Cs),
                0x36 => over = Some(SegmentOverride::Ss),
                0x3E => over = Some(SegmentOverride::Ds),
                0xF2 => rep = Some(RepPrefix::Ne),
                0xF3 => rep = Some(RepPrefix::Eq),
                // LOCK (and its 0xF1 alias): single bus master, nothing to lock.
                0xF0 | 0xF1 => {}
                _ => break op,
            }
            prefix_cycles += 2;
        };

        let invalid = |this: &Self| StepError::InvalidOpcode {
            opcode,
            cs: this.regs.cs,
            ip: start_ip,
        };

        let cycles: u32 = match opcode {
            // ---- ADD
            0x00 => self.alu_rm_r8(Self::op_add8, over, true),
            0x01 => self.alu_rm_r16(Self::op_add16, over, true),
            0x02 => self.alu_r_rm8(Self::op_add8, over, true),
            0x03 => self.alu_r_rm16(Self::op_add16, over, true),
            0x04 => self.alu_al_imm(Self::op_add8, true),
            0x05 => self.alu_ax_imm(Self::op_add16, true),
            0x06 => {
                self.push16(self.regs.es);
                10
            }
            0x07 => {
                self.regs.es = self.pop16();
                8
            }

            // ---- OR
            0x08 => self.alu_rm_r8(Self::op_or8, over, true),
            0x09 => self.alu_rm_r16(Self::op_or16, over, true),
            0x0A => self.alu_r_rm8(Self::op_or8, over, true),
            0x0B => self.alu_r_rm16(Self::op_or16, over, true),
            0x0C => self.alu_al_imm(Self::op_or8, true),
            0x0D => self.alu_ax_imm(Self::op_or16, true),
            0x0E => {
                self.push16(self.regs.cs);
                10
            }
            0x0F => {
                // POP CS on the 8088; the V20 reserves 0x0F for extended
                // opcodes this machine does not implement.
                if self.v20 {
                    return Err(invalid(self));
                }
                self.regs.cs = self.pop16();
                8
            }

            // ---- ADC
            0x10 => self.alu_rm_r8(Self::op_adc8, over, true),
            0x11 => self.alu_rm_r16(Self::op_adc16, over, true),
            0x12 => self.alu_r_rm8(Self::op_adc8, over, true),
            0x13 => self.alu_r_rm16(Self::op_adc16, over, true),
            0x14 => self.alu_al_imm(Self::op_adc8, true),
            0x15 => self.alu_ax_imm(Self::op_adc16, true),
            0x16 => {
                self.push16(self.regs.ss);
                10
            }
            0x17 => {
                self.regs.ss = self.pop16();
                8
            }

            // ---- SBB
            0x18 => self.alu_rm_r8(Self::op_sbb8, over, true),
            0x19 => self.alu_rm_r16(Self::op_sbb16, over, true),
            0x1A => self.alu_r_rm8(Self::op_sbb8, over, true),
            0x1B => self.alu_r_rm16(Self::op_sbb16, over, true),
            0x1C => self.alu_al_imm(Self::op_sbb8, true),
            0x1D => self.alu_ax_imm(Self::op_sbb16, true),
            0x1E => {
                self.push16(self.regs.ds);
                10
            }
            0x1F => {
                self.regs.ds = self.pop16();
                8
            }

            // ---- AND
            0x20 => self.alu_rm_r8(Self::op_and8, over, true),
            0x21 => self.alu_rm_r16(Self::op_and16, over, true),
            0x22 => self.alu_r_rm8(Self::op_and8, over, true),
            0x23 => self.alu_r_rm16(Self::op_and16, over, true),
            0x24 => self.alu_al_imm(Self::op_and8, true),
            0x25 => self.alu_ax_imm(Self::op_and16, true),
            0x27 => {
                // DAA
                let old_al = self.regs.al();
                let old_cf = self.regs.flag(FLAG_CF);
                let mut al = old_al;
                let mut cf = false;
                if (old_al & 0x0F) > 9 || self.regs.flag(FLAG_AF) {
                    al = al.wrapping_add(6);
                    cf = old_cf || old_al > 0xF9;
                    self.regs.set_flag(FLAG_AF, true);
                } else {
                    self.regs.set_flag(FLAG_AF, false);
                }
                if old_al > 0x99 || old_cf {
                    al = al.wrapping_add(0x60);
                    cf = true;
                }
                self.regs.set_al(al);
                self.regs.set_flag(FLAG_CF, cf);
                self.set_szp8(al);
                4
            }

            // ---- SUB
            0x28 => self.alu_rm_r8(Self::op_sub8, over, true),
            0x29 => self.alu_rm_r16(Self::op_sub16, over, true),
            0x2A => self.alu_r_rm8(Self::op_sub8, over, true),
            0x2B => self.alu_r_rm16(Self::op_sub16, over, true),
            0x2C => self.alu_al_imm(Self::op_sub8, true),
            0x2D => self.alu_ax_imm(Self::op_sub16, true),
            0x2F => {
                // DAS
                let old_al = self.regs.al();
                let old_cf = self.regs.flag(FLAG_CF);
                let mut al = old_al;
                let mut cf = false;
                if (old_al & 0x0F) > 9 || self.regs.flag(FLAG_AF) {
                    al = al.wrapping_sub(6);
                    cf = old_cf || old_al < 6;
                    self.regs.set_flag(FLAG_AF, true);
                } else {
                    self.regs.set_flag(FLAG_AF, false);
                }
                if old_al > 0x99 || old_cf {
                    al = al.wrapping_sub(0x60);
                    cf = true;
                }
                self.regs.set_al(al);
                self.regs.set_flag(FLAG_CF, cf);
                self.set_szp8(al);
                4
            }

            // ---- XOR
            0x30 => self.alu_rm_r8(Self::op_xor8, over, true),
            0x31 => self.alu_rm_r16(Self::op_xor16, over, true),
            0x32 => self.alu_r_rm8(Self::op_xor8, over, true),
            0x33 => self.alu_r_rm16(Self::op_xor16, over, true),
            0x34 => self.alu_al_imm(Self::op_xor8, true),
            0x35 => self.alu_ax_imm(Self::op_xor16, true),
            0x37 => {
                // AAA
                if (self.regs.al() & 0x0F) > 9 || self.regs.flag(FLAG_AF) {
                    self.regs.ax = self.regs.ax.wrapping_add(0x106);
                    self.regs.set_flag(FLAG_AF, true);
                    self.regs.set_flag(FLAG_CF, true);
                } else {
                    self.regs.set_flag(FLAG_AF, false);
                    self.regs.set_flag(FLAG_CF, false);
                }
                self.regs.set_al(self.regs.al() & 0x0F);
                8
            }

            // ---- CMP
            0x38 => self.alu_rm_r8(Self::op_sub8, over, false),
            0x39 => self.alu_rm_r16(Self::op_sub16, over, false),
            0x3A => self.alu_r_rm8(Self::op_sub8, over, false),
            0x3B => self.alu_r_rm16(Self::op_sub16, over, false),
            0x3C => self.alu_al_imm(Self::op_sub8, false),
            0x3D => self.alu_ax_imm(Self::op_sub16, false),
            0x3F => {
                // AAS
                if (self.regs.al() & 0x0F) > 9 || self.regs.flag(FLAG_AF) {
                    self.regs.ax = self.regs.ax.wrapping_sub(6);
                    self.regs.set_ah(self.regs.ah().wrapping_sub(1));
                    self.regs.set_flag(FLAG_AF, true);
                    self.regs.set_flag(FLAG_CF, true);
                } else {
                    self.regs.set_flag(FLAG_AF, false);
                    self.regs.set_flag(FLAG_CF, false);
                }
                self.regs.set_al(self.regs.al() & 0x0F);
                8
            }

            // ---- INC/DEC r16
            0x40..=0x47 => {
                let reg = opcode & 7;
                let v = self.get_reg16(reg);
                let r = self.inc16(v);
                self.set_reg16(reg, r);
                3
            }
            0x48..=0x4F => {
                let reg = opcode & 7;
                let v = self.get_reg16(reg);
                let r = self.dec16(v);
                self.set_reg16(reg, r);
                3
            }

            // ---- PUSH/POP r16
            0x50..=0x57 => {
                let reg = opcode & 7;
                // PUSH SP stores the already-decremented value on the 8088.
                let v = if reg == 4 {
                    self.regs.sp.wrapping_sub(2)
                } else {
                    self.get_reg16(reg)
                };
                self.push16(v);
                11
            }
            0x58..=0x5F => {
                let v = self.pop16();
                self.set_reg16(opcode & 7, v);
                8
            }

            // ---- 0x60-0x6F: V20/80186 instructions, or Jcc aliases on the 8088
            0x60..=0x6F if !self.v20 => self.jump_rel8(self.condition(opcode)),
            0x60 => {
                // PUSHA
                let sp0 = self.regs.sp;
                self.push16(self.regs.ax);
                self.push16(self.regs.cx);
                self.push16(self.regs.dx);
                self.push16(self.regs.bx);
                self.push16(sp0);
                self.push16(self.regs.bp);
                self.push16(self.regs.si);
                self.push16(self.regs.di);
                36
            }
            0x61 => {
                // POPA
                self.regs.di = self.pop16();
                self.regs.si = self.pop16();
                self.regs.bp = self.pop16();
                let _ = self.pop16(); // SP image is discarded
                self.regs.bx = self.pop16();
                self.regs.dx = self.pop16();
                self.regs.cx = self.pop16();
                self.regs.ax = self.pop16();
                35
            }
            0x62 => {
                // BOUND
                let (modbits, reg, rm) = self.fetch_modrm();
                if modbits == 3 {
                    return Err(invalid(self));
                }
                let (seg, off, ea) = self.effective_address(modbits, rm, over);
                let idx = self.get_reg16(reg) as i16;
                let lo = self.mem_read16(seg, off) as i16;
                let hi = self.mem_read16(seg, off.wrapping_add(2)) as i16;
                if idx < lo || idx > hi {
                    self.interrupt(5);
                }
                34 + ea
            }
            0x63..=0x67 => return Err(invalid(self)),
            0x68 => {
                let v = self.fetch16();
                self.push16(v);
                10
            }
            0x69 => {
                // IMUL r16, r/m16, imm16
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let a = self.load16(opnd) as i16 as i32;
                let b = self.fetch16() as i16 as i32;
                let r = a * b;
                self.set_reg16(reg, r as u16);
                let fits = r == r as i16 as i32;
                self.regs.set_flag(FLAG_CF, !fits);
                self.regs.set_flag(FLAG_OF, !fits);
                30 + ea
            }
            0x6A => {
                let v = sign_extend(self.fetch8());
                self.push16(v);
                10
            }
            0x6B => {
                // IMUL r16, r/m16, imm8
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let a = self.load16(opnd) as i16 as i32;
                let b = sign_extend(self.fetch8()) as i16 as i32;
                let r = a * b;
                self.set_reg16(reg, r as u16);
                let fits = r == r as i16 as i32;
                self.regs.set_flag(FLAG_CF, !fits);
                self.regs.set_flag(FLAG_OF, !fits);
                22 + ea
            }
            0x6C..=0x6F => self.string_op(opcode, rep, over, start_ip),

            // ---- conditional jumps
            0x70..=0x7F => self.jump_rel8(self.condition(opcode)),

            // ---- immediate group
            0x80 | 0x82 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let a = self.load8(opnd);
                let b = self.fetch8();
                let (f, store): (fn(&mut Self, u8, u8) -> u8, bool) = match reg {
                    0 => (Self::op_add8, true),
                    1 => (Self::op_or8, true),
                    2 => (Self::op_adc8, true),
                    3 => (Self::op_sbb8, true),
                    4 => (Self::op_and8, true),
                    5 => (Self::op_sub8, true),
                    6 => (Self::op_xor8, true),
                    _ => (Self::op_sub8, false),
                };
                let r = f(self, a, b);
                if store {
                    self.store8(opnd, r);
                }
                match opnd {
                    Operand::Reg(_) => 4,
                    Operand::Mem(..) => 17 + ea,
                }
            }
            0x81 | 0x83 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let a = self.load16(opnd);
                let b = if opcode == 0x81 {
                    self.fetch16()
                } else {
                    sign_extend(self.fetch8())
                };
                let (f, store): (fn(&mut Self, u16, u16) -> u16, bool) = match reg {
                    0 => (Self::op_add16, true),
                    1 => (Self::op_or16, true),
                    2 => (Self::op_adc16, true),
                    3 => (Self::op_sbb16, true),
                    4 => (Self::op_and16, true),
                    5 => (Self::op_sub16, true),
                    6 => (Self::op_xor16, true),
                    _ => (Self::op_sub16, false),
                };
                let r = f(self, a, b);
                if store {
                    self.store16(opnd, r);
                }
                match opnd {
                    Operand::Reg(_) => 4,
                    Operand::Mem(..) => 17 + ea,
                }
            }

            // ---- TEST / XCHG
            0x84 => self.alu_rm_r8(Self::op_and8, over, false),
            0x85 => self.alu_rm_r16(Self::op_and16, over, false),
            0x86 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let a = self.load8(opnd);
                let b = self.get_reg8(reg);
                self.store8(opnd, b);
                self.set_reg8(reg, a);
                match opnd {
                    Operand::Reg(_) => 4,
                    Operand::Mem(..) => 17 + ea,
                }
            }
            0x87 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let a = self.load16(opnd);
                let b = self.get_reg16(reg);
                self.store16(opnd, b);
                self.set_reg16(reg, a);
                match opnd {
                    Operand::Reg(_) => 4,
                    Operand::Mem(..) => 17 + ea,
                }
            }

            // ---- MOV
            0x88 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.get_reg8(reg);
                self.store8(opnd, v);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 9 + ea,
                }
            }
            0x89 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.get_reg16(reg);
                self.store16(opnd, v);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 9 + ea,
                }
            }
            0x8A => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load8(opnd);
                self.set_reg8(reg, v);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 8 + ea,
                }
            }
            0x8B => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load16(opnd);
                self.set_reg16(reg, v);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 8 + ea,
                }
            }
            0x8C => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.get_seg(reg);
                self.store16(opnd, v);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 9 + ea,
                }
            }
            0x8D => {
                // LEA
                let (modbits, reg, rm) = self.fetch_modrm();
                if modbits == 3 {
                    return Err(invalid(self));
                }
                let (_, off, _) = self.effective_address(modbits, rm, over);
                self.set_reg16(reg, off);
                2
            }
            0x8E => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load16(opnd);
                self.set_seg(reg, v);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 8 + ea,
                }
            }
            0x8F => {
                // POP r/m16: the stack shrinks before the address computes.
                let v = self.pop16();
                let (modbits, _, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                self.store16(opnd, v);
                match opnd {
                    Operand::Reg(_) => 8,
                    Operand::Mem(..) => 17 + ea,
                }
            }

            // ---- XCHG AX, r16 (0x90 is NOP)
            0x90..=0x97 => {
                let reg = opcode & 7;
                let v = self.get_reg16(reg);
                let ax = self.regs.ax;
                self.set_reg16(reg, ax);
                self.regs.ax = v;
                3
            }

            0x98 => {
                // CBW
                self.regs.ax = self.regs.al() as i8 as i16 as u16;
                2
            }
            0x99 => {
                // CWD
                self.regs.dx = if self.regs.ax & 0x8000 != 0 { 0xFFFF } else { 0 };
                5
            }
            0x9A => {
                // CALL far
                let off = self.fetch16();
                let seg = self.fetch16();
                self.push16(self.regs.cs);
                self.push16(self.regs.ip);
                self.regs.cs = seg;
                self.regs.ip = off;
                28
            }
            0x9B => 4, // WAIT: no coprocessor, nothing to wait for
            0x9C => {
                self.push16(self.regs.flags_word());
                10
            }
            0x9D => {
                let v = self.pop16();
                self.regs.set_flags_word(v);
                8
            }
            0x9E => {
                // SAHF
                let fw = (self.regs.flags_word() & 0xFF00) | self.regs.ah() as u16;
                self.regs.set_flags_word(fw);
                4
            }
            0x9F => {
                // LAHF
                self.regs.set_ah((self.regs.flags_word() & 0xFF) as u8);
                4
            }

            // ---- MOV accumulator <-> direct address
            0xA0 => {
                let off = self.fetch16();
                let seg = self.segment(self.regs.ds, over);
                let v = self.mem_read8(seg, off);
                self.regs.set_al(v);
                10
            }
            0xA1 => {
                let off = self.fetch16();
                let seg = self.segment(self.regs.ds, over);
                self.regs.ax = self.mem_read16(seg, off);
                10
            }
            0xA2 => {
                let off = self.fetch16();
                let seg = self.segment(self.regs.ds, over);
                self.mem_write8(seg, off, self.regs.al());
                10
            }
            0xA3 => {
                let off = self.fetch16();
                let seg = self.segment(self.regs.ds, over);
                self.mem_write16(seg, off, self.regs.ax);
                10
            }

            // ---- string instructions
            0xA4..=0xA7 | 0xAA..=0xAF => self.string_op(opcode, rep, over, start_ip),

            0xA8 => self.alu_al_imm(Self::op_and8, false),
            0xA9 => self.alu_ax_imm(Self::op_and16, false),

            // ---- MOV r, imm
            0xB0..=0xB7 => {
                let v = self.fetch8();
                self.set_reg8(opcode & 7, v);
                4
            }
            0xB8..=0xBF => {
                let v = self.fetch16();
                self.set_reg16(opcode & 7, v);
                4
            }

            // ---- 0xC0/0xC1: 80186 shift group, RET aliases on the 8088
            0xC0 if self.v20 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load8(opnd);
                let count = self.fetch8();
                let r = self.shift_rotate8(v, reg, count);
                self.store8(opnd, r);
                8 + ea
            }
            0xC1 if self.v20 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load16(opnd);
                let count = self.fetch8();
                let r = self.shift_rotate16(v, reg, count);
                self.store16(opnd, r);
                8 + ea
            }
            0xC2 | 0xC0 => {
                // RET imm16
                let imm = self.fetch16();
                self.regs.ip = self.pop16();
                self.regs.sp = self.regs.sp.wrapping_add(imm);
                12
            }
            0xC3 | 0xC1 => {
                // RET
                self.regs.ip = self.pop16();
                8
            }
            0xC4 => {
                // LES
                let (modbits, reg, rm) = self.fetch_modrm();
                if modbits == 3 {
                    return Err(invalid(self));
                }
                let (seg, off, ea) = self.effective_address(modbits, rm, over);
                let v = self.mem_read16(seg, off);
                let s = self.mem_read16(seg, off.wrapping_add(2));
                self.set_reg16(reg, v);
                self.regs.es = s;
                16 + ea
            }
            0xC5 => {
                // LDS
                let (modbits, reg, rm) = self.fetch_modrm();
                if modbits == 3 {
                    return Err(invalid(self));
                }
                let (seg, off, ea) = self.effective_address(modbits, rm, over);
                let v = self.mem_read16(seg, off);
                let s = self.mem_read16(seg, off.wrapping_add(2));
                self.set_reg16(reg, v);
                self.regs.ds = s;
                16 + ea
            }
            0xC6 => {
                // MOV r/m8, imm8
                let (modbits, _, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.fetch8();
                self.store8(opnd, v);
                match opnd {
                    Operand::Reg(_) => 4,
                    Operand::Mem(..) => 10 + ea,
                }
            }
            0xC7 => {
                // MOV r/m16, imm16
                let (modbits, _, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.fetch16();
                self.store16(opnd, v);
                match opnd {
                    Operand::Reg(_) => 4,
                    Operand::Mem(..) => 10 + ea,
                }
            }

            // ---- 0xC8/0xC9: ENTER/LEAVE on the V20, RETF aliases on the 8088
            0xC8 if self.v20 => {
                let frame = self.fetch16();
                let level = self.fetch8() & 0x1F;
                self.push16(self.regs.bp);
                let frame_ptr = self.regs.sp;
                for _ in 1..level {
                    self.regs.bp = self.regs.bp.wrapping_sub(2);
                    let v = self.mem_read16(self.regs.ss, self.regs.bp);
                    self.push16(v);
                }
                if level > 0 {
                    self.push16(frame_ptr);
                }
                self.regs.bp = frame_ptr;
                self.regs.sp = self.regs.sp.wrapping_sub(frame);
                15
            }
            0xC9 if self.v20 => {
                // LEAVE
                self.regs.sp = self.regs.bp;
                self.regs.bp = self.pop16();
                8
            }
            0xCA | 0xC8 => {
                // RETF imm16
                let imm = self.fetch16();
                self.regs.ip = self.pop16();
                self.regs.cs = self.pop16();
                self.regs.sp = self.regs.sp.wrapping_add(imm);
                18
            }
            0xCB | 0xC9 => {
                // RETF
                self.regs.ip = self.pop16();
                self.regs.cs = self.pop16();
                18
            }

            // ---- software interrupts
            0xCC => {
                self.software_interrupt(3)?;
                52
            }
            0xCD => {
                let n = self.fetch8();
                self.software_interrupt(n)?;
                51
            }
            0xCE => {
                // INTO
                if self.regs.flag(FLAG_OF) {
                    self.software_interrupt(4)?;
                    53
                } else {
                    4
                }
            }
            0xCF => {
                // IRET pops IP, CS, then flags.
                self.regs.ip = self.pop16();
                self.regs.cs = self.pop16();
                let fw = self.pop16();
                self.regs.set_flags_word(fw);
                32
            }

            // ---- shift group
            0xD0 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load8(opnd);
                let r = self.shift_rotate8(v, reg, 1);
                self.store8(opnd, r);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 15 + ea,
                }
            }
            0xD1 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load16(opnd);
                let r = self.shift_rotate16(v, reg, 1);
                self.store16(opnd, r);
                match opnd {
                    Operand::Reg(_) => 2,
                    Operand::Mem(..) => 15 + ea,
                }
            }
            0xD2 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load8(opnd);
                let count = self.regs.cl();
                let r = self.shift_rotate8(v, reg, count);
                self.store8(opnd, r);
                match opnd {
                    Operand::Reg(_) => 8 + 4 * count as u32,
                    Operand::Mem(..) => 20 + ea + 4 * count as u32,
                }
            }
            0xD3 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load16(opnd);
                let count = self.regs.cl();
                let r = self.shift_rotate16(v, reg, count);
                self.store16(opnd, r);
                match opnd {
                    Operand::Reg(_) => 8 + 4 * count as u32,
                    Operand::Mem(..) => 20 + ea + 4 * count as u32,
                }
            }

            0xD4 => {
                // AAM
                let base = self.fetch8();
                if base == 0 {
                    self.interrupt(0);
                    83
                } else {
                    let al = self.regs.al();
                    self.regs.set_ah(al / base);
                    self.regs.set_al(al % base);
                    self.set_szp8(self.regs.al());
                    83
                }
            }
            0xD5 => {
                // AAD
                let base = self.fetch8();
                let al = self
                    .regs
                    .al()
                    .wrapping_add(self.regs.ah().wrapping_mul(base));
                self.regs.set_al(al);
                self.regs.set_ah(0);
                self.set_szp8(al);
                60
            }
            0xD6 => {
                // SALC (undocumented, present on the 8088)
                if self.v20 {
                    return Err(invalid(self));
                }
                let v = if self.regs.flag(FLAG_CF) { 0xFF } else { 0 };
                self.regs.set_al(v);
                4
            }
            0xD7 => {
                // XLAT
                let seg = self.segment(self.regs.ds, over);
                let off = self.regs.bx.wrapping_add(self.regs.al() as u16);
                let v = self.mem_read8(seg, off);
                self.regs.set_al(v);
                11
            }

            // ---- coprocessor escape: consume the operand, do nothing
            0xD8..=0xDF => {
                let (modbits, _, rm) = self.fetch_modrm();
                if modbits != 3 {
                    let _ = self.effective_address(modbits, rm, over);
                }
                2
            }

            // ---- loops
            0xE0 => {
                // LOOPNE
                self.regs.cx = self.regs.cx.wrapping_sub(1);
                let taken = self.regs.cx != 0 && !self.regs.flag(FLAG_ZF);
                self.jump_rel8(taken)
            }
            0xE1 => {
                // LOOPE
                self.regs.cx = self.regs.cx.wrapping_sub(1);
                let taken = self.regs.cx != 0 && self.regs.flag(FLAG_ZF);
                self.jump_rel8(taken)
            }
            0xE2 => {
                // LOOP
                self.regs.cx = self.regs.cx.wrapping_sub(1);
                let taken = self.regs.cx != 0;
                self.jump_rel8(taken)
            }
            0xE3 => self.jump_rel8(self.regs.cx == 0),

            // ---- port I/O
            0xE4 => {
                let port = self.fetch8() as u16;
                let v = self.io_read(port);
                self.regs.set_al(v);
                10
            }
            0xE5 => {
                let port = self.fetch8() as u16;
                let lo = self.io_read(port);
                let hi = self.io_read(port.wrapping_add(1));
                self.regs.ax = ((hi as u16) << 8) | lo as u16;
                10
            }
            0xE6 => {
                let port = self.fetch8() as u16;
                self.io_write(port, self.regs.al());
                10
            }
            0xE7 => {
                let port = self.fetch8() as u16;
                self.io_write(port, self.regs.al());
                self.io_write(port.wrapping_add(1), self.regs.ah());
                10
            }
            0xEC => {
                let v = self.io_read(self.regs.dx);
                self.regs.set_al(v);
                8
            }
            0xED => {
                let lo = self.io_read(self.regs.dx);
                let hi = self.io_read(self.regs.dx.wrapping_add(1));
                self.regs.ax = ((hi as u16) << 8) | lo as u16;
                8
            }
            0xEE => {
                self.io_write(self.regs.dx, self.regs.al());
                8
            }
            0xEF => {
                self.io_write(self.regs.dx, self.regs.al());
                self.io_write(self.regs.dx.wrapping_add(1), self.regs.ah());
                8
            }

            // ---- calls and jumps
            0xE8 => {
                let rel = self.fetch16();
                self.push16(self.regs.ip);
                self.regs.ip = self.regs.ip.wrapping_add(rel);
                19
            }
            0xE9 => {
                let rel = self.fetch16();
                self.regs.ip = self.regs.ip.wrapping_add(rel);
                15
            }
            0xEA => {
                let off = self.fetch16();
                let seg = self.fetch16();
                self.regs.ip = off;
                self.regs.cs = seg;
                15
            }
            0xEB => self.jump_rel8(true),

            0xF4 => {
                // HLT: with interrupts off nothing can ever wake us.
                if !self.regs.flag(FLAG_IF) {
                    return Err(StepError::CpuHalt);
                }
                self.regs.halted = true;
                2
            }
            0xF5 => {
                let cf = self.regs.flag(FLAG_CF);
                self.regs.set_flag(FLAG_CF, !cf);
                2
            }

            // ---- group 3
            0xF6 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load8(opnd);
                match reg {
                    0 | 1 => {
                        // TEST r/m8, imm8
                        let imm = self.fetch8();
                        let r = v & imm;
                        self.logic_flags8(r);
                        5 + ea
                    }
                    2 => {
                        self.store8(opnd, !v);
                        3 + ea
                    }
                    3 => {
                        // NEG: 0 - v, CF set unless v == 0
                        let r = self.sub8(0, v, false);
                        self.store8(opnd, r);
                        3 + ea
                    }
                    4 => {
                        self.mul8(v);
                        70 + ea
                    }
                    5 => {
                        self.imul8(v);
                        80 + ea
                    }
                    6 => {
                        if self.div8(v).is_err() {
                            self.interrupt(0);
                        }
                        80 + ea
                    }
                    _ => {
                        if self.idiv8(v).is_err() {
                            self.interrupt(0);
                        }
                        101 + ea
                    }
                }
            }
            0xF7 => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                let v = self.load16(opnd);
                match reg {
                    0 | 1 => {
                        let imm = self.fetch16();
                        let r = v & imm;
                        self.logic_flags16(r);
                        5 + ea
                    }
                    2 => {
                        self.store16(opnd, !v);
                        3 + ea
                    }
                    3 => {
                        let r = self.sub16(0, v, false);
                        self.store16(opnd, r);
                        3 + ea
                    }
                    4 => {
                        self.mul16(v);
                        118 + ea
                    }
                    5 => {
                        self.imul16(v);
                        128 + ea
                    }
                    6 => {
                        if self.div16(v).is_err() {
                            self.interrupt(0);
                        }
                        144 + ea
                    }
                    _ => {
                        if self.idiv16(v).is_err() {
                            self.interrupt(0);
                        }
                        165 + ea
                    }
                }
            }

            // ---- flag manipulation
            0xF8 => {
                self.regs.set_flag(FLAG_CF, false);
                2
            }
            0xF9 => {
                self.regs.set_flag(FLAG_CF, true);
                2
            }
            0xFA => {
                self.regs.set_flag(FLAG_IF, false);
                2
            }
            0xFB => {
                self.regs.set_flag(FLAG_IF, true);
                2
            }
            0xFC => {
                self.regs.set_flag(FLAG_DF, false);
                2
            }
            0xFD => {
                self.regs.set_flag(FLAG_DF, true);
                2
            }

            // ---- group 4
            0xFE => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                match reg {
                    0 => {
                        let v = self.load8(opnd);
                        let r = self.inc8(v);
                        self.store8(opnd, r);
                        3 + ea
                    }
                    1 => {
                        let v = self.load8(opnd);
                        let r = self.dec8(v);
                        self.store8(opnd, r);
                        3 + ea
                    }
                    _ => return Err(invalid(self)),
                }
            }

            // ---- group 5
            0xFF => {
                let (modbits, reg, rm) = self.fetch_modrm();
                let (opnd, ea) = self.rm_operand(modbits, rm, over);
                match reg {
                    0 => {
                        let v = self.load16(opnd);
                        let r = self.inc16(v);
                        self.store16(opnd, r);
                        3 + ea
                    }
                    1 => {
                        let v = self.load16(opnd);
                        let r = self.dec16(v);
                        self.store16(opnd, r);
                        3 + ea
                    }
                    2 => {
                        // CALL near indirect
                        let target = self.load16(opnd);
                        self.push16(self.regs.ip);
                        self.regs.ip = target;
                        16 + ea
                    }
                    3 => {
                        // CALL far indirect
                        let (seg, off) = match opnd {
                            Operand::Mem(seg, off) => (seg, off),
                            Operand::Reg(_) => return Err(invalid(self)),
                        };
                        let new_ip = self.mem_read16(seg, off);
                        let new_cs = self.mem_read16(seg, off.wrapping_add(2));
                        self.push16(self.regs.cs);
                        self.push16(self.regs.ip);
                        self.regs.ip = new_ip;
                        self.regs.cs = new_cs;
                        37 + ea
                    }
                    4 => {
                        // JMP near indirect
                        self.regs.ip = self.load16(opnd);
                        11 + ea
                    }
                    5 => {
                        // JMP far indirect
                        let (seg, off) = match opnd {
                            Operand::Mem(seg, off) => (seg, off),
                            Operand::Reg(_) => return Err(invalid(self)),
                        };
                        self.regs.ip = self.mem_read16(seg, off);
                        self.regs.cs = self.mem_read16(seg, off.wrapping_add(2));
                        24 + ea
                    }
                    6 => {
                        let v = self.load16(opnd);
                        self.push16(v);
                        16 + ea
                    }
                    _ => return Err(invalid(self)),
                }
            }

            _ => {
                log(LogCategory::Cpu, LogLevel::Warn, || {
                    format!(
                        "invalid opcode {:#04X} at {:04X}:{:04X}",
                        opcode, self.regs.cs, start_ip
                    )
                });
                return Err(invalid(self));
            }
        };

        Ok(cycles + prefix_cycles)
    }
}

/// Flat RAM over a fixed range. Handy for program-level unit tests; the
/// machine crate has the full scrambled-RAM peripheral.
pub struct ScratchRam {
    base: Pointer,
    data: Vec<u8>,
}

impl ScratchRam {
    pub fn new(base: Pointer, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    /// Copy `bytes` into the device-local buffer at `offset`.
    pub fn load(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }
}

impl Peripheral for ScratchRam {
    fn name(&self) -> &str {
        "Scratch RAM"
    }

    fn install(&mut self, cpu: &mut Processor, slot: Slot) -> Result<(), InstallError> {
        let to = self.base.wrapping_add(self.data.len() as u32 - 1);
        cpu.install_memory_device(slot, self.base, to)
    }

    fn read_byte(&self, addr: Pointer) -> u8 {
        self.data[(addr.linear().wrapping_sub(self.base.linear())) as usize % self.data.len()]
    }

    fn write_byte(&mut self, addr: Pointer, value: u8) {
        let len = self.data.len();
        self.data[(addr.linear().wrapping_sub(self.base.linear())) as usize % len] = value;
    }
}
