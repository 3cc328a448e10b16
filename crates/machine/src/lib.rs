//! IBM PC/XT machine assembly.
//!
//! [`Machine`] wires the peripherals into a processor in a fixed order:
//! conventional RAM, the BIOS ROM at the top of the address space, the
//! interrupt controller, the CGA adapter, and finally the debugger overlay
//! (which must install last so its shadow table captures every other
//! device). `run` drives the step loop and treats `CpuHalt` and `DebugQuit`
//! as a clean shutdown.

pub mod cga;
pub mod debugger;
pub mod pic;
pub mod platform;
pub mod ram;
pub mod rom;

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use rxt_core::logging::{log, LogCategory, LogLevel};
use rxt_core::{InstallError, Peripheral, Pointer, Processor, StepError};

pub use cga::Cga;
pub use debugger::{DebugStream, Debugger, StdioStream};
pub use pic::Pic;
pub use platform::{NullPlatform, Platform};
pub use ram::Ram;
pub use rom::Rom;

pub struct MachineConfig {
    /// BIOS image, installed so it ends at the top of the address space.
    /// Empty skips the ROM (useful for program-level tests).
    pub bios: Vec<u8>,
    /// Conventional memory size, capped at 640.
    pub memory_kb: u32,
    /// Zero RAM instead of scrambling it.
    pub clear_memory: bool,
    /// NEC V20 / 80186 instruction extensions.
    pub v20: bool,
    /// Install the debugger overlay.
    pub debugger: bool,
    /// Populate the instruction history ring.
    pub trace: bool,
    /// Enter the debugger before the first instruction.
    pub break_on_start: bool,
    /// Headless text rendering instead of pixel surfaces.
    pub text_output: bool,
    pub platform: Arc<dyn Platform>,
    /// Debugger connection; stdio when absent.
    pub debug_stream: Option<Box<dyn DebugStream>>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            bios: Vec::new(),
            memory_kb: 640,
            clear_memory: false,
            v20: false,
            debugger: false,
            trace: false,
            break_on_start: false,
            text_output: false,
            platform: Arc::new(NullPlatform),
            debug_stream: None,
        }
    }
}

pub struct Machine {
    cpu: Processor,
}

impl Machine {
    pub fn new(mut config: MachineConfig) -> Result<Self, InstallError> {
        let mut cpu = Processor::new();

        let memory = (config.memory_kb.min(640) as usize) * 1024;
        let ram = if config.clear_memory {
            Ram::cleared(Pointer::from_linear(0), memory)
        } else {
            Ram::new(Pointer::from_linear(0), memory)
        };
        cpu.install(Rc::new(RefCell::new(ram)))?;

        if !config.bios.is_empty() {
            let base =
                Pointer::from_linear(0x10_0000u32.wrapping_sub(config.bios.len() as u32));
            let bios = std::mem::take(&mut config.bios);
            cpu.install(Rc::new(RefCell::new(Rom::new("BIOS", base, bios))))?;
        }

        let pic = Rc::new(RefCell::new(Pic::new()));
        cpu.install(pic.clone())?;
        cpu.set_interrupt_controller(pic);

        let cga = Rc::new(RefCell::new(Cga::new(
            config.platform.clone(),
            config.text_output,
        )));
        cpu.install(cga.clone())?;

        if config.debugger {
            let stream = config
                .debug_stream
                .take()
                .unwrap_or_else(|| Box::new(StdioStream));
            let dbg = Rc::new(RefCell::new(Debugger::new(
                stream,
                config.trace,
                config.break_on_start,
            )));
            if let Err(e) = cpu.install(dbg) {
                // Stop the render thread we already started.
                cga.borrow_mut().close();
                return Err(e);
            }
        }

        cpu.set_v20_support(config.v20);
        cpu.reset();

        log(LogCategory::Bus, LogLevel::Info, || {
            "machine assembled".to_string()
        });
        Ok(Self { cpu })
    }

    pub fn processor(&mut self) -> &mut Processor {
        &mut self.cpu
    }

    /// One instruction plus one round of peripheral time.
    pub fn step(&mut self) -> Result<u32, StepError> {
        self.cpu.step()
    }

    /// Drive the machine until it terminates. HLT with interrupts disabled
    /// and a debugger quit are normal shutdowns.
    pub fn run(&mut self) -> Result<(), StepError> {
        loop {
            match self.cpu.step() {
                Ok(_) => {}
                Err(StepError::CpuHalt) => {
                    log(LogCategory::Cpu, LogLevel::Info, || {
                        "cpu halted, shutting down".to_string()
                    });
                    return Ok(());
                }
                Err(StepError::DebugQuit) => {
                    log(LogCategory::Debugger, LogLevel::Info, || {
                        "debugger quit".to_string()
                    });
                    return Ok(());
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn close(&mut self) {
        self.cpu.close();
    }
}

impl Drop for Machine {
    fn drop(&mut self) {
        self.close();
    }
}
