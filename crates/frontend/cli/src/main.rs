use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use rxt_core::logging::{LogConfig, LogLevel};
use rxt_machine::{Machine, MachineConfig, NullPlatform, Platform};

#[derive(Parser)]
#[command(name = "rxt", about = "IBM PC/XT (8088/V20) emulator")]
struct Args {
    /// BIOS image, mapped so it ends at the top of the 1 MiB address space
    #[arg(long)]
    bios: PathBuf,

    /// Conventional memory in KiB (capped at 640)
    #[arg(long, default_value_t = 640)]
    mem_kb: u32,

    /// Enable NEC V20 instruction extensions
    #[arg(long, default_value_t = false)]
    v20: bool,

    /// Install the interactive debugger
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Record executed instructions into the debugger history ring
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Break into the debugger before the first instruction (implies --debug)
    #[arg(long = "break", default_value_t = false)]
    break_on_start: bool,

    /// Render text mode to the terminal instead of a pixel surface
    #[arg(long, default_value_t = false)]
    text: bool,

    /// Dump registers and stats as JSON on exit
    #[arg(long)]
    save_state: Option<PathBuf>,

    /// Log verbosity: off, error, warn, info, debug, trace
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Append log output to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Text-mode fallback presenter: repaints the 80x25 (or 40x25) grid in
/// place and pushes MIPS updates into the terminal title.
struct TerminalPlatform;

impl Platform for TerminalPlatform {
    fn render_graphics(&self, _pixels: &[u8], _bg: (u8, u8, u8)) {
        // Pixel output needs a window; the text front-end drops it.
    }

    fn render_text(
        &self,
        cells: &[u8],
        _blink_enabled: bool,
        _bg_index: u8,
        cursor: Option<(u8, u8)>,
    ) {
        let cols = cells.len() / (25 * 2);
        if cols == 0 {
            return;
        }

        let mut out = String::with_capacity(cols * 26 + 8);
        out.push_str("\x1B[H");
        for row in 0..25 {
            for col in 0..cols {
                let at_cursor = cursor == Some((col as u8, row as u8));
                let ch = cells[(row * cols + col) * 2];
                out.push(match ch {
                    _ if at_cursor => '_',
                    0x20..=0x7E => ch as char,
                    0 => ' ',
                    _ => '.',
                });
            }
            out.push('\n');
        }

        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(out.as_bytes());
        let _ = lock.flush();
    }

    fn set_title(&self, title: &str) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = write!(lock, "\x1B]0;{}\x07", title);
        let _ = lock.flush();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = LogLevel::parse(&args.log_level)
        .with_context(|| format!("unknown log level: {}", args.log_level))?;
    LogConfig::global().set_global_level(level);
    if let Some(path) = args.log_file.clone() {
        LogConfig::global()
            .set_log_file(path)
            .context("opening log file")?;
    }

    let bios = fs::read(&args.bios)
        .with_context(|| format!("reading BIOS image {}", args.bios.display()))?;

    let platform: Arc<dyn Platform> = if args.text {
        Arc::new(TerminalPlatform)
    } else {
        Arc::new(NullPlatform)
    };

    let mut machine = Machine::new(MachineConfig {
        bios,
        memory_kb: args.mem_kb,
        clear_memory: false,
        v20: args.v20,
        debugger: args.debug || args.break_on_start,
        trace: args.trace,
        break_on_start: args.break_on_start,
        text_output: args.text,
        platform,
        debug_stream: None,
    })
    .context("machine installation failed")?;

    let outcome = machine.run();

    if let Some(path) = &args.save_state {
        let cpu = machine.processor();
        let state = serde_json::json!({
            "registers": cpu.get_registers(),
            "stats": cpu.get_stats(),
        });
        fs::write(path, serde_json::to_string_pretty(&state)?)
            .with_context(|| format!("writing state to {}", path.display()))?;
    }

    machine.close();
    outcome.context("emulation stopped with an error")?;
    Ok(())
}
