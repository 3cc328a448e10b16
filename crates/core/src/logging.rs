//! Structured logging for the emulator.
//!
//! A single global [`LogConfig`] holds one atomic level per category plus a
//! global fallback level. Messages are built lazily through a closure so a
//! disabled category costs nothing, and file output goes through a background
//! writer thread so the emulation loop never blocks on disk.
//!
//! Debugger REPL traffic does not go through here; it has its own stream.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::mpsc::{channel, Sender};
use std::sync::{Mutex, OnceLock};
use std::thread;

/// Verbosity, ordered so `level <= configured` means "emit".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Off = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    /// Parse a level name or digit, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "off" | "0" => Some(LogLevel::Off),
            "error" | "err" | "1" => Some(LogLevel::Error),
            "warn" | "warning" | "2" => Some(LogLevel::Warn),
            "info" | "3" => Some(LogLevel::Info),
            "debug" | "4" => Some(LogLevel::Debug),
            "trace" | "5" => Some(LogLevel::Trace),
            _ => None,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Off,
        }
    }
}

/// Emulator subsystems that can be tuned independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Cpu,
    Bus,
    Interrupts,
    Video,
    Debugger,
}

const CATEGORY_COUNT: usize = 5;

impl LogCategory {
    fn index(self) -> usize {
        match self {
            LogCategory::Cpu => 0,
            LogCategory::Bus => 1,
            LogCategory::Interrupts => 2,
            LogCategory::Video => 3,
            LogCategory::Debugger => 4,
        }
    }

    fn tag(self) -> &'static str {
        match self {
            LogCategory::Cpu => "cpu",
            LogCategory::Bus => "bus",
            LogCategory::Interrupts => "irq",
            LogCategory::Video => "video",
            LogCategory::Debugger => "debug",
        }
    }
}

/// Global logging configuration.
pub struct LogConfig {
    global_level: AtomicU8,
    category_levels: [AtomicU8; CATEGORY_COUNT],
    file_sink: Mutex<Option<Sender<String>>>,
    file_enabled: AtomicBool,
}

impl LogConfig {
    fn new() -> Self {
        const OFF: AtomicU8 = AtomicU8::new(0);
        Self {
            global_level: AtomicU8::new(LogLevel::Warn as u8),
            category_levels: [OFF; CATEGORY_COUNT],
            file_sink: Mutex::new(None),
            file_enabled: AtomicBool::new(false),
        }
    }

    /// The process-wide instance.
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<LogConfig> = OnceLock::new();
        INSTANCE.get_or_init(LogConfig::new)
    }

    pub fn set_global_level(&self, level: LogLevel) {
        self.global_level.store(level as u8, Ordering::Relaxed);
    }

    /// Per-category override; `Off` falls back to the global level.
    pub fn set_level(&self, category: LogCategory, level: LogLevel) {
        self.category_levels[category.index()].store(level as u8, Ordering::Relaxed);
    }

    pub fn should_log(&self, category: LogCategory, level: LogLevel) -> bool {
        let cat = LogLevel::from_u8(self.category_levels[category.index()].load(Ordering::Relaxed));
        let limit = if cat != LogLevel::Off {
            cat
        } else {
            LogLevel::from_u8(self.global_level.load(Ordering::Relaxed))
        };
        level != LogLevel::Off && level <= limit
    }

    /// Route output to a file via a background writer thread. Messages fall
    /// back to stderr if the thread cannot keep the channel open.
    pub fn set_log_file(&self, path: PathBuf) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let (sender, receiver) = channel::<String>();

        thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    let _ = writeln!(file, "{}", message);
                }
                let _ = file.flush();
            })?;

        *self.file_sink.lock().unwrap() = Some(sender);
        self.file_enabled.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn write_message(&self, message: &str) {
        if self.file_enabled.load(Ordering::Relaxed) {
            if let Some(sender) = self.file_sink.lock().unwrap().as_ref() {
                if sender.send(message.to_string()).is_ok() {
                    return;
                }
            }
        }
        eprintln!("{}", message);
    }
}

/// Emit a message if `category`/`level` is enabled. The closure only runs
/// when the message will actually be written.
pub fn log<F>(category: LogCategory, level: LogLevel, message: F)
where
    F: FnOnce() -> String,
{
    let config = LogConfig::global();
    if config.should_log(category, level) {
        config.write_message(&format!("[{}] {}", category.tag(), message()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parsing() {
        assert_eq!(LogLevel::parse("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("ERROR"), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("3"), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn category_overrides_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Error);
        config.set_level(LogCategory::Cpu, LogLevel::Debug);

        assert!(config.should_log(LogCategory::Cpu, LogLevel::Debug));
        assert!(!config.should_log(LogCategory::Bus, LogLevel::Debug));
        assert!(config.should_log(LogCategory::Bus, LogLevel::Error));
    }

    #[test]
    fn off_never_logs() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Trace);
        assert!(!config.should_log(LogCategory::Video, LogLevel::Off));
    }

    #[test]
    fn off_category_falls_back_to_global() {
        let config = LogConfig::new();
        config.set_global_level(LogLevel::Info);
        assert!(config.should_log(LogCategory::Interrupts, LogLevel::Info));
        assert!(!config.should_log(LogCategory::Interrupts, LogLevel::Debug));
    }
}
