//! File-backed logging for the engine.
//!
//! Three levels are enough here:
//! - WARN: recoverable anomalies (allocation gaps, cancelled runs)
//! - INFO: task lifecycle (creation, completion, worker registration)
//! - DEBUG: dispatch and bid traces
//!
//! Debug output is enabled with `init_with_debug(true)` or `QUORUM_DEBUG=1`.
//! Without `init`, logging is a no-op, which keeps library embedders and
//! the test suite free of filesystem writes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Log levels, most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Warn = 0,
    Info = 1,
    Debug = 2,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }
}

/// Initialize logging to `~/.quorum/quorum.log`, truncating any
/// previous run's output.
pub fn init() {
    init_with_debug(false);
}

/// Initialize logging with an explicit debug setting. `QUORUM_DEBUG=1`
/// in the environment also enables debug output.
pub fn init_with_debug(debug: bool) {
    let env_debug = std::env::var("QUORUM_DEBUG")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let level = if debug || env_debug {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    LOG_LEVEL.store(level as u8, Ordering::SeqCst);

    if let Some(quorum_dir) = dirs::home_dir().map(|h| h.join(".quorum")) {
        let _ = std::fs::create_dir_all(&quorum_dir);
        let path = quorum_dir.join("quorum.log");
        let _ = std::fs::write(&path, "");
        LOG_PATH.set(path).ok();
    }
}

/// Whether a message at `level` passes the current filter.
pub fn enabled(level: LogLevel) -> bool {
    level as u8 <= LOG_LEVEL.load(Ordering::Relaxed)
}

fn log_at(level: LogLevel, msg: &str) {
    if !enabled(level) {
        return;
    }
    if let Some(path) = LOG_PATH.get() {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
            let _ = writeln!(file, "[{}] [{}] {}", timestamp, level.as_str(), msg);
        }
    }
}

/// Log a message at WARN level.
pub fn warn(msg: &str) {
    log_at(LogLevel::Warn, msg);
}

/// Log a message at INFO level.
pub fn info(msg: &str) {
    log_at(LogLevel::Info, msg);
}

/// Log a message at DEBUG level (only after debug is enabled).
pub fn debug(msg: &str) {
    log_at(LogLevel::Debug, msg);
}

/// Log macro for INFO level (convenience).
#[macro_export]
macro_rules! qlog {
    ($($arg:tt)*) => {
        $crate::log::info(&format!($($arg)*))
    };
}

/// Log macro for WARN level.
#[macro_export]
macro_rules! qlog_warn {
    ($($arg:tt)*) => {
        $crate::log::warn(&format!($($arg)*))
    };
}

/// Log macro for DEBUG level.
#[macro_export]
macro_rules! qlog_debug {
    ($($arg:tt)*) => {
        $crate::log::debug(&format!($($arg)*))
    };
}
