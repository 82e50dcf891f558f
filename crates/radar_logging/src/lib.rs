#![deny(missing_docs)]
//! Shared logging utilities for the radar workspace.
//!
//! This crate provides the `radar_*` logging macros used across the codebase,
//! a terminal initializer for tests and an in-memory capture logger so tests
//! can assert on what a rotation logged.

use std::sync::{Mutex, OnceLock};

use log::{Log, Metadata, Record};

#[doc(hidden)]
pub use log;

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! radar_trace {
    ($($arg:tt)*) => {{
        $crate::log::trace!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! radar_debug {
    ($($arg:tt)*) => {{
        $crate::log::debug!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! radar_info {
    ($($arg:tt)*) => {{
        $crate::log::info!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! radar_warn {
    ($($arg:tt)*) => {{
        $crate::log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! radar_error {
    ($($arg:tt)*) => {{
        $crate::log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

/// In-memory logger that keeps every formatted record.
///
/// Lines are stored as `LEVEL target: message`.
#[derive(Debug, Default)]
pub struct LogCapture {
    lines: Mutex<Vec<String>>,
}

impl LogCapture {
    /// Returns a copy of every captured line, oldest first.
    pub fn records(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns `true` if any captured line contains every needle.
    pub fn contains_all(&self, needles: &[&str]) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .any(|line| needles.iter().all(|needle| line.contains(needle)))
    }

    /// Returns `true` if any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.contains_all(&[needle])
    }
}

impl Log for LogCapture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = format!("{} {}: {}", record.level(), record.target(), record.args());
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(line);
    }

    fn flush(&self) {}
}

static CAPTURE: OnceLock<LogCapture> = OnceLock::new();

/// Installs the process-wide capture logger and returns it.
///
/// The first call wins; later calls return the same capture. Tests in one
/// binary share it, so assertions should look for values unique to the test.
/// Nothing is captured if a different logger was installed first.
pub fn capture_for_tests() -> &'static LogCapture {
    let capture = CAPTURE.get_or_init(LogCapture::default);
    if log::set_logger(capture).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
    capture
}
