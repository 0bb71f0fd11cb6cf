//! Severity levels and the shared threshold holder

use std::sync::atomic::{AtomicU8, Ordering};

use tracing::Level;

/// Numeric severity, higher is more severe
pub(crate) fn severity(level: Level) -> u8 {
    match level {
        Level::TRACE => 0,
        Level::DEBUG => 1,
        Level::INFO => 2,
        Level::WARN => 3,
        _ => 4,
    }
}

fn from_severity(value: u8) -> Level {
    match value {
        0 => Level::TRACE,
        1 => Level::DEBUG,
        2 => Level::INFO,
        3 => Level::WARN,
        _ => Level::ERROR,
    }
}

/// Parse a level name, case-insensitively
///
/// Accepts `DEBUG`, `INFO`, `WARN`, `WARNING` and `ERROR`.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.to_ascii_uppercase().as_str() {
        "DEBUG" => Some(Level::DEBUG),
        "INFO" => Some(Level::INFO),
        "WARN" | "WARNING" => Some(Level::WARN),
        "ERROR" => Some(Level::ERROR),
        _ => None,
    }
}

/// Atomically readable severity threshold
///
/// Reads never block. Every value observed by a reader is one that was
/// stored at some point.
#[derive(Debug)]
pub struct LevelVar(AtomicU8);

impl LevelVar {
    pub fn new(level: Level) -> Self {
        Self(AtomicU8::new(severity(level)))
    }

    pub fn get(&self) -> Level {
        from_severity(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, level: Level) {
        self.0.store(severity(level), Ordering::Release);
    }

    /// Whether a record at `level` passes the threshold
    pub fn enabled(&self, level: Level) -> bool {
        severity(level) >= self.0.load(Ordering::Acquire)
    }
}

impl Default for LevelVar {
    fn default() -> Self {
        Self::new(Level::INFO)
    }
}
