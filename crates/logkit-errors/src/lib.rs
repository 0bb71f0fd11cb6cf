//! Error facility for logkit
//!
//! Every error maps to an [`ErrorKind`] with a stable code, so callers can
//! branch on the kind instead of matching message text. Errors are `Clone`:
//! the crash handler stores its one-time result and hands a copy to every
//! caller, so OS errors are kept behind an `Arc`.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Canonical error kind taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Writing a record or opening a file failed at the OS level
    Io,
    /// A record could not be encoded
    Serialization,
    /// A configuration document could not be parsed
    InvalidConfig,
    /// The crash-output destination could not be registered
    CrashOutputUnavailable,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Io => "ERR_IO",
            ErrorKind::Serialization => "ERR_SERIALIZATION",
            ErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ErrorKind::CrashOutputUnavailable => "ERR_CRASH_OUTPUT_UNAVAILABLE",
        }
    }
}

/// Errors surfaced by the log handler and its writers
#[derive(Error, Debug)]
pub enum LogError {
    /// The writer chain rejected the encoded record
    #[error("failed to write log record: {0}")]
    Write(#[from] io::Error),

    /// The JSON encoder failed
    #[error("failed to encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    /// A configuration document was malformed
    #[error("invalid log configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl LogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LogError::Write(_) => ErrorKind::Io,
            LogError::Encode(_) => ErrorKind::Serialization,
            LogError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }
}

/// Errors surfaced by the crash handler
#[derive(Error, Debug, Clone)]
pub enum CrashLogError {
    /// The crash log file could not be opened
    #[error("failed to create crash log file ({}): {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// The crash log file was opened but could not be registered as crash output
    #[error("failed to set crash output ({}): {reason}", path.display())]
    Register { path: PathBuf, reason: String },

    /// Flushing the crash log file on close failed
    #[error("failed to close crash log file ({}): {source}", path.display())]
    Close {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },
}

impl CrashLogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CrashLogError::Open { .. } | CrashLogError::Close { .. } => ErrorKind::Io,
            CrashLogError::Register { .. } => ErrorKind::CrashOutputUnavailable,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// The crash log path this error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            CrashLogError::Open { path, .. }
            | CrashLogError::Register { path, .. }
            | CrashLogError::Close { path, .. } => path,
        }
    }
}
