//! File-based handler configuration
//!
//! ```toml
//! format = "json"
//! level = "warn"
//!
//! [stack_trace]
//! skip = 4
//! max_depth = 5
//!
//! [rotation]
//! filename = "/var/log/app/app.log"
//! max_size = 100
//! max_backups = 10
//! max_age = 30
//! compress = true
//! local_time = true
//! ```

use std::path::Path;

use logkit_errors::LogError;
use serde::{Deserialize, Serialize};

use crate::options::{DEFAULT_STACK_TRACE_MAX_DEPTH, DEFAULT_STACK_TRACE_SKIP};
use crate::rotation::SinkConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `text` or `json`
    pub format: Option<String>,
    /// `DEBUG`, `INFO`, `WARN`/`WARNING` or `ERROR`
    pub level: Option<String>,
    pub stack_trace: Option<StackTraceConfig>,
    /// Also write to a rotating file
    pub rotation: Option<SinkConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackTraceConfig {
    pub skip: usize,
    pub max_depth: usize,
}

impl Default for StackTraceConfig {
    fn default() -> Self {
        Self {
            skip: DEFAULT_STACK_TRACE_SKIP,
            max_depth: DEFAULT_STACK_TRACE_MAX_DEPTH,
        }
    }
}

impl LogConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, LogError> {
        toml::from_str(source).map_err(|err| LogError::InvalidConfig {
            reason: err.to_string(),
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_all_defaults() {
        let config = LogConfig::from_toml_str("").unwrap();
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_partial_stack_trace_table_keeps_defaults() {
        let config = LogConfig::from_toml_str("[stack_trace]\nmax_depth = 8\n").unwrap();
        assert_eq!(
            config.stack_trace,
            Some(StackTraceConfig {
                skip: 4,
                max_depth: 8
            })
        );
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = LogConfig::from_toml_str("format = [").unwrap_err();
        assert_eq!(err.code(), "ERR_INVALID_CONFIG");
    }
}
