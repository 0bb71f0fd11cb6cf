//! Structured logging handler for logkit
//!
//! This crate provides a process-wide log handler with:
//! - Correlation enrichment: a `traceId` taken from the request context or
//!   from the innermost span carrying a `traceId` field
//! - Stack snapshots (`"function:line"` frames) on ERROR records
//! - Interchangeable text and JSON encoders
//! - A runtime-adjustable severity threshold
//! - Fan-out to several writers, including a size-rotating file sink
//! - Installation as the process-wide default (`tracing` and `log` calls)
//!
//! # Usage
//!
//! ```no_run
//! use logkit_logging::{rotation, LogHandler};
//!
//! let handler = LogHandler::builder()
//!     .format("json")
//!     .level_str("debug")
//!     .rotating_sink(rotation::default_sink())
//!     .build();
//! handler.set_default_log();
//!
//! tracing::info_span!("request", traceId = "abc123").in_scope(|| {
//!     tracing::error!(user = "alice", "payment failed");
//! });
//! ```

pub mod config;
pub mod default;
pub mod encoder;
pub mod handler;
pub mod layer;
pub mod level;
pub mod options;
pub mod record;
pub mod rotation;
pub mod stack;
pub mod test_capture;

pub use config::{LogConfig, StackTraceConfig};
pub use default::{default_handler, init};
pub use encoder::{JsonHandler, RecordHandler, TextHandler};
pub use handler::LogHandler;
pub use level::{parse_level, LevelVar};
pub use options::{HandlerOptions, LogFormat, LogHandlerBuilder};
pub use record::{Record, Source, Value};
pub use rotation::{RotatingSink, SinkConfig};

pub use logkit_errors::LogError;
