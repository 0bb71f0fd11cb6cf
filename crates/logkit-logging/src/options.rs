//! Handler construction options
//!
//! `LogHandlerBuilder` applies its settings in call order, so a later call
//! overrides an earlier one. `rotating_sink` is the exception: it tees the
//! sink onto whatever writer is configured at that point.

use std::fmt;
use std::io;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter, MakeWriterExt};

use crate::handler::LogHandler;
use crate::level::parse_level;
use crate::record::Value;
use crate::rotation::RotatingSink;

pub const DEFAULT_STACK_TRACE_SKIP: usize = 4;
pub const DEFAULT_STACK_TRACE_MAX_DEPTH: usize = 3;

/// Output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Case-insensitive; anything other than `json` selects text
    pub fn parse(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Hook applied to every top-level field (`time`, `level`, `source`, `msg`,
/// then record fields) right before encoding. Returning `None` drops the field.
pub type ReplaceField = Arc<dyn Fn(&str, Value) -> Option<Value> + Send + Sync>;

/// Encoder options passed through to the text/JSON handlers
#[derive(Clone)]
pub struct HandlerOptions {
    /// Emit the `source` field when the record has a caller location
    pub add_source: bool,
    pub replace_field: Option<ReplaceField>,
}

impl HandlerOptions {
    pub fn with_replace_field<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.replace_field = Some(Arc::new(f));
        self
    }
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            add_source: true,
            replace_field: None,
        }
    }
}

impl fmt::Debug for HandlerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerOptions")
            .field("add_source", &self.add_source)
            .field("replace_field", &self.replace_field.is_some())
            .finish()
    }
}

/// Builder for [`LogHandler`]
///
/// Defaults: INFO threshold, stdout, text format, stack skip 4, stack depth 3.
pub struct LogHandlerBuilder {
    pub(crate) writer: BoxMakeWriter,
    pub(crate) format: LogFormat,
    pub(crate) level: Level,
    pub(crate) options: HandlerOptions,
    pub(crate) stack_trace_skip: usize,
    pub(crate) stack_trace_max_depth: usize,
}

impl Default for LogHandlerBuilder {
    fn default() -> Self {
        Self {
            writer: BoxMakeWriter::new(io::stdout),
            format: LogFormat::Text,
            level: Level::INFO,
            options: HandlerOptions::default(),
            stack_trace_skip: DEFAULT_STACK_TRACE_SKIP,
            stack_trace_max_depth: DEFAULT_STACK_TRACE_MAX_DEPTH,
        }
    }
}

impl LogHandlerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the output writer
    pub fn writer<W>(mut self, writer: W) -> Self
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        self.writer = BoxMakeWriter::new(writer);
        self
    }

    /// Select the encoding: `text` or `json`, case-insensitive
    pub fn format(mut self, format: &str) -> Self {
        self.format = LogFormat::parse(format);
        self
    }

    pub fn log_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set the threshold from a name; unknown names warn and fall back to INFO
    pub fn level_str(mut self, level: &str) -> Self {
        self.level = match parse_level(level) {
            Some(level) => level,
            None => {
                tracing::warn!(requested = level, "unknown log level, falling back to INFO");
                Level::INFO
            }
        };
        self
    }

    pub fn handler_options(mut self, options: HandlerOptions) -> Self {
        self.options = options;
        self
    }

    /// Tune stack snapshots on ERROR records
    pub fn stack_trace(mut self, skip: usize, max_depth: usize) -> Self {
        self.stack_trace_skip = skip;
        self.stack_trace_max_depth = max_depth;
        self
    }

    /// Write to `sink` in addition to the current writer
    pub fn rotating_sink(mut self, sink: RotatingSink) -> Self {
        let current = std::mem::replace(&mut self.writer, BoxMakeWriter::new(io::sink));
        self.writer = BoxMakeWriter::new(current.and(sink));
        self
    }

    pub fn build(self) -> LogHandler {
        LogHandler::from_builder(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_is_case_insensitive() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("Json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("TEXT"), LogFormat::Text);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }

    #[test]
    fn test_builder_defaults() {
        let builder = LogHandlerBuilder::new();
        assert_eq!(builder.format, LogFormat::Text);
        assert_eq!(builder.level, Level::INFO);
        assert_eq!(builder.stack_trace_skip, 4);
        assert_eq!(builder.stack_trace_max_depth, 3);
        assert!(builder.options.add_source);
    }

    #[test]
    fn test_later_options_override_earlier() {
        let builder = LogHandlerBuilder::new()
            .level(Level::ERROR)
            .level_str("debug")
            .format("json")
            .format("text")
            .stack_trace(2, 8);
        assert_eq!(builder.level, Level::DEBUG);
        assert_eq!(builder.format, LogFormat::Text);
        assert_eq!(builder.stack_trace_skip, 2);
        assert_eq!(builder.stack_trace_max_depth, 8);
    }

    #[test]
    fn test_unknown_level_string_falls_back_to_info() {
        let builder = LogHandlerBuilder::new().level(Level::ERROR).level_str("verbose");
        assert_eq!(builder.level, Level::INFO);
    }

    #[test]
    fn test_unknown_level_string_warns() {
        use crate::test_capture::CaptureWriter;
        use tracing_subscriber::layer::SubscriberExt;

        let capture = CaptureWriter::new();
        let observer = LogHandlerBuilder::new().writer(capture.clone()).build();
        let subscriber = tracing_subscriber::registry().with(observer);

        let builder = tracing::subscriber::with_default(subscriber, || {
            LogHandlerBuilder::new().level_str("Warning").level_str("verbose")
        });

        assert_eq!(builder.level, Level::INFO);
        let lines = capture.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("level=WARN"));
        assert!(lines[0].contains("msg=\"unknown log level, falling back to INFO\""));
        assert!(lines[0].contains("requested=verbose"));
    }
}
