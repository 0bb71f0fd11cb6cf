//! The enriching log handler

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use logkit_core_types::schema::{FIELD_STACK, FIELD_TRACE_ID};
use logkit_core_types::RequestContext;
use logkit_errors::LogError;
use tracing::Level;

use crate::config::LogConfig;
use crate::encoder::{self, RecordHandler};
use crate::level::{severity, LevelVar};
use crate::options::{LogFormat, LogHandlerBuilder};
use crate::record::{Record, Value};
use crate::rotation::RotatingSink;
use crate::stack;

/// Structured log handler
///
/// Wraps a text or JSON [`RecordHandler`] and enriches each record before
/// delegating: `traceId` when the context carries one, `stack` on ERROR
/// records. Clones share the same threshold, writer and encoder.
#[derive(Clone)]
pub struct LogHandler {
    inner: Arc<Inner>,
}

struct Inner {
    level: LevelVar,
    level_lock: Mutex<()>,
    format: LogFormat,
    delegate: Box<dyn RecordHandler>,
    stack_trace_skip: usize,
    stack_trace_max_depth: usize,
}

impl LogHandler {
    /// Handler with default settings: INFO, stdout, text
    pub fn new() -> Self {
        LogHandlerBuilder::new().build()
    }

    pub fn builder() -> LogHandlerBuilder {
        LogHandlerBuilder::new()
    }

    /// Build a handler writing to stdout, plus a rotating sink when configured
    pub fn from_config(config: &LogConfig) -> Self {
        let mut builder = LogHandlerBuilder::new();
        if let Some(format) = &config.format {
            builder = builder.format(format);
        }
        if let Some(level) = &config.level {
            builder = builder.level_str(level);
        }
        if let Some(stack_trace) = &config.stack_trace {
            builder = builder.stack_trace(stack_trace.skip, stack_trace.max_depth);
        }
        if let Some(rotation) = &config.rotation {
            builder = builder.rotating_sink(RotatingSink::new(rotation.clone()));
        }
        builder.build()
    }

    pub(crate) fn from_builder(builder: LogHandlerBuilder) -> Self {
        let delegate = encoder::for_format(builder.format, builder.writer, builder.options);
        Self {
            inner: Arc::new(Inner {
                level: LevelVar::new(builder.level),
                level_lock: Mutex::new(()),
                format: builder.format,
                delegate,
                stack_trace_skip: builder.stack_trace_skip,
                stack_trace_max_depth: builder.stack_trace_max_depth,
            }),
        }
    }

    /// Enrich `record` and pass it to the encoder
    ///
    /// The encoder's result is returned as is; a failed write is not retried.
    pub fn handle(&self, ctx: &RequestContext, mut record: Record) -> Result<(), LogError> {
        if let Some(trace_id) = ctx.trace_id() {
            record.add_field(FIELD_TRACE_ID, trace_id.as_str());
        }
        if severity(record.level) >= severity(Level::ERROR) {
            let frames = stack::capture(
                self.inner.stack_trace_skip,
                self.inner.stack_trace_max_depth,
            );
            if !frames.is_empty() {
                record.add_field(FIELD_STACK, Value::List(frames));
            }
        }
        self.inner.delegate.handle(&record)
    }

    /// Change the threshold for every subsequent record
    pub fn set_level(&self, level: Level) {
        let _guard = self
            .inner
            .level_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.inner.level.set(level);
    }

    pub fn level(&self) -> Level {
        self.inner.level.get()
    }

    /// Whether a record at `level` passes the current threshold
    pub fn level_enabled(&self, level: Level) -> bool {
        self.inner.level.enabled(level)
    }

    pub fn format(&self) -> LogFormat {
        self.inner.format
    }
}

impl Default for LogHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogHandler")
            .field("level", &self.level())
            .field("format", &self.inner.format)
            .field("stack_trace_skip", &self.inner.stack_trace_skip)
            .field("stack_trace_max_depth", &self.inner.stack_trace_max_depth)
            .finish()
    }
}
