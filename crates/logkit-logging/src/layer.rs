//! `tracing` integration
//!
//! `LogHandler` is a [`Layer`]: spans carrying a `traceId` field remember it,
//! and every event that passes the threshold is turned into a [`Record`] and
//! sent through [`LogHandler::handle`] with the innermost span's `traceId`.

use std::fmt;

use logkit_core_types::schema::FIELD_TRACE_ID;
use logkit_core_types::{RequestContext, TraceId};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanValues};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_log::NormalizeEvent;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::handler::LogHandler;
use crate::record::{Record, Source, Value};

/// Span extension holding the correlation id recorded on that span
struct SpanTraceId(TraceId);

#[derive(Default)]
struct TraceIdVisitor {
    trace_id: Option<String>,
}

impl Visit for TraceIdVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == FIELD_TRACE_ID {
            self.trace_id = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == FIELD_TRACE_ID {
            self.trace_id = Some(format!("{:?}", value));
        }
    }
}

/// Collects the message and fields of an event
struct EventVisitor<'r> {
    record: &'r mut Record,
}

impl EventVisitor<'_> {
    fn push(&mut self, field: &Field, value: Value) {
        let name = field.name();
        if name == "message" {
            self.record.message = value.to_string();
        } else if !name.starts_with("log.") {
            self.record.add_field(name, value);
        }
    }
}

impl Visit for EventVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::I64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::U64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::F64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::Str(value.to_string()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, Value::Str(format!("{:?}", value)));
    }
}

fn store_trace_id<S>(visitor: TraceIdVisitor, id: &Id, ctx: &Context<'_, S>)
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let (Some(trace_id), Some(span)) = (visitor.trace_id, ctx.span(id)) else {
        return;
    };
    span.extensions_mut()
        .replace(SpanTraceId(TraceId::from_string(trace_id)));
}

/// Innermost `traceId` in the event's span scope
fn scope_trace_id<S>(event: &Event<'_>, ctx: &Context<'_, S>) -> Option<TraceId>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    ctx.event_scope(event)?.find_map(|span| {
        let extensions = span.extensions();
        extensions.get::<SpanTraceId>().map(|stored| stored.0.clone())
    })
}

/// Convert a `tracing` event into a record
pub(crate) fn record_from_event(event: &Event<'_>) -> Record {
    let normalized = event.normalized_metadata();
    let metadata = normalized.as_ref().unwrap_or_else(|| event.metadata());

    let mut record = Record::new(*metadata.level(), String::new());
    if let Some(line) = metadata.line() {
        record.source = Some(Source {
            function: metadata
                .module_path()
                .unwrap_or_else(|| metadata.target())
                .to_string(),
            file: metadata.file().map(str::to_string),
            line,
        });
    }
    event.record(&mut EventVisitor {
        record: &mut record,
    });
    record
}

impl<S> Layer<S> for LogHandler
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        // The threshold can change at any time, so nothing may be cached.
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        metadata.is_span() || self.level_enabled(*metadata.level())
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = TraceIdVisitor::default();
        attrs.record(&mut visitor);
        store_trace_id(visitor, id, &ctx);
    }

    fn on_record(&self, id: &Id, values: &SpanValues<'_>, ctx: Context<'_, S>) {
        let mut visitor = TraceIdVisitor::default();
        values.record(&mut visitor);
        store_trace_id(visitor, id, &ctx);
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let level = event
            .normalized_metadata()
            .map(|metadata| *metadata.level())
            .unwrap_or_else(|| *event.metadata().level());
        if !self.level_enabled(level) {
            return;
        }

        let context = scope_trace_id(event, &ctx)
            .map(RequestContext::from)
            .unwrap_or_default();
        if let Err(err) = self.handle(&context, record_from_event(event)) {
            eprintln!("logkit: failed to handle log record: {}", err);
        }
    }
}
