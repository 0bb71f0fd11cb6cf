//! Canonical schema constants for structured log records
//!
//! These constants keep field names consistent between the handler, its
//! encoders and the callers that put a correlation id into span fields.

// Built-in record keys
pub const FIELD_TIME: &str = "time";
pub const FIELD_LEVEL: &str = "level";
pub const FIELD_SOURCE: &str = "source";
pub const FIELD_MESSAGE: &str = "msg";

// Enrichment keys
pub const FIELD_TRACE_ID: &str = "traceId";
pub const FIELD_STACK: &str = "stack";
