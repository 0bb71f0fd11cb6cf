//! Correlation types for request tracking
//!
//! A `TraceId` is an opaque string that ties log records to one logical
//! request. It travels either in an explicit `RequestContext` or, inside
//! `tracing`, as a span field named [`FIELD_TRACE_ID`](crate::schema::FIELD_TRACE_ID).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque correlation identifier for a single request or operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new random TraceId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (e.g. an inbound request header)
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request-scoped context read by the log handler
///
/// The handler only reads it. An empty context is valid: records emitted
/// through it simply carry no `traceId`.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    trace_id: Option<TraceId>,
}

impl RequestContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a TraceId to the context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// The correlation identifier, if one was attached
    ///
    /// An empty identifier is treated as absent.
    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref().filter(|id| !id.as_str().is_empty())
    }
}

impl From<TraceId> for RequestContext {
    fn from(trace_id: TraceId) -> Self {
        Self::new().with_trace_id(trace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_generation() {
        let id1 = TraceId::new();
        let id2 = TraceId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_trace_id_display() {
        let id = TraceId::from_string("abc123");
        assert_eq!(format!("{}", id), "abc123");
    }

    #[test]
    fn test_request_context_creation() {
        let ctx = RequestContext::new();
        assert!(ctx.trace_id().is_none());
    }

    #[test]
    fn test_request_context_with_trace_id() {
        let ctx = RequestContext::new().with_trace_id(TraceId::from_string("abc123"));
        assert_eq!(ctx.trace_id().map(TraceId::as_str), Some("abc123"));
    }

    #[test]
    fn test_empty_trace_id_is_absent() {
        let ctx = RequestContext::from(TraceId::from_string(""));
        assert!(ctx.trace_id().is_none());
    }

    #[test]
    fn test_serialization_is_transparent() {
        let id = TraceId::from_string("abc123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"abc123\"");
        let deserialized: TraceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
