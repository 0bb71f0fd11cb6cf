//! Core types shared across logkit facilities
//!
//! This crate provides foundational types used by the logging handler and
//! the crash handler:
//!
//! - **Correlation types**: TraceId, RequestContext
//! - **Schema constants**: Canonical field keys for structured records
//! - **Paths**: Executable directory and name resolution
//! - **Result envelope**: Generic success/failure wrapper for callers

pub mod correlation;
pub mod paths;
pub mod result;
pub mod schema;

pub use correlation::{RequestContext, TraceId};
pub use paths::{exec_dir, exec_name};
pub use result::ResultEnvelope;
