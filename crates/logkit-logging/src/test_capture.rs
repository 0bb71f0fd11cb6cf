//! In-memory writer for deterministic logging assertions
//!
//! `CaptureWriter` plugs into [`LogHandlerBuilder::writer`](crate::LogHandlerBuilder::writer)
//! and keeps everything the handler writes.
//!
//! ```
//! use logkit_core_types::RequestContext;
//! use logkit_logging::test_capture::CaptureWriter;
//! use logkit_logging::{LogHandler, Record};
//!
//! let capture = CaptureWriter::new();
//! let handler = LogHandler::builder().writer(capture.clone()).build();
//! handler
//!     .handle(&RequestContext::new(), Record::new(tracing::Level::INFO, "ready"))
//!     .unwrap();
//! assert!(capture.contents().contains("msg=ready"));
//! ```

use std::io;
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::writer::MakeWriter;

/// Shared in-memory buffer; clones see the same bytes
#[derive(Clone, Debug, Default)]
pub struct CaptureWriter {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded
    pub fn contents(&self) -> String {
        self.buf
            .lock()
            .map(|buf| String::from_utf8_lossy(&buf).into_owned())
            .unwrap_or_default()
    }

    /// Written output split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Each line parsed as JSON; unparsable lines are skipped
    pub fn json_lines(&self) -> Vec<serde_json::Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    pub fn clear(&self) {
        self.buf.lock().map(|mut buf| buf.clear()).ok();
    }
}

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .buf
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
