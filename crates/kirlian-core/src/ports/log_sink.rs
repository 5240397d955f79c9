//! Server log sink port for structured log capture.
//!
//! This port abstracts the destination for backend output (stdout/stderr),
//! allowing a no-op sink for tools and a ring buffer for the shell's error
//! page.

use crate::domain::StreamKind;

/// Port for appending backend output lines to a sink.
///
/// Implementations should be thread-safe and non-blocking.
pub trait ServerLogSinkPort: Send + Sync {
    /// Append one line (without trailing newline) from the backend.
    fn append(&self, port: u16, stream: StreamKind, line: String);
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl ServerLogSinkPort for NoopLogSink {
    fn append(&self, _port: u16, _stream: StreamKind, _line: String) {}
}
