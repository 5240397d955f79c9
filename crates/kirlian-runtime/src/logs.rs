//! Ring buffer of recent backend output.
//!
//! The shell keeps one [`OutputLog`] per session and feeds it to the
//! supervisor as its log sink. When a start fails, the tail of the buffer
//! becomes the diagnostics section of the error page.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use kirlian_core::{ServerLogSinkPort, StreamKind};

/// Maximum number of lines kept.
const MAX_LOG_LINES: usize = 2000;

/// Lines shown on the error page.
pub const DIAGNOSTIC_TAIL: usize = 20;

/// One captured output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    /// Unix timestamp in milliseconds.
    pub timestamp: u64,
    pub port: u16,
    pub stream: StreamKind,
    pub line: String,
}

impl OutputLine {
    fn now(port: u16, stream: StreamKind, line: String) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        Self {
            timestamp,
            port,
            stream,
            line,
        }
    }
}

/// Bounded, thread-safe store of recent output lines.
#[derive(Debug)]
pub struct OutputLog {
    lines: Mutex<VecDeque<OutputLine>>,
    capacity: usize,
}

impl Default for OutputLog {
    fn default() -> Self {
        Self::with_capacity(MAX_LOG_LINES)
    }
}

impl OutputLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity.min(MAX_LOG_LINES))),
            capacity,
        }
    }

    pub fn push(&self, entry: OutputLine) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() >= self.capacity {
            lines.pop_front();
        }
        lines.push_back(entry);
    }

    /// Last `n` lines as plain text, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = lines.len().saturating_sub(n);
        lines.iter().skip(skip).map(|e| e.line.clone()).collect()
    }

    /// Lines shown on the error page.
    pub fn diagnostics(&self) -> Vec<String> {
        self.tail(DIAGNOSTIC_TAIL)
    }

    pub fn entries(&self) -> Vec<OutputLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything, e.g. before a retry.
    pub fn clear(&self) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl ServerLogSinkPort for OutputLog {
    fn append(&self, port: u16, stream: StreamKind, line: String) {
        self.push(OutputLine::now(port, stream, line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_at_capacity() {
        let log = OutputLog::with_capacity(3);
        for i in 0..5 {
            log.append(8501, StreamKind::Stdout, format!("line {i}"));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.tail(10), vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn diagnostics_keeps_last_twenty() {
        let log = OutputLog::new();
        for i in 0..30 {
            log.append(8501, StreamKind::Stderr, format!("e{i}"));
        }
        let diag = log.diagnostics();
        assert_eq!(diag.len(), DIAGNOSTIC_TAIL);
        assert_eq!(diag.first().map(String::as_str), Some("e10"));
        assert_eq!(diag.last().map(String::as_str), Some("e29"));

        log.clear();
        assert!(log.is_empty());
    }
}
