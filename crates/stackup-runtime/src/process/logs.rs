//! Log sinks for captured service output.
//!
//! Normal runs stay quiet: output goes to a [`BufferedLogSink`] so it can be
//! dumped when a service fails. With the debug flag set, a
//! [`TracingLogSink`] makes every line visible as it arrives.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use stackup_core::{OutputStream, ServiceLogSink};
use tracing::info;

/// Default number of lines kept per service.
pub const DEFAULT_BUFFER_LINES: usize = 500;

/// A single captured output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLogEntry {
    pub timestamp: DateTime<Utc>,
    pub stream: OutputStream,
    pub line: String,
}

/// Ring buffer of recent output lines per service.
#[derive(Debug)]
pub struct BufferedLogSink {
    capacity: usize,
    buffers: Mutex<HashMap<String, VecDeque<ServiceLogEntry>>>,
}

impl BufferedLogSink {
    /// Keep at most `capacity` lines per service (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            buffers: Mutex::new(HashMap::new()),
        }
    }

    /// All buffered lines for `service`, oldest first.
    pub fn lines(&self, service: &str) -> Vec<ServiceLogEntry> {
        let buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers
            .get(service)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The last `n` lines for `service`, oldest first.
    pub fn tail(&self, service: &str, n: usize) -> Vec<ServiceLogEntry> {
        let mut lines = self.lines(service);
        let skip = lines.len().saturating_sub(n);
        lines.drain(..skip);
        lines
    }

    /// Drop everything buffered for `service`.
    pub fn clear(&self, service: &str) {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        buffers.remove(service);
    }
}

impl Default for BufferedLogSink {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_LINES)
    }
}

impl ServiceLogSink for BufferedLogSink {
    fn append(&self, service: &str, stream: OutputStream, line: String) {
        let entry = ServiceLogEntry {
            timestamp: Utc::now(),
            stream,
            line,
        };
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        let buffer = buffers.entry(service.to_string()).or_default();
        if buffer.len() >= self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }
}

/// Emits every line as a tracing event tagged with the service name.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl ServiceLogSink for TracingLogSink {
    fn append(&self, service: &str, stream: OutputStream, line: String) {
        info!(target: "stackup::service", service, stream = stream.as_str(), "[{service}] {line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_drops_oldest_at_capacity() {
        let sink = BufferedLogSink::new(3);
        for i in 0..5 {
            sink.append("backend", OutputStream::Stdout, format!("line {i}"));
        }
        let lines: Vec<String> = sink.lines("backend").into_iter().map(|e| e.line).collect();
        assert_eq!(lines, vec!["line 2", "line 3", "line 4"]);
    }

    #[test]
    fn test_buffers_are_per_service() {
        let sink = BufferedLogSink::default();
        sink.append("llama", OutputStream::Stderr, "loading model".to_string());
        sink.append("backend", OutputStream::Stdout, "listening".to_string());

        assert_eq!(sink.lines("llama").len(), 1);
        assert_eq!(sink.lines("backend")[0].line, "listening");
        assert!(sink.lines("local-model").is_empty());

        sink.clear("llama");
        assert!(sink.lines("llama").is_empty());
    }

    #[test]
    fn test_tail_returns_last_lines_in_order() {
        let sink = BufferedLogSink::new(10);
        for i in 0..6 {
            sink.append("svc", OutputStream::Stdout, i.to_string());
        }
        let tail: Vec<String> = sink.tail("svc", 2).into_iter().map(|e| e.line).collect();
        assert_eq!(tail, vec!["4", "5"]);
        assert_eq!(sink.tail("svc", 100).len(), 6);
    }
}
