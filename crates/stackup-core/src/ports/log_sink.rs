//! Service log sink port for captured process output.
//!
//! Managed processes write to stdout/stderr. Runtime adapters read those
//! streams line by line and hand each line to a sink, which decides whether
//! the line is shown, buffered, or dropped.

use std::fmt;

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Port for appending service output lines to a sink.
///
/// Implementations must be thread-safe and must not block: they are called
/// from the stream reader tasks of every running service.
pub trait ServiceLogSink: Send + Sync {
    /// Append one line (without trailing newline) from `service`.
    fn append(&self, service: &str, stream: OutputStream, line: String);
}

/// A sink that discards every line.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogSink;

impl ServiceLogSink for NoopLogSink {
    fn append(&self, _service: &str, _stream: OutputStream, _line: String) {}
}
