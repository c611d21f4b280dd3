//! Process management for managed services.
//!
//! # Structure
//!
//! - `ProcessSupervisor` - spawns services and drives their lifecycle
//! - `shutdown` - SIGTERM → grace → SIGKILL escalation for a child
//! - `BufferedLogSink` / `TracingLogSink` - where captured output goes
//! - stream readers - lossy line readers feeding a sink

mod logs;
pub mod shutdown;
mod stream;
mod supervisor;

pub use logs::{BufferedLogSink, DEFAULT_BUFFER_LINES, ServiceLogEntry, TracingLogSink};
pub use shutdown::{ShutdownReport, TeardownError, terminate};
pub(crate) use stream::spawn_stream_reader;
pub use supervisor::ProcessSupervisor;
