//! Port definitions (trait abstractions) for OS and network adapters.
//!
//! Ports define the interfaces the orchestration core expects from
//! infrastructure. They contain no implementation details.
//!
//! # Design Rules
//!
//! - No `reqwest` or `nix` types in any signature
//! - Status codes travel as plain `u16`
//! - A supervisor owns process signalling; nothing else does

pub mod log_sink;
pub mod readiness;
pub mod supervisor;

pub use log_sink::{NoopLogSink, OutputStream, ServiceLogSink};
pub use readiness::{ProbeError, Readiness, ReadinessCheck};
pub use supervisor::{SpawnFailure, Supervisor};
