//! OS-level adapters for stackup.
//!
//! Implements the ports from `stackup-core` with real processes and HTTP:
//! [`ProcessSupervisor`] spawns and stops services, [`ReadinessProber`] polls
//! their readiness URLs, and [`Sequencer`] drives a whole run.

#![deny(unsafe_code)]

mod config;
pub mod probe;
pub mod process;
mod sequencer;

pub use config::{DEBUG_ENV, LEGACY_DEBUG_ENV, OrchestratorConfig};
pub use probe::{DEFAULT_REQUEST_TIMEOUT, HttpReadinessCheck, ReadinessProber};
pub use process::{
    BufferedLogSink, DEFAULT_BUFFER_LINES, ProcessSupervisor, ServiceLogEntry, TracingLogSink,
};
pub use sequencer::Sequencer;
