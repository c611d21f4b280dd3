//! Core domain types and port definitions for stackup.
//!
//! `stackup` brings up a chain of independently-owned network services in
//! dependency order, waits for each one to report healthy, hands the composed
//! system to a test phase, and tears everything down in reverse order.
//!
//! This crate holds the pieces that have no OS or network dependency:
//!
//! - [`ServiceSpec`] and [`HealthyStatuses`] - what to start and how to judge it
//! - [`ServiceHandle`] and [`ServiceState`] - the lifecycle record of one start
//! - [`RunState`] - the orchestration-level state machine
//! - [`template`] - `${service.field}` references between services
//! - [`ports`] - the traits runtime adapters implement

#![deny(unused_crate_dependencies)]

pub mod error;
pub mod handle;
pub mod ports;
pub mod run;
pub mod spec;
pub mod template;

pub use error::{OrchestrationError, SpecError, TemplateError};
pub use handle::{InvalidTransition, ServiceHandle, ServiceState, StopOutcome};
pub use ports::{
    NoopLogSink, OutputStream, ProbeError, Readiness, ReadinessCheck, ServiceLogSink,
    SpawnFailure, Supervisor,
};
pub use run::{ReadyServices, RunState, RunTransitionError, ServiceEndpoint};
pub use spec::{
    DEFAULT_GRACE_PERIOD, DEFAULT_POLL_INTERVAL, DEFAULT_STARTUP_TIMEOUT, HealthyStatuses,
    ServiceSpec, validate_specs,
};
pub use template::ServiceAddress;

#[cfg(test)]
use serde_json as _;
