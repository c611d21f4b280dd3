//! Supervisor port.
//!
//! A supervisor owns the lifecycle of spawned services: it is the only thing
//! allowed to signal a process. The sequencer drives it; tests substitute a
//! fake that never spawns anything.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::handle::{ServiceHandle, StopOutcome};
use crate::ports::Readiness;
use crate::spec::ServiceSpec;

/// A spawn that failed. The handle is already `Failed` and must still be
/// passed to [`Supervisor::stop`] during teardown.
#[derive(Debug)]
pub struct SpawnFailure {
    pub handle: ServiceHandle,
    pub source: std::io::Error,
}

/// Port for starting, readiness-waiting and stopping one service at a time.
#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Spawn the service without waiting for readiness.
    ///
    /// On success the handle is `Starting`; on failure it is `Failed`.
    fn start(&self, spec: Arc<ServiceSpec>) -> Result<ServiceHandle, SpawnFailure>;

    /// Wait until the service reports healthy or its startup timeout passes.
    ///
    /// Moves the handle to `Ready` or `Failed`.
    async fn await_ready(&self, handle: &mut ServiceHandle) -> Readiness;

    /// Stop the service: graceful signal, up to `grace` wait, then force.
    ///
    /// Never fails. A no-op for processes that already exited and for
    /// handles that are already `Stopped`.
    async fn stop(&self, handle: &mut ServiceHandle, grace: Duration) -> StopOutcome;
}
