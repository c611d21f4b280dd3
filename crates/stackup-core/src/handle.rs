//! Lifecycle record for one started service.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Child;

use crate::spec::ServiceSpec;

/// Lifecycle state of a [`ServiceHandle`].
///
/// ```text
/// Starting ──► Ready ──► Stopping ──► Stopped
///     │                     ▲
///     └────► Failed ────────┘
/// ```
///
/// `Starting → Stopping` is also allowed so a run cancelled mid-probe can
/// still tear the handle down. Transitions never go backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Starting,
    Ready,
    Failed,
    Stopping,
    Stopped,
}

impl ServiceState {
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Ready | Self::Failed | Self::Stopping)
                | (Self::Ready | Self::Failed, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Attempted to move a handle backwards or skip a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid service state transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ServiceState,
    pub to: ServiceState,
}

/// What a stop request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// Exited within the grace period after the graceful signal.
    Graceful,
    /// Needed the forceful signal.
    Forced,
    /// The process had already exited; nothing was signalled.
    AlreadyExited,
    /// The handle never had a process (spawn failed).
    NoProcess,
    /// The handle was already stopped; nothing was signalled.
    AlreadyStopped,
}

impl StopOutcome {
    /// Whether any signal was sent to a process.
    pub const fn signalled(self) -> bool {
        matches!(self, Self::Graceful | Self::Forced)
    }
}

/// Mutable lifecycle record for one started service instance.
///
/// Created the instant a supervisor starts a spec, mutated only by that
/// supervisor, and dropped after teardown. A handle whose spawn failed has no
/// process but is still torn down like any other.
#[derive(Debug)]
pub struct ServiceHandle {
    spec: Arc<ServiceSpec>,
    process: Option<Child>,
    pid: Option<u32>,
    state: ServiceState,
    started_at: DateTime<Utc>,
    ready_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    signals_sent: u32,
}

impl ServiceHandle {
    /// Create a handle in `Starting` with no process attached yet.
    pub fn new(spec: Arc<ServiceSpec>) -> Self {
        Self {
            spec,
            process: None,
            pid: None,
            state: ServiceState::Starting,
            started_at: Utc::now(),
            ready_at: None,
            stopped_at: None,
            signals_sent: 0,
        }
    }

    pub fn spec(&self) -> &ServiceSpec {
        &self.spec
    }

    pub fn spec_arc(&self) -> Arc<ServiceSpec> {
        Arc::clone(&self.spec)
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub const fn state(&self) -> ServiceState {
        self.state
    }

    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub const fn ready_at(&self) -> Option<DateTime<Utc>> {
        self.ready_at
    }

    pub const fn stopped_at(&self) -> Option<DateTime<Utc>> {
        self.stopped_at
    }

    /// Number of stop signals delivered to the process so far.
    pub const fn signals_sent(&self) -> u32 {
        self.signals_sent
    }

    pub const fn has_process(&self) -> bool {
        self.process.is_some()
    }

    /// Attach the spawned process.
    pub fn attach(&mut self, child: Child) {
        self.pid = child.id();
        self.process = Some(child);
    }

    /// Take the process out for shutdown. Later calls return `None`.
    pub fn take_process(&mut self) -> Option<Child> {
        self.process.take()
    }

    pub fn record_signals(&mut self, count: u32) {
        self.signals_sent += count;
    }

    /// Move to `next`, rejecting backwards or skipping transitions.
    pub fn transition(&mut self, next: ServiceState) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        match next {
            ServiceState::Ready => self.ready_at = Some(Utc::now()),
            ServiceState::Stopped => self.stopped_at = Some(Utc::now()),
            _ => {}
        }
        self.state = next;
        Ok(())
    }
}
