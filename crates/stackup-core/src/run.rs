//! Orchestration-level state and the read-only view handed to test phases.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// State of a whole orchestration run.
///
/// `NotStarted → Starting → Running → Stopping → Stopped`, or
/// `Starting → Failed → Stopping → Stopped` when any stage fails, bypassing
/// `Running` entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Starting,
    Running,
    Failed,
    Stopping,
    Stopped,
}

impl RunState {
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Starting)
                | (Self::Starting, Self::Running | Self::Failed)
                | (Self::Running | Self::Failed, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }

    /// Advance to `next`, leaving the state untouched on an illegal move.
    pub fn advance(&mut self, next: Self) -> Result<(), RunTransitionError> {
        if !self.can_transition_to(next) {
            return Err(RunTransitionError {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Illegal move of the run-level state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid run state transition {from} -> {to}")]
pub struct RunTransitionError {
    pub from: RunState,
    pub to: RunState,
}

/// Address and timing of one ready service, as seen by a test phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub name: String,
    /// `scheme://host:port` derived from the readiness URL.
    pub base_url: String,
    pub host: String,
    pub port: u16,
    /// Resolved readiness URL.
    pub readiness_url: String,
    pub pid: Option<u32>,
    /// Time from spawn to the first healthy response.
    pub ready_after: Duration,
}

impl ServiceEndpoint {
    /// Join `path` onto this service's base URL.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            self.base_url.clone()
        } else if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Read-only view of every ready service, in start order.
///
/// Test phases receive this instead of the handles, so they can reach every
/// service over HTTP but cannot signal any process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyServices {
    services: Vec<ServiceEndpoint>,
}

impl ReadyServices {
    pub const fn new(services: Vec<ServiceEndpoint>) -> Self {
        Self { services }
    }

    pub fn get(&self, name: &str) -> Option<&ServiceEndpoint> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Full URL for `path` on service `name`.
    pub fn url(&self, name: &str, path: &str) -> Option<String> {
        self.get(name).map(|s| s.url(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceEndpoint> {
        self.services.iter()
    }

    /// Service names in start order.
    pub fn names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl<'a> IntoIterator for &'a ReadyServices {
    type Item = &'a ServiceEndpoint;
    type IntoIter = std::slice::Iter<'a, ServiceEndpoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(name: &str, port: u16) -> ServiceEndpoint {
        ServiceEndpoint {
            name: name.to_string(),
            base_url: format!("http://127.0.0.1:{port}"),
            host: "127.0.0.1".to_string(),
            port,
            readiness_url: format!("http://127.0.0.1:{port}/health"),
            pid: Some(4242),
            ready_after: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_run_state_success_path() {
        let mut state = RunState::NotStarted;
        state.advance(RunState::Starting).unwrap();
        state.advance(RunState::Running).unwrap();
        state.advance(RunState::Stopping).unwrap();
        state.advance(RunState::Stopped).unwrap();
        assert_eq!(state, RunState::Stopped);
    }

    #[test]
    fn test_run_state_failure_bypasses_running() {
        let mut state = RunState::NotStarted;
        state.advance(RunState::Starting).unwrap();
        state.advance(RunState::Failed).unwrap();
        assert!(state.advance(RunState::Running).is_err());
        state.advance(RunState::Stopping).unwrap();
        state.advance(RunState::Stopped).unwrap();
    }

    #[test]
    fn test_run_state_rejects_skips() {
        let mut state = RunState::NotStarted;
        let err = state.advance(RunState::Running).unwrap_err();
        assert_eq!(err.from, RunState::NotStarted);
        assert_eq!(state, RunState::NotStarted);
    }

    #[test]
    fn test_endpoint_url_joining() {
        let ep = endpoint("backend", 3000);
        assert_eq!(ep.url("/suggest"), "http://127.0.0.1:3000/suggest");
        assert_eq!(ep.url("health"), "http://127.0.0.1:3000/health");
        assert_eq!(ep.url(""), "http://127.0.0.1:3000");
    }

    #[test]
    fn test_ready_services_lookup_keeps_order() {
        let ready = ReadyServices::new(vec![endpoint("llama", 8081), endpoint("backend", 3000)]);
        assert_eq!(ready.names(), vec!["llama", "backend"]);
        assert_eq!(
            ready.url("backend", "/health").as_deref(),
            Some("http://127.0.0.1:3000/health")
        );
        assert!(ready.get("missing").is_none());
        assert_eq!(ready.len(), 2);
    }
}
