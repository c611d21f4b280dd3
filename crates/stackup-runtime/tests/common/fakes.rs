//! In-memory supervisor and scripted readiness surface.
//!
//! `FakeSupervisor` spawns nothing: it records every lifecycle call as an
//! event string (`start:a`, `ready:a`, `stop:a`, ...) and drives readiness
//! through the real `ReadinessProber`, backed by a `ScriptedCheck` whose
//! answers depend on time since the test started. Run under
//! `#[tokio::test(start_paused = true)]` so timing is exact.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use stackup_core::{
    ProbeError, Readiness, ReadinessCheck, ServiceHandle, ServiceSpec, ServiceState, SpawnFailure,
    StopOutcome, Supervisor,
};
use stackup_runtime::{ReadinessProber, Sequencer};
use tokio::time::Instant;
use url::Url;

/// How a readiness URL (keyed by port) answers over time.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Connection refused forever.
    Never,
    /// Refused until `after` has passed since the test started, then `status`.
    HealthyAfter(Duration, u16),
}

pub struct ScriptedCheck {
    origin: Instant,
    scripts: HashMap<u16, Script>,
}

impl ScriptedCheck {
    pub fn new(scripts: impl IntoIterator<Item = (u16, Script)>) -> Self {
        Self {
            origin: Instant::now(),
            scripts: scripts.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ReadinessCheck for ScriptedCheck {
    async fn check(&self, url: &Url) -> Result<u16, ProbeError> {
        let port = url.port_or_known_default().unwrap_or_default();
        match self.scripts.get(&port) {
            Some(Script::HealthyAfter(after, status)) if self.origin.elapsed() >= *after => {
                Ok(*status)
            }
            _ => Err(ProbeError::connect("connection refused")),
        }
    }
}

pub struct FakeSupervisor {
    prober: ReadinessProber,
    failing_spawns: HashSet<String>,
    events: Mutex<Vec<String>>,
    started: Mutex<Vec<Arc<ServiceSpec>>>,
}

impl FakeSupervisor {
    pub fn new(scripts: impl IntoIterator<Item = (u16, Script)>) -> Self {
        Self {
            prober: ReadinessProber::new(Arc::new(ScriptedCheck::new(scripts))),
            failing_spawns: HashSet::new(),
            events: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Make `start` fail for `name` as if its executable were missing.
    pub fn failing_spawn(mut self, name: &str) -> Self {
        self.failing_spawns.insert(name.to_string());
        self
    }

    pub fn note(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Specs as the supervisor received them, placeholders resolved.
    pub fn started_specs(&self) -> Vec<Arc<ServiceSpec>> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor {
    fn start(&self, spec: Arc<ServiceSpec>) -> Result<ServiceHandle, SpawnFailure> {
        let mut handle = ServiceHandle::new(Arc::clone(&spec));
        if self.failing_spawns.contains(&spec.name) {
            self.note(format!("spawn-failed:{}", spec.name));
            handle.transition(ServiceState::Failed).unwrap();
            return Err(SpawnFailure {
                handle,
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            });
        }
        self.note(format!("start:{}", spec.name));
        self.started.lock().unwrap().push(spec);
        Ok(handle)
    }

    async fn await_ready(&self, handle: &mut ServiceHandle) -> Readiness {
        let spec = handle.spec_arc();
        let url = spec.parsed_readiness_url().unwrap();
        let outcome = self
            .prober
            .probe(
                &url,
                spec.startup_timeout,
                spec.poll_interval,
                &spec.healthy_statuses,
            )
            .await;
        if outcome.is_ready() {
            handle.transition(ServiceState::Ready).unwrap();
            self.note(format!("ready:{}", spec.name));
        } else {
            handle.transition(ServiceState::Failed).unwrap();
            self.note(format!("timeout:{}", spec.name));
        }
        outcome
    }

    async fn stop(&self, handle: &mut ServiceHandle, _grace: Duration) -> StopOutcome {
        if handle.state() == ServiceState::Stopped {
            return StopOutcome::AlreadyStopped;
        }
        handle.transition(ServiceState::Stopping).unwrap();
        self.note(format!("stop:{}", handle.name()));
        handle.transition(ServiceState::Stopped).unwrap();
        StopOutcome::NoProcess
    }
}

/// Spec whose readiness URL is keyed by `port` in the scripted check.
pub fn spec(name: &str, port: u16) -> ServiceSpec {
    ServiceSpec::new(name, "fake-service", format!("http://127.0.0.1:{port}/health"))
}

pub fn sequencer(sup: &Arc<FakeSupervisor>) -> Sequencer {
    let supervisor: Arc<dyn Supervisor> = sup.clone();
    Sequencer::new(supervisor)
}
