//! Process-backed [`Supervisor`] implementation.
//!
//! Spawns each service with its spec's command line, working directory and
//! environment overlay, streams its output to a [`ServiceLogSink`], waits for
//! readiness through a [`ReadinessProber`], and stops it with escalating
//! signals.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use stackup_core::{
    OutputStream, Readiness, ServiceHandle, ServiceLogSink, ServiceSpec, ServiceState,
    SpawnFailure, StopOutcome, Supervisor,
};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::shutdown::terminate;
use super::spawn_stream_reader;
use crate::probe::ReadinessProber;

/// Supervisor that runs services as child processes.
pub struct ProcessSupervisor {
    prober: ReadinessProber,
    sink: Arc<dyn ServiceLogSink>,
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("prober", &self.prober)
            .finish_non_exhaustive()
    }
}

impl ProcessSupervisor {
    pub fn new(prober: ReadinessProber, sink: Arc<dyn ServiceLogSink>) -> Self {
        Self { prober, sink }
    }

    fn build_command(spec: &ServiceSpec) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Last line of defence if a handle is dropped without teardown.
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }

        // Own process group so stop signals reach grandchildren too.
        #[cfg(unix)]
        cmd.process_group(0);

        cmd
    }

    fn mark(handle: &mut ServiceHandle, next: ServiceState) {
        if let Err(e) = handle.transition(next) {
            error!(service = %handle.name(), error = %e, "Ignoring invalid state transition");
        }
    }
}

#[async_trait]
impl Supervisor for ProcessSupervisor {
    fn start(&self, spec: Arc<ServiceSpec>) -> Result<ServiceHandle, SpawnFailure> {
        let mut handle = ServiceHandle::new(Arc::clone(&spec));
        debug!(
            service = %spec.name,
            program = %spec.program,
            args = ?spec.args,
            cwd = ?spec.working_dir,
            "Spawning service"
        );

        let mut child = match Self::build_command(&spec).spawn() {
            Ok(child) => child,
            Err(source) => {
                warn!(service = %spec.name, program = %spec.program, error = %source, "Failed to spawn service");
                Self::mark(&mut handle, ServiceState::Failed);
                return Err(SpawnFailure { handle, source });
            }
        };

        let name: Arc<str> = Arc::from(spec.name.as_str());
        if let Some(stdout) = child.stdout.take() {
            spawn_stream_reader(
                stdout,
                Arc::clone(&name),
                OutputStream::Stdout,
                Arc::clone(&self.sink),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_stream_reader(stderr, name, OutputStream::Stderr, Arc::clone(&self.sink));
        }

        handle.attach(child);
        info!(service = %spec.name, pid = ?handle.pid(), "Service started");
        Ok(handle)
    }

    async fn await_ready(&self, handle: &mut ServiceHandle) -> Readiness {
        let spec = handle.spec_arc();
        let url = match spec.parsed_readiness_url() {
            Ok(url) => url,
            Err(e) => {
                error!(service = %spec.name, error = %e, "Cannot probe service");
                Self::mark(handle, ServiceState::Failed);
                return Readiness::TimedOut {
                    attempts: 0,
                    elapsed: Duration::ZERO,
                };
            }
        };

        info!(service = %spec.name, %url, timeout = ?spec.startup_timeout, "Waiting for service to be ready");
        let outcome = self
            .prober
            .probe(
                &url,
                spec.startup_timeout,
                spec.poll_interval,
                &spec.healthy_statuses,
            )
            .await;

        let next = if outcome.is_ready() {
            ServiceState::Ready
        } else {
            ServiceState::Failed
        };
        Self::mark(handle, next);
        outcome
    }

    async fn stop(&self, handle: &mut ServiceHandle, grace: Duration) -> StopOutcome {
        if handle.state() == ServiceState::Stopped {
            debug!(service = %handle.name(), "Service already stopped");
            return StopOutcome::AlreadyStopped;
        }

        Self::mark(handle, ServiceState::Stopping);
        let pid = handle.pid();

        let outcome = match handle.take_process() {
            None => StopOutcome::NoProcess,
            Some(child) => match terminate(child, grace).await {
                Ok(report) => {
                    handle.record_signals(report.signals_sent);
                    report.outcome
                }
                Err(e) => {
                    // The child was consumed; nothing further can be sent.
                    warn!(service = %handle.name(), ?pid, error = %e, "Teardown error");
                    StopOutcome::Forced
                }
            },
        };

        Self::mark(handle, ServiceState::Stopped);
        info!(service = %handle.name(), ?pid, ?outcome, "Service stopped");
        outcome
    }
}
