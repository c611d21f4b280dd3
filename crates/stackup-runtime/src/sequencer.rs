//! Ordered startup, test phase, and guaranteed reverse-order teardown.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::sync::Arc;

use futures_util::FutureExt;
use stackup_core::{
    OrchestrationError, Readiness, ReadyServices, RunState, ServiceAddress, ServiceEndpoint,
    ServiceHandle, ServiceSpec, SpawnFailure, SpecError, Supervisor, validate_specs,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

type PanicPayload = Box<dyn Any + Send + 'static>;

/// Drives a list of services through startup, a test phase, and teardown.
///
/// Services start strictly one after another: each must report ready before
/// the next is spawned, because later specs may reference the address of
/// earlier ones. Whatever happens after the first spawn (a spawn error, a
/// readiness timeout, a failing or panicking test phase, cancellation) every
/// handle that was created is stopped, most recently started first, before
/// the outcome is returned.
pub struct Sequencer {
    supervisor: Arc<dyn Supervisor>,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer").finish_non_exhaustive()
    }
}

impl Sequencer {
    pub fn new(supervisor: Arc<dyn Supervisor>) -> Self {
        Self { supervisor }
    }

    /// Start `specs` in order, run `test_phase` once all are ready, then tear
    /// everything down.
    ///
    /// A panic inside `test_phase` is re-raised after teardown.
    pub async fn run<F, Fut, T>(
        &self,
        specs: Vec<ServiceSpec>,
        test_phase: F,
    ) -> Result<T, OrchestrationError>
    where
        F: FnOnce(ReadyServices) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.run_with_cancel(specs, CancellationToken::new(), test_phase)
            .await
    }

    /// Like [`Sequencer::run`], but stops early when `cancel` fires.
    ///
    /// Cancellation interrupts startup or the test phase, never teardown. The
    /// run then returns [`OrchestrationError::Cancelled`].
    pub async fn run_with_cancel<F, Fut, T>(
        &self,
        specs: Vec<ServiceSpec>,
        cancel: CancellationToken,
        test_phase: F,
    ) -> Result<T, OrchestrationError>
    where
        F: FnOnce(ReadyServices) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let run_id = Uuid::new_v4();
        let span = info_span!("orchestration", %run_id, services = specs.len());
        self.orchestrate(specs, cancel, test_phase)
            .instrument(span)
            .await
    }

    async fn orchestrate<F, Fut, T>(
        &self,
        specs: Vec<ServiceSpec>,
        cancel: CancellationToken,
        test_phase: F,
    ) -> Result<T, OrchestrationError>
    where
        F: FnOnce(ReadyServices) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        if let Err(e) = validate_specs(&specs) {
            error!(error = %e, "Rejected service list, nothing started");
            return Err(e.into());
        }

        let mut state = RunState::NotStarted;
        let mut handles: Vec<ServiceHandle> = Vec::with_capacity(specs.len());
        advance(&mut state, RunState::Starting);

        let startup = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                warn!("Cancelled during startup");
                Err(OrchestrationError::Cancelled)
            }
            result = self.start_all(&specs, &mut handles) => result,
        };

        let outcome: Result<Result<T, OrchestrationError>, PanicPayload> = match startup {
            Ok(ready) => {
                advance(&mut state, RunState::Running);
                info!(services = ?ready.names(), "All services ready, entering test phase");
                let phase = AssertUnwindSafe(test_phase(ready)).catch_unwind();
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        warn!("Cancelled during test phase");
                        Ok(Err(OrchestrationError::Cancelled))
                    }
                    result = phase => result.map(|r| r.map_err(OrchestrationError::TestPhase)),
                }
            }
            Err(e) => {
                advance(&mut state, RunState::Failed);
                error!(service = ?e.service(), error = %e, "Startup failed, tearing down");
                Ok(Err(e))
            }
        };

        advance(&mut state, RunState::Stopping);
        self.teardown(&mut handles).await;
        advance(&mut state, RunState::Stopped);

        match outcome {
            Ok(Ok(value)) => {
                info!("Run completed");
                Ok(value)
            }
            Ok(Err(e)) => Err(e),
            Err(panic) => {
                error!("Test phase panicked, re-raising after teardown");
                resume_unwind(panic)
            }
        }
    }

    /// Start and await each spec in turn. Every created handle, including one
    /// whose spawn failed, is pushed to `handles` before anything can fail.
    async fn start_all(
        &self,
        specs: &[ServiceSpec],
        handles: &mut Vec<ServiceHandle>,
    ) -> Result<ReadyServices, OrchestrationError> {
        let total = specs.len();
        let mut addresses: HashMap<String, ServiceAddress> = HashMap::with_capacity(total);
        let mut endpoints = Vec::with_capacity(total);

        for (index, spec) in specs.iter().enumerate() {
            let resolved =
                spec.resolve(&addresses)
                    .map_err(|source| OrchestrationError::Template {
                        service: spec.name.clone(),
                        source,
                    })?;
            let url = resolved.parsed_readiness_url()?;
            let address =
                ServiceAddress::from_url(&url).ok_or_else(|| SpecError::InvalidReadinessUrl {
                    service: resolved.name.clone(),
                    url: resolved.readiness_url.clone(),
                    reason: "no host or port".to_string(),
                })?;

            let spec = Arc::new(resolved);
            info!(service = %spec.name, stage = index + 1, of = total, "Starting service");
            let spawned_at = Instant::now();

            let handle = match self.supervisor.start(Arc::clone(&spec)) {
                Ok(handle) => handle,
                Err(SpawnFailure { handle, source }) => {
                    handles.push(handle);
                    return Err(OrchestrationError::Spawn {
                        service: spec.name.clone(),
                        program: spec.program.clone(),
                        source,
                    });
                }
            };
            let slot = handles.len();
            handles.push(handle);
            let handle = &mut handles[slot];

            match self.supervisor.await_ready(handle).await {
                Readiness::Ready { .. } => {
                    endpoints.push(ServiceEndpoint {
                        name: spec.name.clone(),
                        base_url: address.base_url.clone(),
                        host: address.host.clone(),
                        port: address.port,
                        readiness_url: url.to_string(),
                        pid: handle.pid(),
                        ready_after: spawned_at.elapsed(),
                    });
                    addresses.insert(spec.name.clone(), address);
                }
                Readiness::TimedOut { attempts, .. } => {
                    return Err(OrchestrationError::ReadinessTimeout {
                        service: spec.name.clone(),
                        url: spec.readiness_url.clone(),
                        timeout: spec.startup_timeout,
                        attempts,
                    });
                }
            }
        }

        Ok(ReadyServices::new(endpoints))
    }

    /// Stop every handle, newest first. Never short-circuits.
    async fn teardown(&self, handles: &mut [ServiceHandle]) {
        if handles.is_empty() {
            return;
        }
        info!(count = handles.len(), "Tearing down services");
        for handle in handles.iter_mut().rev() {
            let grace = handle.spec().grace_period;
            let outcome = self.supervisor.stop(handle, grace).await;
            debug!(service = %handle.name(), ?outcome, signals = handle.signals_sent(), "Teardown step done");
        }
    }
}

fn advance(state: &mut RunState, next: RunState) {
    let from = *state;
    match state.advance(next) {
        Ok(()) => debug!(%from, to = %next, "Run state changed"),
        Err(e) => error!(error = %e, "Ignoring invalid run state transition"),
    }
}
