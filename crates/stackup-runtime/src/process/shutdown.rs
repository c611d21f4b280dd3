//! Graceful shutdown for `tokio::process::Child` with SIGTERM → SIGKILL escalation.
//!
//! Services are spawned as leaders of their own process group, so signals
//! go to the whole group: launchers such as `node --loader tsx` take their
//! grandchildren down with them.

use std::io;
use std::time::Duration;

use stackup_core::StopOutcome;
use thiserror::Error;
use tokio::process::Child;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use tokio::time::timeout;
#[cfg(unix)]
use tracing::debug;

/// Failure while tearing a process down. Logged by the supervisor, never
/// raised to the caller of a run.
#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("failed to send {signal} to process group {pid}: {reason}")]
    Signal {
        pid: u32,
        signal: &'static str,
        reason: String,
    },

    #[error("failed to wait for process exit: {0}")]
    Wait(#[from] io::Error),
}

/// What [`terminate`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    pub outcome: StopOutcome,
    /// Signals actually delivered (0, 1 or 2).
    pub signals_sent: u32,
}

impl ShutdownReport {
    const fn new(outcome: StopOutcome, signals_sent: u32) -> Self {
        Self {
            outcome,
            signals_sent,
        }
    }
}

/// Stop a child with escalation and reap it.
///
/// # Strategy
/// 1. Already exited → reap, send nothing
/// 2. SIGTERM to the process group, wait up to `grace`
/// 3. Leader exited → SIGKILL whatever is left in the group; `Forced` if
///    anything was
/// 4. Still running (or SIGTERM could not be sent) → SIGKILL, then reap
///
/// # Platform behavior
/// - Unix: signals via nix, SIGKILL also via `Child::start_kill`
/// - Other: immediately kills (no graceful shutdown available)
///
/// # Errors
/// Only on failure to wait for the child. Signal failures are recorded and
/// escalation continues.
pub async fn terminate(mut child: Child, grace: Duration) -> Result<ShutdownReport, TeardownError> {
    if child.try_wait()?.is_some() {
        return Ok(ShutdownReport::new(StopOutcome::AlreadyExited, 0));
    }
    let Some(pid) = child.id() else {
        // No PID means tokio already observed the exit.
        return Ok(ShutdownReport::new(StopOutcome::AlreadyExited, 0));
    };

    #[cfg(unix)]
    {
        terminate_unix(&mut child, pid, grace).await
    }

    #[cfg(not(unix))]
    {
        let _ = (pid, grace);
        child.kill().await?;
        Ok(ShutdownReport::new(StopOutcome::Forced, 1))
    }
}

#[cfg(unix)]
async fn terminate_unix(
    child: &mut Child,
    pid: u32,
    grace: Duration,
) -> Result<ShutdownReport, TeardownError> {
    let mut sent = 0;

    // Phase 1: SIGTERM with grace period
    match signal_group(pid, Signal::SIGTERM) {
        Ok(()) => {
            sent += 1;
            if let Ok(waited) = timeout(grace, child.wait()).await {
                let status = waited?;
                debug!(pid, ?status, "process exited after SIGTERM");
                // The leader is gone but group members that ignored SIGTERM
                // may not be. ESRCH means the group is already empty.
                return match signal_group(pid, Signal::SIGKILL) {
                    Ok(()) => {
                        debug!(pid, "killed processes left in group");
                        Ok(ShutdownReport::new(StopOutcome::Forced, sent + 1))
                    }
                    Err(Errno::ESRCH) => Ok(ShutdownReport::new(StopOutcome::Graceful, sent)),
                    Err(e) => {
                        debug!(pid, error = %e, "SIGKILL sweep of process group failed");
                        Ok(ShutdownReport::new(StopOutcome::Graceful, sent))
                    }
                };
            }
        }
        Err(Errno::ESRCH) => {
            // Exited between try_wait and the signal.
            child.wait().await?;
            return Ok(ShutdownReport::new(StopOutcome::AlreadyExited, sent));
        }
        Err(e) => {
            let err = TeardownError::Signal {
                pid,
                signal: "SIGTERM",
                reason: e.to_string(),
            };
            debug!(error = %err, "graceful signal failed, escalating");
        }
    }

    // Phase 2: SIGKILL, regardless of whether SIGTERM could be delivered
    match signal_group(pid, Signal::SIGKILL) {
        Ok(()) => sent += 1,
        Err(Errno::ESRCH) => {}
        Err(e) => {
            debug!(pid, error = %e, "SIGKILL to process group failed, killing child directly");
            if child.start_kill().is_ok() {
                sent += 1;
            }
        }
    }

    // Phase 3: wait for reaping (fast after SIGKILL)
    let status = child.wait().await?;
    debug!(pid, ?status, "process reaped after SIGKILL");
    Ok(ShutdownReport::new(StopOutcome::Forced, sent))
}

#[cfg(unix)]
fn signal_group(pid: u32, sig: Signal) -> Result<(), Errno> {
    let raw = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
    signal::killpg(Pid::from_raw(raw), sig)
}
