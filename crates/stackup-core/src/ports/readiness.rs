//! Readiness check port.
//!
//! A [`ReadinessCheck`] performs one read-only request and reports the status
//! code. Retrying, deadlines and the healthy set live in the prober that
//! drives it, so a check never decides readiness on its own.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Transient failure of a single readiness attempt.
///
/// Always treated as "not up yet" and retried until the stage deadline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl ProbeError {
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }
}

/// Port for a single read-only readiness request.
#[async_trait]
pub trait ReadinessCheck: Send + Sync {
    /// Issue one request and return the HTTP status code.
    async fn check(&self, url: &Url) -> Result<u16, ProbeError>;
}

/// Outcome of a readiness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// A qualifying status came back.
    Ready {
        status: u16,
        attempts: u32,
        elapsed: Duration,
    },
    /// The deadline passed without a qualifying status.
    TimedOut { attempts: u32, elapsed: Duration },
}

impl Readiness {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts, .. } | Self::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub const fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. } | Self::TimedOut { elapsed, .. } => *elapsed,
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready {
                status,
                attempts,
                elapsed,
            } => write!(
                f,
                "ready (status {status}) after {attempts} attempts in {elapsed:?}"
            ),
            Self::TimedOut { attempts, elapsed } => {
                write!(f, "timed out after {attempts} attempts in {elapsed:?}")
            }
        }
    }
}
