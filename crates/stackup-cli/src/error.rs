//! CLI-specific error types and mappings.
//!
//! Maps plan and orchestration failures to exit codes and user-facing
//! messages.

use stackup_core::OrchestrationError;
use thiserror::Error;

use crate::plan::PlanError;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Plan file missing, malformed or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A service executable could not be started.
    #[error("{0}")]
    Spawn(String),

    /// A service never became ready.
    #[error("{0}")]
    Readiness(String),

    /// A check or the test command failed.
    #[error("{0}")]
    TestFailure(String),

    /// Interrupted by a signal; everything was torn down.
    #[error("Interrupted")]
    Interrupted,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success, or skipped by preflight
    /// - 1: Test failure
    /// - 2: Invalid arguments (reported by clap before any handler runs)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    /// - 130: Interrupted
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::TestFailure(_) => 1,
            Self::Readiness(_) => 69, // EX_UNAVAILABLE
            Self::Spawn(_) => 71,     // EX_OSERR
            Self::Config(_) => 78,    // EX_CONFIG
            Self::Interrupted => 130,
        }
    }
}

impl From<OrchestrationError> for CliError {
    fn from(err: OrchestrationError) -> Self {
        match err {
            OrchestrationError::InvalidSpec(_) | OrchestrationError::Template { .. } => {
                Self::Config(err.to_string())
            }
            OrchestrationError::Spawn { .. } => Self::Spawn(err.to_string()),
            OrchestrationError::ReadinessTimeout { .. } => Self::Readiness(err.to_string()),
            OrchestrationError::TestPhase(_) => Self::TestFailure(err.to_string()),
            OrchestrationError::Cancelled => Self::Interrupted,
        }
    }
}

impl From<PlanError> for CliError {
    fn from(err: PlanError) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_orchestration_errors_map_to_distinct_codes() {
        let timeout = OrchestrationError::ReadinessTimeout {
            service: "backend".to_string(),
            url: "http://localhost:3000/health".to_string(),
            timeout: Duration::from_secs(30),
            attempts: 61,
        };
        let spawn = OrchestrationError::Spawn {
            service: "llama-server".to_string(),
            program: "llama-server".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let test = OrchestrationError::TestPhase(anyhow::anyhow!("status 500"));

        assert_eq!(CliError::from(timeout).exit_code(), 69);
        assert_eq!(CliError::from(spawn).exit_code(), 71);
        assert_eq!(CliError::from(test).exit_code(), 1);
        assert_eq!(CliError::from(OrchestrationError::Cancelled).exit_code(), 130);
    }

    #[test]
    fn test_message_keeps_service_name() {
        let err = CliError::from(OrchestrationError::ReadinessTimeout {
            service: "local-model".to_string(),
            url: "http://localhost:8080/health".to_string(),
            timeout: Duration::from_secs(30),
            attempts: 61,
        });
        assert!(err.to_string().contains("local-model"));
    }

    #[test]
    fn test_plan_errors_are_config_errors() {
        assert_eq!(CliError::from(PlanError::Empty).exit_code(), 78);
    }
}
