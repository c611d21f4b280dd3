//! Error types for orchestration.
//!
//! [`OrchestrationError`] is what a run surfaces to its caller. It is only
//! returned after teardown of every started service has completed.
//! Connection-level probe failures and teardown signalling failures are not
//! part of it: the former are retried, the latter are logged and swallowed.

use std::time::Duration;

use thiserror::Error;

/// A spec list that cannot be run.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("service name must not be empty")]
    EmptyName,

    #[error("service name '{0}' is used more than once")]
    DuplicateName(String),

    #[error("service '{service}' has no program to run")]
    EmptyProgram { service: String },

    #[error("service '{service}' has a zero poll interval")]
    ZeroPollInterval { service: String },

    #[error("service '{service}' accepts no healthy status codes")]
    NoHealthyStatuses { service: String },

    #[error("service '{service}' has an invalid readiness URL '{url}': {reason}")]
    InvalidReadinessUrl {
        service: String,
        url: String,
        reason: String,
    },

    /// A placeholder refers to a service that is not started before this one.
    #[error("service '{service}' references '{target}', which is not started before it")]
    ForwardReference { service: String, target: String },

    #[error("service '{service}': {source}")]
    Template {
        service: String,
        #[source]
        source: TemplateError,
    },
}

/// A `${service.field}` placeholder that cannot be parsed or resolved.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unterminated placeholder in '{input}'")]
    Unterminated { input: String },

    #[error("placeholder '${{{expr}}}' must have the form ${{service.field}}")]
    Malformed { expr: String },

    #[error("placeholder refers to unknown service '{service}'")]
    UnknownService { service: String },

    #[error("service '{service}' has no field '{field}' (expected base_url, host or port)")]
    UnknownField { service: String, field: String },
}

/// Failure of an orchestration run.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// The spec list was rejected before anything was started.
    #[error("invalid service spec: {0}")]
    InvalidSpec(#[from] SpecError),

    /// A placeholder could not be resolved at start time.
    #[error("service '{service}': {source}")]
    Template {
        service: String,
        #[source]
        source: TemplateError,
    },

    /// The executable is missing or could not be started.
    #[error("failed to spawn service '{service}' ({program}): {source}")]
    Spawn {
        service: String,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The service never answered with a healthy status in time.
    #[error(
        "service '{service}' did not become ready at {url} within {timeout:?} ({attempts} attempts)"
    )]
    ReadinessTimeout {
        service: String,
        url: String,
        timeout: Duration,
        attempts: u32,
    },

    /// The test phase returned an error.
    #[error("test phase failed: {0:#}")]
    TestPhase(anyhow::Error),

    /// The caller cancelled the run.
    #[error("orchestration cancelled")]
    Cancelled,
}

impl OrchestrationError {
    /// Name of the service the failure is attributed to, if any.
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Template { service, .. }
            | Self::Spawn { service, .. }
            | Self::ReadinessTimeout { service, .. } => Some(service),
            Self::InvalidSpec(_) | Self::TestPhase(_) | Self::Cancelled => None,
        }
    }

    /// Whether the failure happened while bringing services up.
    pub const fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::Template { .. } | Self::Spawn { .. } | Self::ReadinessTimeout { .. }
        )
    }
}
