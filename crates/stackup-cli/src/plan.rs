//! Plan files.
//!
//! A plan is a TOML file listing the services to start, in order, plus the
//! smoke checks to run once they are all ready and an optional preflight gate:
//!
//! ```toml
//! [preflight]
//! enabled_env = "RUN_LLAMA_TESTS"
//! executables = ["llama-server"]
//!
//! [[service]]
//! name = "llama-server"
//! command = "llama-server"
//! args = ["--port", "8081"]
//! readiness_url = "http://localhost:8081/completion"
//! accept_method_not_allowed = true
//!
//! [[service]]
//! name = "backend"
//! command = "node"
//! args = ["src/server.ts"]
//! env = { LLAMACPP_URL = "${llama-server.base_url}/completion" }
//! readiness_url = "http://localhost:3000/health"
//!
//! [[check]]
//! service = "backend"
//! path = "/health"
//! expect_status = 200
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use stackup_core::{HealthyStatuses, ServiceSpec, SpecError, validate_specs};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plan {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("plan has no services")]
    Empty,

    #[error("check #{index} targets unknown service '{service}'")]
    UnknownCheckService { index: usize, service: String },

    #[error("check #{index} has invalid {field}: {reason}")]
    InvalidCheck {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Gate that decides whether a run should happen at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Preflight {
    /// Variable that must be set to `1`.
    pub enabled_env: Option<String>,
    /// Executables that must resolve on `PATH`.
    #[serde(default)]
    pub executables: Vec<String>,
    /// Files that must exist, relative to the plan file.
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceEntry {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Relative paths resolve against the plan file's directory.
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    pub readiness_url: String,
    pub startup_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub grace_period_ms: Option<u64>,
    /// Replaces the default "any 2xx" set when given.
    pub healthy_statuses: Option<Vec<u16>>,
    #[serde(default)]
    pub accept_method_not_allowed: bool,
}

impl ServiceEntry {
    fn to_spec(&self, base_dir: &Path) -> ServiceSpec {
        let mut spec = ServiceSpec::new(&self.name, &self.command, &self.readiness_url)
            .with_args(self.args.iter().cloned());
        spec.env.clone_from(&self.env);

        if let Some(cwd) = &self.cwd {
            spec = spec.with_working_dir(resolve_path(base_dir, cwd));
        }
        if let Some(ms) = self.startup_timeout_ms {
            spec = spec.with_startup_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.poll_interval_ms {
            spec = spec.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(ms) = self.grace_period_ms {
            spec = spec.with_grace_period(Duration::from_millis(ms));
        }

        let mut healthy = self
            .healthy_statuses
            .as_ref()
            .map_or_else(HealthyStatuses::success, |codes| {
                HealthyStatuses::exactly(codes.iter().copied())
            });
        if self.accept_method_not_allowed {
            healthy = healthy.with_method_not_allowed();
        }
        spec.with_healthy_statuses(healthy)
    }
}

/// One HTTP smoke check run after every service is ready.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckEntry {
    pub service: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    /// Sent as a JSON request body.
    pub body: Option<serde_json::Value>,
    #[serde(default = "default_expect_status")]
    pub expect_status: u16,
    /// Top-level response fields that must equal the given values.
    #[serde(default)]
    pub expect_json: BTreeMap<String, serde_json::Value>,
}

fn default_method() -> String {
    "GET".to_string()
}

const fn default_expect_status() -> u16 {
    200
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    pub preflight: Option<Preflight>,
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceEntry>,
    #[serde(default, rename = "check")]
    pub checks: Vec<CheckEntry>,
    /// Directory of the plan file, for resolving relative paths.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Plan {
    /// Read, parse and validate a plan file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PlanError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PlanError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::parse(&content, base_dir).map_err(|e| match e {
            PlanError::Parse { source, .. } => PlanError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate plan text. Relative paths resolve against `base_dir`.
    pub fn parse(content: &str, base_dir: PathBuf) -> Result<Self, PlanError> {
        let mut plan: Self = toml::from_str(content).map_err(|source| PlanError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        plan.base_dir = base_dir;
        plan.validate()?;
        Ok(plan)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.services.is_empty() {
            return Err(PlanError::Empty);
        }
        validate_specs(&self.to_specs())?;

        let names: HashSet<&str> = self.services.iter().map(|s| s.name.as_str()).collect();
        for (index, check) in self.checks.iter().enumerate() {
            let index = index + 1;
            if !names.contains(check.service.as_str()) {
                return Err(PlanError::UnknownCheckService {
                    index,
                    service: check.service.clone(),
                });
            }
            if reqwest::Method::from_bytes(check.method.to_ascii_uppercase().as_bytes()).is_err() {
                return Err(PlanError::InvalidCheck {
                    index,
                    field: "method",
                    reason: format!("'{}' is not an HTTP method", check.method),
                });
            }
            if !(100..=599).contains(&check.expect_status) {
                return Err(PlanError::InvalidCheck {
                    index,
                    field: "expect_status",
                    reason: format!("{} is not an HTTP status", check.expect_status),
                });
            }
        }
        Ok(())
    }

    /// Service specs in start order.
    pub fn to_specs(&self) -> Vec<ServiceSpec> {
        self.services
            .iter()
            .map(|entry| entry.to_spec(&self.base_dir))
            .collect()
    }

    pub fn preflight(&self) -> Preflight {
        self.preflight.clone().unwrap_or_default()
    }
}

pub(crate) fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
