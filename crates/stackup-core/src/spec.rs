//! Service specifications.
//!
//! A [`ServiceSpec`] is the immutable description of how to start one managed
//! service and how to tell that it is healthy. Specs are built with
//! [`ServiceSpec::new`] plus `with_*` setters and are never mutated once
//! handed to the sequencer.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{SpecError, TemplateError};
use crate::template;

/// Default bound on how long a service may take to report healthy.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default sleep between readiness attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default wait between the graceful and the forced stop signal.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(1);

const METHOD_NOT_ALLOWED: u16 = 405;

/// Set of HTTP status codes that count as "healthy" for a readiness probe.
///
/// The default accepts any 2xx status. Extra codes can be added on top, which
/// is how a service without a dedicated liveness route gets its
/// `405 Method Not Allowed` accepted without changing the contract for every
/// other service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthyStatuses {
    any_success: bool,
    codes: BTreeSet<u16>,
}

impl HealthyStatuses {
    /// Any 2xx status.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            any_success: true,
            codes: BTreeSet::new(),
        }
    }

    /// Exactly the given codes, with no implicit 2xx range.
    #[must_use]
    pub fn exactly(codes: impl IntoIterator<Item = u16>) -> Self {
        Self {
            any_success: false,
            codes: codes.into_iter().collect(),
        }
    }

    /// Accept one more status code.
    #[must_use]
    pub fn with(mut self, code: u16) -> Self {
        self.codes.insert(code);
        self
    }

    /// Accept `405 Method Not Allowed` in addition to the current set.
    #[must_use]
    pub fn with_method_not_allowed(self) -> Self {
        self.with(METHOD_NOT_ALLOWED)
    }

    pub fn contains(&self, status: u16) -> bool {
        (self.any_success && (200..300).contains(&status)) || self.codes.contains(&status)
    }

    pub fn is_empty(&self) -> bool {
        !self.any_success && self.codes.is_empty()
    }
}

impl Default for HealthyStatuses {
    fn default() -> Self {
        Self::success()
    }
}

impl std::fmt::Display for HealthyStatuses {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.any_success {
            parts.push("2xx".to_string());
        }
        parts.extend(self.codes.iter().map(ToString::to_string));
        write!(f, "{}", parts.join(", "))
    }
}

/// Immutable description of one managed service.
///
/// `args`, `env` values and `readiness_url` may contain `${name.field}`
/// references to services listed earlier in the same run; see
/// [`crate::template`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Unique name within a run. Used in logs and placeholder references.
    pub name: String,
    /// Executable to spawn. Resolved against `PATH` by the OS.
    pub program: String,
    pub args: Vec<String>,
    /// Working directory. `None` inherits the orchestrator's.
    pub working_dir: Option<PathBuf>,
    /// Variables merged on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    /// URL polled with read-only requests until a healthy status comes back.
    pub readiness_url: String,
    pub startup_timeout: Duration,
    pub poll_interval: Duration,
    pub healthy_statuses: HealthyStatuses,
    /// Wait between the graceful and the forced stop signal.
    pub grace_period: Duration,
}

impl ServiceSpec {
    /// Create a spec with default timing and a 2xx healthy set.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        program: impl Into<String>,
        readiness_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            readiness_url: readiness_url.into(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            healthy_statuses: HealthyStatuses::success(),
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }

    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Add one variable to the environment overlay.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_healthy_statuses(mut self, statuses: HealthyStatuses) -> Self {
        self.healthy_statuses = statuses;
        self
    }

    #[must_use]
    pub const fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace_period = grace;
        self
    }

    /// Every templated string in this spec, in a stable order.
    fn templated_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.readiness_url.as_str())
            .chain(self.args.iter().map(String::as_str))
            .chain(self.env.values().map(String::as_str))
    }

    /// Substitute `${name.field}` references using already-started services.
    pub fn resolve(
        &self,
        known: &std::collections::HashMap<String, template::ServiceAddress>,
    ) -> Result<Self, TemplateError> {
        let mut resolved = self.clone();
        resolved.readiness_url = template::render(&self.readiness_url, known)?;
        resolved.args = self
            .args
            .iter()
            .map(|arg| template::render(arg, known))
            .collect::<Result<_, _>>()?;
        resolved.env = self
            .env
            .iter()
            .map(|(k, v)| Ok((k.clone(), template::render(v, known)?)))
            .collect::<Result<_, TemplateError>>()?;
        Ok(resolved)
    }

    /// Parse the readiness URL, which must already be free of placeholders.
    pub fn parsed_readiness_url(&self) -> Result<Url, SpecError> {
        let url = Url::parse(&self.readiness_url).map_err(|e| SpecError::InvalidReadinessUrl {
            service: self.name.clone(),
            url: self.readiness_url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(SpecError::InvalidReadinessUrl {
                service: self.name.clone(),
                url: self.readiness_url.clone(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    fn validate(&self, earlier: &HashSet<&str>) -> Result<(), SpecError> {
        if self.program.trim().is_empty() {
            return Err(SpecError::EmptyProgram {
                service: self.name.clone(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(SpecError::ZeroPollInterval {
                service: self.name.clone(),
            });
        }
        if self.healthy_statuses.is_empty() {
            return Err(SpecError::NoHealthyStatuses {
                service: self.name.clone(),
            });
        }

        for field in self.templated_fields() {
            let refs = template::references(field).map_err(|source| SpecError::Template {
                service: self.name.clone(),
                source,
            })?;
            for (target, name) in refs {
                if !earlier.contains(target.as_str()) {
                    return Err(SpecError::ForwardReference {
                        service: self.name.clone(),
                        target,
                    });
                }
                if !template::FIELDS.contains(&name.as_str()) {
                    return Err(SpecError::Template {
                        service: self.name.clone(),
                        source: TemplateError::UnknownField {
                            service: target,
                            field: name,
                        },
                    });
                }
            }
        }

        // Static URLs can be checked now; templated ones after resolution.
        if !template::has_placeholders(&self.readiness_url) {
            self.parsed_readiness_url()?;
        }
        Ok(())
    }
}

/// Validate an ordered list of specs before anything is started.
///
/// Names must be non-empty and unique, and placeholders may only refer to
/// services listed earlier.
pub fn validate_specs(specs: &[ServiceSpec]) -> Result<(), SpecError> {
    let mut earlier: HashSet<&str> = HashSet::with_capacity(specs.len());
    for spec in specs {
        if spec.name.trim().is_empty() {
            return Err(SpecError::EmptyName);
        }
        if earlier.contains(spec.name.as_str()) {
            return Err(SpecError::DuplicateName(spec.name.clone()));
        }
        spec.validate(&earlier)?;
        earlier.insert(spec.name.as_str());
    }
    Ok(())
}
