//! Test phase building blocks: HTTP smoke checks and an external command.

use std::time::Duration;

use anyhow::Context;
use reqwest::{Client, Method};
use serde_json::Value;
use stackup_core::ReadyServices;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::plan::CheckEntry;

/// Default per-request timeout for smoke checks.
pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum CheckError {
    #[error("check targets service '{0}', which is not running")]
    UnknownService(String),

    #[error("invalid HTTP method '{0}'")]
    Method(String),

    #[error("{method} {url}: request failed: {source}")]
    Request {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url}: expected status {expected}, got {actual}")]
    Status {
        method: Method,
        url: String,
        expected: u16,
        actual: u16,
    },

    #[error("{method} {url}: response is not JSON: {reason}")]
    NotJson {
        method: Method,
        url: String,
        reason: String,
    },

    #[error("{method} {url}: field '{field}' expected {expected}, got {actual}")]
    Field {
        method: Method,
        url: String,
        field: String,
        expected: Value,
        actual: Value,
    },
}

/// Runs `[[check]]` entries against ready services.
#[derive(Debug, Clone)]
pub struct CheckRunner {
    client: Client,
}

impl CheckRunner {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Run every check in order, stopping at the first failure.
    pub async fn run_all(
        &self,
        ready: &ReadyServices,
        checks: &[CheckEntry],
    ) -> Result<usize, CheckError> {
        for check in checks {
            self.run_one(ready, check).await?;
        }
        Ok(checks.len())
    }

    pub async fn run_one(&self, ready: &ReadyServices, check: &CheckEntry) -> Result<(), CheckError> {
        let url = ready
            .url(&check.service, &check.path)
            .ok_or_else(|| CheckError::UnknownService(check.service.clone()))?;
        let method = Method::from_bytes(check.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| CheckError::Method(check.method.clone()))?;

        let mut request = self.client.request(method.clone(), &url);
        if let Some(body) = &check.body {
            request = request.json(body);
        }
        debug!(%method, %url, "Running check");

        let response = request.send().await.map_err(|source| CheckError::Request {
            method: method.clone(),
            url: url.clone(),
            source,
        })?;

        let actual = response.status().as_u16();
        if actual != check.expect_status {
            return Err(CheckError::Status {
                method,
                url,
                expected: check.expect_status,
                actual,
            });
        }

        if !check.expect_json.is_empty() {
            let body: Value = response.json().await.map_err(|e| CheckError::NotJson {
                method: method.clone(),
                url: url.clone(),
                reason: e.to_string(),
            })?;
            for (field, expected) in &check.expect_json {
                let actual = body.get(field).cloned().unwrap_or(Value::Null);
                if &actual != expected {
                    return Err(CheckError::Field {
                        method,
                        url,
                        field: field.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }

        info!(%method, %url, status = actual, "Check passed");
        Ok(())
    }
}

/// Environment exported to the trailing command: `STACKUP_<NAME>_URL` and
/// `STACKUP_<NAME>_PORT` per service, with the name upper-cased and every
/// non-alphanumeric character replaced by `_`.
pub fn service_env(ready: &ReadyServices) -> Vec<(String, String)> {
    ready
        .iter()
        .flat_map(|service| {
            let key: String = service
                .name
                .chars()
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect();
            [
                (format!("STACKUP_{key}_URL"), service.base_url.clone()),
                (format!("STACKUP_{key}_PORT"), service.port.to_string()),
            ]
        })
        .collect()
}

/// Run `command` (program then arguments) with the service environment and
/// fail unless it exits successfully.
pub async fn run_command(command: &[String], ready: &ReadyServices) -> anyhow::Result<()> {
    let (program, args) = command.split_first().context("empty test command")?;
    info!(%program, ?args, "Running test command");

    let status = Command::new(program)
        .args(args)
        .envs(service_env(ready))
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("failed to run '{program}'"))?;

    if !status.success() {
        anyhow::bail!("test command '{program}' exited with {status}");
    }
    Ok(())
}
