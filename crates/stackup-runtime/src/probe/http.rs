//! HTTP readiness check.
//!
//! This module issues a single GET per call and reports the status code.
//! It never reads the body and has no opinion on which codes are healthy.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use stackup_core::{ProbeError, ReadinessCheck};
use url::Url;

/// Per-request timeout so one hung connection cannot eat a whole stage.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// [`ReadinessCheck`] backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpReadinessCheck {
    client: Client,
}

impl HttpReadinessCheck {
    /// Build a check whose requests give up after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse an existing client.
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ReadinessCheck for HttpReadinessCheck {
    async fn check(&self, url: &Url) -> Result<u16, ProbeError> {
        match self.client.get(url.clone()).send().await {
            Ok(response) => Ok(response.status().as_u16()),
            Err(e) if e.is_connect() => Err(ProbeError::Connect(e.to_string())),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout(e.to_string())),
            Err(e) => Err(ProbeError::Request(e.to_string())),
        }
    }
}
