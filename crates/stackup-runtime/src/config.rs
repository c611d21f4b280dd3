//! Runtime configuration for an orchestrator.

use std::sync::Arc;
use std::time::Duration;

use stackup_core::{NoopLogSink, ServiceLogSink};

use crate::probe::{DEFAULT_REQUEST_TIMEOUT, ReadinessProber};
use crate::process::{BufferedLogSink, DEFAULT_BUFFER_LINES, ProcessSupervisor, TracingLogSink};

/// Env var that turns on visible service output.
pub const DEBUG_ENV: &str = "STACKUP_DEBUG";
/// Older name for [`DEBUG_ENV`], still honoured.
pub const LEGACY_DEBUG_ENV: &str = "DEBUG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Route service stdout/stderr to tracing instead of an in-memory buffer.
    pub debug_output: bool,
    /// Per-request timeout for a single readiness attempt.
    pub probe_request_timeout: Duration,
    /// Lines kept per service when output is buffered. `0` discards output.
    pub buffer_lines: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debug_output: false,
            probe_request_timeout: DEFAULT_REQUEST_TIMEOUT,
            buffer_lines: DEFAULT_BUFFER_LINES,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults, with `debug_output` taken from the environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let debug_output = [DEBUG_ENV, LEGACY_DEBUG_ENV]
            .iter()
            .find_map(|key| lookup(key))
            .is_some_and(|value| is_truthy(&value));
        Self {
            debug_output,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_debug_output(mut self, debug: bool) -> Self {
        self.debug_output = debug;
        self
    }

    /// Build a [`ProcessSupervisor`] for this config.
    ///
    /// Returns the buffer as well when output is buffered, so callers can show
    /// the tail of a failing service.
    pub fn build_supervisor(
        &self,
    ) -> Result<(ProcessSupervisor, Option<Arc<BufferedLogSink>>), reqwest::Error> {
        let prober = ReadinessProber::http(self.probe_request_timeout)?;
        if self.debug_output {
            let sink: Arc<dyn ServiceLogSink> = Arc::new(TracingLogSink);
            return Ok((ProcessSupervisor::new(prober, sink), None));
        }
        if self.buffer_lines == 0 {
            let sink: Arc<dyn ServiceLogSink> = Arc::new(NoopLogSink);
            return Ok((ProcessSupervisor::new(prober, sink), None));
        }
        let buffer = Arc::new(BufferedLogSink::new(self.buffer_lines));
        let sink: Arc<dyn ServiceLogSink> = buffer.clone();
        Ok((ProcessSupervisor::new(prober, sink), Some(buffer)))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
