//! Bounded readiness polling.

use std::sync::Arc;
use std::time::Duration;

use stackup_core::{HealthyStatuses, Readiness, ReadinessCheck};
use tokio::time::{Instant, sleep};
use tracing::{debug, info};
use url::Url;

use super::HttpReadinessCheck;

/// Repeatedly asks a [`ReadinessCheck`] until a healthy status or a deadline.
///
/// Connection-level failures and non-qualifying statuses both mean "not up
/// yet". The deadline is only checked between attempts: a request already in
/// flight is allowed to finish. The prober reports an outcome and never
/// touches a handle.
#[derive(Clone)]
pub struct ReadinessProber {
    check: Arc<dyn ReadinessCheck>,
}

impl std::fmt::Debug for ReadinessProber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessProber").finish_non_exhaustive()
    }
}

impl ReadinessProber {
    pub fn new(check: Arc<dyn ReadinessCheck>) -> Self {
        Self { check }
    }

    /// Prober backed by [`HttpReadinessCheck`].
    pub fn http(request_timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self::new(Arc::new(HttpReadinessCheck::new(request_timeout)?)))
    }

    /// Poll `url` every `interval` until a status in `healthy` comes back or
    /// `timeout` has elapsed since the first attempt.
    pub async fn probe(
        &self,
        url: &Url,
        timeout: Duration,
        interval: Duration,
        healthy: &HealthyStatuses,
    ) -> Readiness {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;

            match self.check.check(url).await {
                Ok(status) if healthy.contains(status) => {
                    let elapsed = started.elapsed();
                    info!(%url, status, attempts, ?elapsed, "Service is ready");
                    return Readiness::Ready {
                        status,
                        attempts,
                        elapsed,
                    };
                }
                Ok(status) => {
                    debug!(%url, status, attempt = attempts, expected = %healthy, "Readiness check returned unhealthy status, retrying");
                }
                Err(e) => {
                    debug!(%url, attempt = attempts, error = %e, "Readiness check failed, retrying");
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                info!(%url, attempts, ?elapsed, "Service did not become ready in time");
                return Readiness::TimedOut { attempts, elapsed };
            }

            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mockall::mock;
    use stackup_core::ProbeError;
    use std::sync::atomic::{AtomicU32, Ordering};

    mock! {
        pub Check {}

        #[async_trait]
        impl ReadinessCheck for Check {
            async fn check(&self, url: &Url) -> Result<u16, ProbeError>;
        }
    }

    fn url() -> Url {
        Url::parse("http://127.0.0.1:3000/health").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_healthy_response() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut check = MockCheck::new();
        check.expect_check().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                Err(ProbeError::connect("connection refused"))
            } else {
                Ok(200)
            }
        });
        let prober = ReadinessProber::new(Arc::new(check));

        let start = Instant::now();
        let outcome = prober
            .probe(
                &url(),
                Duration::from_secs(30),
                Duration::from_millis(500),
                &HealthyStatuses::success(),
            )
            .await;

        assert!(matches!(
            outcome,
            Readiness::Ready {
                status: 200,
                attempts: 4,
                ..
            }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        // Three sleeps of one interval each, nowhere near the 30s timeout.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_within_one_interval_of_deadline() {
        let mut check = MockCheck::new();
        check
            .expect_check()
            .returning(|_| Err(ProbeError::connect("connection refused")));
        let prober = ReadinessProber::new(Arc::new(check));

        let timeout = Duration::from_secs(30);
        let interval = Duration::from_millis(500);
        let start = Instant::now();
        let outcome = prober
            .probe(&url(), timeout, interval, &HealthyStatuses::success())
            .await;

        let elapsed = start.elapsed();
        assert!(!outcome.is_ready());
        assert!(elapsed >= timeout);
        assert!(elapsed <= timeout + interval);
        assert_eq!(outcome.attempts(), 61);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_status_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut check = MockCheck::new();
        check.expect_check().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(503)
            } else {
                Ok(204)
            }
        });
        let prober = ReadinessProber::new(Arc::new(check));

        let outcome = prober
            .probe(
                &url(),
                Duration::from_secs(5),
                Duration::from_millis(100),
                &HealthyStatuses::success(),
            )
            .await;

        assert!(matches!(outcome, Readiness::Ready { status: 204, attempts: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_method_not_allowed_only_when_configured() {
        let mut check = MockCheck::new();
        check.expect_check().returning(|_| Ok(405));
        let prober = ReadinessProber::new(Arc::new(check));
        let interval = Duration::from_millis(500);

        let strict = prober
            .probe(&url(), Duration::from_secs(2), interval, &HealthyStatuses::success())
            .await;
        assert!(!strict.is_ready());

        let lenient = prober
            .probe(
                &url(),
                Duration::from_secs(2),
                interval,
                &HealthyStatuses::success().with_method_not_allowed(),
            )
            .await;
        assert!(matches!(lenient, Readiness::Ready { status: 405, attempts: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_still_makes_one_attempt() {
        let mut check = MockCheck::new();
        check
            .expect_check()
            .times(1)
            .returning(|_| Err(ProbeError::connect("refused")));
        let prober = ReadinessProber::new(Arc::new(check));

        let outcome = prober
            .probe(
                &url(),
                Duration::ZERO,
                Duration::from_millis(500),
                &HealthyStatuses::success(),
            )
            .await;
        assert!(matches!(outcome, Readiness::TimedOut { attempts: 1, .. }));
    }
}
