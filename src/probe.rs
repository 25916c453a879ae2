//! Readiness Prober
//!
//! Polls a list of health endpoints until one of them answers with a 2xx,
//! sleeping a fixed delay between attempts. The HTTP check and the sleep are
//! both injected so the retry loop can be driven by fakes.

use crate::quickwit::client::QuickwitClient;
use std::fmt;
use std::time::Duration;

/// Health endpoints probed by default, in order
pub const DEFAULT_HEALTH_ENDPOINTS: &[&str] =
    &["/health/readyz", "/health/livez", "/api/v1/version"];

/// Something that can pause the bootstrap
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

/// Real sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// A single health endpoint check
#[allow(async_fn_in_trait)]
pub trait HealthCheck {
    /// True if `endpoint` answered with a success status
    async fn is_healthy(&self, endpoint: &str) -> bool;
}

impl HealthCheck for QuickwitClient {
    async fn is_healthy(&self, endpoint: &str) -> bool {
        let url = self.url(endpoint);
        match self.http.status(&url).await {
            Ok(status) => {
                tracing::debug!("{} -> {}", url, status);
                status.is_success()
            }
            Err(e) => {
                tracing::debug!("{} unreachable: {:#}", url, e);
                false
            }
        }
    }
}

/// Retry settings for the prober
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub endpoints: Vec<String>,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_HEALTH_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            max_attempts: 30,
            delay: Duration::from_secs(5),
        }
    }
}

/// The service never became ready
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTimeout {
    pub attempts: u32,
}

impl fmt::Display for ProbeTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "service not ready after {} attempts", self.attempts)
    }
}

impl std::error::Error for ProbeTimeout {}

/// Probe every endpoint once, in order; true on the first success
async fn probe_once<H: HealthCheck>(check: &H, endpoints: &[String]) -> bool {
    for endpoint in endpoints {
        if check.is_healthy(endpoint).await {
            tracing::debug!("{} is healthy", endpoint);
            return true;
        }
    }
    false
}

/// Wait until any endpoint reports healthy
///
/// Makes at most `max_attempts` attempts (at least one) with `delay` between
/// consecutive attempts, and returns the number of attempts used.
pub async fn wait_until_ready<H, S>(
    check: &H,
    sleeper: &S,
    config: &ProbeConfig,
) -> Result<u32, ProbeTimeout>
where
    H: HealthCheck,
    S: Sleeper,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        if probe_once(check, &config.endpoints).await {
            tracing::info!("Service is ready (attempt {}/{})", attempt, max_attempts);
            return Ok(attempt);
        }

        if attempt < max_attempts {
            tracing::info!(
                "Waiting for service... (attempt {}/{}, retrying in {:?})",
                attempt,
                max_attempts,
                config.delay
            );
            sleeper.sleep(config.delay).await;
        }
    }

    tracing::error!("Service did not become ready after {} attempts", max_attempts);
    Err(ProbeTimeout {
        attempts: max_attempts,
    })
}
