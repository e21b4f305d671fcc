// Bounded retry with randomized backoff
//
// Retries transient authorization rejections (401, and 400 by default) and
// network-level failures, sharing one attempt counter between both. The
// delay before every retry is drawn uniformly from a fixed range; there is
// no exponential growth.

use std::future::Future;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::Error;
use crate::fetch::{RawResponse, is_network_failure};

// ── Backoff ──────────────────────────────────────────────────────────

/// Uniform random delay range, in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffRange {
    min_secs: f64,
    max_secs: f64,
}

impl BackoffRange {
    /// Build a range. Bounds are clamped to be non-negative and ordered.
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        let min_secs = min_secs.max(0.0);
        let max_secs = max_secs.max(min_secs);
        Self { min_secs, max_secs }
    }

    /// A zero-length range: retry immediately.
    pub fn immediate() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn bounds(&self) -> RangeInclusive<f64> {
        self.min_secs..=self.max_secs
    }

    /// Draw one delay from the range.
    pub fn sample(&self) -> Duration {
        self.sample_with(&mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_secs <= self.min_secs {
            return Duration::from_secs_f64(self.min_secs);
        }
        Duration::from_secs_f64(rng.gen_range(self.bounds()))
    }
}

impl Default for BackoffRange {
    fn default() -> Self {
        Self::new(1.0, 5.0)
    }
}

// ── Policy ───────────────────────────────────────────────────────────

/// Retry parameters for the authenticated fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt. `5` means up to 6 requests.
    pub max_retries: u32,
    pub backoff: BackoffRange,
    /// HTTP statuses that are retried instead of failing immediately.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff: BackoffRange::default(),
            retry_statuses: vec![401, 400],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn is_retryable(&self, status: u16) -> bool {
        self.retry_statuses.contains(&status)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

// ── Sleeper ──────────────────────────────────────────────────────────

/// Waits out a backoff delay. Swappable so tests can observe delays
/// without actually sleeping.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Default sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

pub fn default_sleeper() -> Arc<dyn Sleeper> {
    Arc::new(TokioSleeper)
}

// ── Execution ────────────────────────────────────────────────────────

enum Failure {
    Status(u16),
    Network(String),
}

impl Failure {
    fn exhausted(self, attempts: u32) -> Error {
        match self {
            Self::Status(last_status) => Error::AuthenticationExhausted {
                attempts,
                last_status,
            },
            Self::Network(reason) => Error::NetworkExhausted { attempts, reason },
        }
    }
}

/// Run `attempt` until it yields a 2xx response, a non-retryable failure,
/// or the policy's ceiling is reached.
///
/// `attempt` receives the 1-based attempt number and must build a fresh
/// request every time. Cancellation during a backoff wait ends the loop
/// with `Error::Cancelled`.
pub async fn execute<F, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
    mut attempt: F,
) -> Result<RawResponse, Error>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<RawResponse, Error>>,
{
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let failure = match attempt(attempts).await {
            Ok(resp) if resp.is_success() => {
                debug!(attempts, status = %resp.status, "request succeeded");
                return Ok(resp);
            }
            Ok(resp) if policy.is_retryable(resp.status.as_u16()) => {
                Failure::Status(resp.status.as_u16())
            }
            Ok(resp) => return Err(resp.into_status_error()),
            Err(err) if is_network_failure(&err) => Failure::Network(err.to_string()),
            Err(err) => return Err(err),
        };

        if attempts > policy.max_retries {
            let err = failure.exhausted(attempts);
            warn!(attempts, error = %err, "retry ceiling reached");
            return Err(err);
        }

        let delay = policy.backoff.sample();
        match &failure {
            Failure::Status(status) => warn!(
                attempt = attempts,
                max_retries = policy.max_retries,
                status,
                delay_ms = delay.as_millis(),
                "retryable status, backing off"
            ),
            Failure::Network(reason) => warn!(
                attempt = attempts,
                max_retries = policy.max_retries,
                reason = reason.as_str(),
                delay_ms = delay.as_millis(),
                "network failure, backing off"
            ),
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            () = sleeper.sleep(delay) => {}
        }
    }
}
