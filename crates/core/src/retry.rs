//! Shared retry/backoff primitive.
//!
//! One reusable primitive used by the controller client (HTTP), the
//! delivery manager (SMTP), and the integration runner (fetch). No
//! inheritance — just a small config struct plus a retryable-predicate
//! closure passed in by the caller.

use std::future::Future;
use std::time::Duration;

/// Exponential backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub base: Duration,
    /// Delay never exceeds this value.
    pub cap: Duration,
    /// Delay multiplier applied after each attempt.
    pub multiplier: f64,
    /// Total attempts, including the first (non-retry) attempt.
    pub max_attempts: u32,
}

impl BackoffPolicy {
    /// The policy used by the controller client and the delivery manager:
    /// base 1s, cap 60s, multiplier 2, 5 attempts by default.
    pub fn http_default(max_attempts: u32) -> Self {
        Self {
            base: Duration::from_secs(1),
            cap: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts,
        }
    }

    /// Delay before the attempt numbered `attempt` (1-indexed; the first
    /// attempt incurs no delay, so `attempt == 1` returns zero).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let exp = attempt - 2;
        let scaled = self.base.as_secs_f64() * self.multiplier.powi(exp as i32);
        Duration::from_secs_f64(scaled.min(self.cap.as_secs_f64()))
    }
}

/// Outcome of a single attempt, as classified by the caller's predicate.
pub enum Outcome<T> {
    /// The attempt succeeded; stop retrying.
    Done(T),
    /// The attempt failed but may be retried.
    Retryable,
    /// The attempt failed and must not be retried (e.g. a non-401/429 4xx).
    Fatal,
}

/// Result of running [`retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// All attempts were exhausted without success.
    Exhausted,
    /// The operation returned a fatal (non-retryable) failure.
    Fatal,
}

/// Retry an async operation under a [`BackoffPolicy`].
///
/// `attempt_fn` is called once per attempt and classifies its own result
/// via [`Outcome`]. Sleeps between attempts use `tokio::time::sleep` and
/// so are suspension points, not busy-waits.
pub async fn retry<T, F, Fut>(policy: &BackoffPolicy, mut attempt_fn: F) -> Result<T, RetryOutcome>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Outcome<T>>,
{
    for attempt in 1..=policy.max_attempts {
        if attempt > 1 {
            tokio::time::sleep(policy.delay_for(attempt)).await;
        }
        match attempt_fn(attempt).await {
            Outcome::Done(value) => return Ok(value),
            Outcome::Fatal => return Err(RetryOutcome::Fatal),
            Outcome::Retryable => continue,
        }
    }
    Err(RetryOutcome::Exhausted)
}
