//! Per-integration circuit breaker.
//!
//! Three states, guarded by a mutex, held in memory only and reset on
//! process restart: `Closed` (normal), `Open` (too many consecutive
//! failures, calls short-circuited), `HalfOpen` (one probe call allowed
//! after the open duration elapses).

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// A circuit breaker tracking one integration's health.
///
/// Opens after `threshold` consecutive failures; transitions to half-open
/// after `open_duration` has elapsed; closes again after a single success
/// observed while half-open.
pub struct CircuitBreaker {
    threshold: u32,
    open_duration: Duration,
    inner: Mutex<Inner>,
}

/// What the caller should do given the breaker's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Proceed with the call normally.
    Allowed,
    /// Proceed, but this is the sole half-open probe — a failure reopens
    /// the breaker immediately.
    Probe,
    /// Do not call; the breaker is open.
    Rejected,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, open_duration: Duration) -> Self {
        Self {
            threshold,
            open_duration,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    /// The default policy: open after 3 consecutive failures, half-open
    /// after 60s.
    pub fn default_policy() -> Self {
        Self::new(3, Duration::from_secs(60))
    }

    /// Decide whether a call should be admitted, transitioning
    /// `Open -> HalfOpen` if the open duration has elapsed.
    pub async fn admit(&self) -> Admission {
        let mut inner = self.inner.lock().await;
        match inner.state {
            State::Closed => Admission::Allowed,
            State::HalfOpen => Admission::Probe,
            State::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= self.open_duration {
                    inner.state = State::HalfOpen;
                    Admission::Probe
                } else {
                    Admission::Rejected
                }
            }
        }
    }

    /// Record a successful call; closes the breaker (resets the failure
    /// count to zero) whether it was called from `Closed` or `HalfOpen`.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    /// Record a failed call. Opens the breaker once consecutive failures
    /// reach `threshold`, or immediately reopens it if the failure
    /// occurred during the half-open probe.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;
        if inner.state == State::HalfOpen || inner.consecutive_failures >= self.threshold {
            inner.state = State::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    #[cfg(test)]
    async fn is_open(&self) -> bool {
        self.inner.lock().await.state == State::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        cb.record_failure().await;
        cb.record_failure().await;
        assert!(!cb.is_open().await);
        cb.record_failure().await;
        assert!(cb.is_open().await);
        assert_eq!(cb.admit().await, Admission::Rejected);
    }

    #[tokio::test]
    async fn success_resets_failure_count() {
        let cb = CircuitBreaker::new(3, Duration::from_secs(60));
        cb.record_failure().await;
        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;
        cb.record_failure().await;
        assert!(!cb.is_open().await);
    }

    #[tokio::test]
    async fn half_open_after_open_duration_elapses() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(5));
        cb.record_failure().await;
        assert!(cb.is_open().await);
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(cb.admit().await, Admission::Probe);
    }

    #[tokio::test]
    async fn half_open_failure_reopens_immediately() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(5));
        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(cb.admit().await, Admission::Probe);
        cb.record_failure().await;
        assert!(cb.is_open().await);
    }

    #[tokio::test]
    async fn half_open_success_closes_breaker() {
        let cb = CircuitBreaker::new(1, Duration::from_millis(5));
        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(15)).await;
        assert_eq!(cb.admit().await, Admission::Probe);
        cb.record_success().await;
        assert_eq!(cb.admit().await, Admission::Allowed);
    }
}
