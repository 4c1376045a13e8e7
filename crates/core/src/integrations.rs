//! IntegrationRunner: best-effort fan-out to optional third-party
//! integrations, isolated by a per-integration circuit breaker and timeout
//! so one integration's failure never blocks another.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::circuit_breaker::{Admission, CircuitBreaker};
use crate::metrics::METRICS;

/// Default per-integration timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Contract every integration must implement. `validate_config` runs once
/// at startup; `fetch` runs once per tick.
#[async_trait]
pub trait Integration: Send + Sync {
    fn name(&self) -> &str;
    fn is_configured(&self) -> bool;
    /// `Ok(())` if configuration is internally consistent, `Err(reason)`
    /// otherwise. A partially-configured integration (some but not all
    /// required credentials present) must fail here rather than at fetch
    /// time, so the startup warning names it explicitly.
    fn validate_config(&self) -> std::result::Result<(), String>;
    async fn fetch(&self) -> std::result::Result<(), String>;
}

/// Why a single integration's tick did not succeed, surfaced to the
/// scheduler for structured logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
    Success,
    Skipped,
    CircuitOpen,
    Timeout,
    Error(String),
}

impl IntegrationOutcome {
    pub fn reason(&self) -> String {
        match self {
            IntegrationOutcome::Success => "ok".to_string(),
            IntegrationOutcome::Skipped => "not_configured".to_string(),
            IntegrationOutcome::CircuitOpen => "circuit_open".to_string(),
            IntegrationOutcome::Timeout => "timeout_30s".to_string(),
            IntegrationOutcome::Error(msg) => format!("error: {msg}"),
        }
    }
}

struct Slot {
    integration: Box<dyn Integration>,
    breaker: CircuitBreaker,
}

/// Owns one circuit breaker per registered integration and runs every
/// tick's fetches concurrently.
pub struct IntegrationRunner {
    slots: Vec<Slot>,
    timeout: Duration,
}

impl IntegrationRunner {
    pub fn new(integrations: Vec<Box<dyn Integration>>, timeout: Duration) -> Self {
        let slots = integrations
            .into_iter()
            .map(|integration| Slot {
                integration,
                breaker: CircuitBreaker::default_policy(),
            })
            .collect();
        Self { slots, timeout }
    }

    /// Validate every registered integration once at startup. Fully-absent
    /// configuration is silent; partial configuration is a warning and the
    /// integration is excluded for the remainder of the process.
    pub fn validate_all(&self) -> Vec<String> {
        let mut excluded = Vec::new();
        for slot in &self.slots {
            if !slot.integration.is_configured() {
                continue;
            }
            if let Err(reason) = slot.integration.validate_config() {
                warn!(integration = slot.integration.name(), reason, "excluding partially-configured integration");
                excluded.push(slot.integration.name().to_string());
            }
        }
        excluded
    }

    /// Run every configured integration's fetch concurrently, isolated by
    /// its own circuit breaker and timeout. Always returns one outcome per
    /// registered integration, in registration order; never aborts early
    /// on another integration's failure.
    pub async fn run_all(&self) -> Vec<(String, IntegrationOutcome)> {
        let futures = self.slots.iter().map(|slot| self.run_one(slot));
        futures::future::join_all(futures).await
    }

    async fn run_one(&self, slot: &Slot) -> (String, IntegrationOutcome) {
        let name = slot.integration.name().to_string();

        if !slot.integration.is_configured() {
            return (name, IntegrationOutcome::Skipped);
        }

        let admission = slot.breaker.admit().await;
        if admission == Admission::Rejected {
            return (name, IntegrationOutcome::CircuitOpen);
        }

        let outcome = match tokio::time::timeout(self.timeout, slot.integration.fetch()).await {
            Ok(Ok(())) => {
                slot.breaker.record_success().await;
                IntegrationOutcome::Success
            }
            Ok(Err(reason)) => {
                slot.breaker.record_failure().await;
                METRICS.inc_integration_failure();
                IntegrationOutcome::Error(reason)
            }
            Err(_elapsed) => {
                slot.breaker.record_failure().await;
                METRICS.inc_integration_failure();
                IntegrationOutcome::Timeout
            }
        };

        (name, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct ScriptedIntegration {
        name: &'static str,
        configured: bool,
        valid: bool,
        results: std::sync::Mutex<Vec<std::result::Result<(), String>>>,
        calls: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Integration for ScriptedIntegration {
        fn name(&self) -> &str {
            self.name
        }
        fn is_configured(&self) -> bool {
            self.configured
        }
        fn validate_config(&self) -> std::result::Result<(), String> {
            if self.valid {
                Ok(())
            } else {
                Err("missing api_key".to_string())
            }
        }
        async fn fetch(&self) -> std::result::Result<(), String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut results = self.results.lock().unwrap();
            if results.is_empty() {
                Ok(())
            } else {
                results.remove(0)
            }
        }
    }

    fn scripted(name: &'static str, configured: bool, valid: bool, results: Vec<std::result::Result<(), String>>) -> ScriptedIntegration {
        ScriptedIntegration {
            name,
            configured,
            valid,
            results: std::sync::Mutex::new(results),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    #[tokio::test]
    async fn unconfigured_integration_is_silently_skipped() {
        let runner = IntegrationRunner::new(vec![Box::new(scripted("slack", false, true, vec![]))], DEFAULT_TIMEOUT);
        let results = runner.run_all().await;
        assert_eq!(results[0].1, IntegrationOutcome::Skipped);
    }

    #[tokio::test]
    async fn partially_configured_integration_is_flagged_at_validate() {
        let runner = IntegrationRunner::new(vec![Box::new(scripted("slack", true, false, vec![]))], DEFAULT_TIMEOUT);
        let excluded = runner.validate_all();
        assert_eq!(excluded, vec!["slack".to_string()]);
    }

    #[tokio::test]
    async fn one_integration_failing_does_not_affect_another() {
        let failing = scripted("a", true, true, vec![Err("boom".to_string())]);
        let succeeding = scripted("b", true, true, vec![]);
        let runner = IntegrationRunner::new(vec![Box::new(failing), Box::new(succeeding)], DEFAULT_TIMEOUT);
        let results = runner.run_all().await;
        assert_eq!(results[0].1, IntegrationOutcome::Error("boom".to_string()));
        assert_eq!(results[1].1, IntegrationOutcome::Success);
    }

    #[tokio::test]
    async fn circuit_opens_after_repeated_failures_and_rejects_without_calling() {
        let calls = Arc::new(AtomicU32::new(0));
        let integration = ScriptedIntegration {
            name: "flaky",
            configured: true,
            valid: true,
            results: std::sync::Mutex::new(vec![Err("e1".into()), Err("e2".into()), Err("e3".into()), Err("e4".into())]),
            calls: calls.clone(),
        };
        let runner = IntegrationRunner::new(vec![Box::new(integration)], DEFAULT_TIMEOUT);

        runner.run_all().await;
        runner.run_all().await;
        runner.run_all().await;
        let fourth = runner.run_all().await;

        assert_eq!(fourth[0].1, IntegrationOutcome::CircuitOpen);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fetch_exceeding_timeout_is_reported_as_timeout() {
        struct SlowIntegration;
        #[async_trait]
        impl Integration for SlowIntegration {
            fn name(&self) -> &str {
                "slow"
            }
            fn is_configured(&self) -> bool {
                true
            }
            fn validate_config(&self) -> std::result::Result<(), String> {
                Ok(())
            }
            async fn fetch(&self) -> std::result::Result<(), String> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }

        let runner = IntegrationRunner::new(vec![Box::new(SlowIntegration)], Duration::from_millis(5));
        let results = runner.run_all().await;
        assert_eq!(results[0].1, IntegrationOutcome::Timeout);
    }
}
