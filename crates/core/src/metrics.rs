//! Global atomic counters for scanner observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] once per tick to emit current values as a single
//! `tracing::info!` event — this is the "counts" the daemon's structured
//! log lines promise.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters — no allocations, no locking.
pub struct Metrics {
    events_processed: AtomicU64,
    ips_events_processed: AtomicU64,
    findings_emitted: AtomicU64,
    unknown_event_types: AtomicU64,
    parse_errors: AtomicU64,
    delivery_successes: AtomicU64,
    delivery_failures: AtomicU64,
    integration_failures: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            ips_events_processed: AtomicU64::new(0),
            findings_emitted: AtomicU64::new(0),
            unknown_event_types: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            delivery_successes: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            integration_failures: AtomicU64::new(0),
        }
    }

    pub fn inc_events_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ips_events_processed(&self) {
        self.ips_events_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_findings_emitted(&self) {
        self.findings_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unknown_event_type(&self) {
        self.unknown_event_types.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivery_success(&self) {
        self.delivery_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_delivery_failure(&self) {
        self.delivery_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_integration_failure(&self) {
        self.integration_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Emit all current counter values as a single `info!` event, then
    /// reset them for the next tick.
    pub fn flush(&self, site: &str) {
        tracing::info!(
            metric = "tick_summary",
            site = site,
            events_processed = self.events_processed.swap(0, Ordering::Relaxed),
            ips_events_processed = self.ips_events_processed.swap(0, Ordering::Relaxed),
            findings_emitted = self.findings_emitted.swap(0, Ordering::Relaxed),
            unknown_event_types = self.unknown_event_types.swap(0, Ordering::Relaxed),
            parse_errors = self.parse_errors.swap(0, Ordering::Relaxed),
            delivery_successes = self.delivery_successes.swap(0, Ordering::Relaxed),
            delivery_failures = self.delivery_failures.swap(0, Ordering::Relaxed),
            integration_failures = self.integration_failures.swap(0, Ordering::Relaxed),
            "tick complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = Metrics::new();
        assert_eq!(m.events_processed.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn increments_are_visible() {
        let m = Metrics::new();
        m.inc_events_processed();
        m.inc_events_processed();
        assert_eq!(m.events_processed.load(Ordering::Relaxed), 2);
    }
}
