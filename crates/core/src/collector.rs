//! Collector: fetches events, IPS events and device stats for a site
//! and applies the client-side timestamp filter.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::warn;

use crate::controller::{ControllerClient, ControllerTransport};
use crate::domain::{DeviceStats, Event, IPSEvent};
use crate::error::Result;
use crate::metrics::METRICS;

/// The 5-minute clock-skew tolerance subtracted from a non-null `since`
/// watermark. A function rather than a `const` — no
/// guarantee `Duration::minutes` is callable in a const context.
fn clock_skew_tolerance() -> ChronoDuration {
    ChronoDuration::minutes(5)
}

/// An opaque record from the SSH/DB fallback path: the
/// schema differs by controller firmware, so it is treated as a flat
/// key/value bag rather than a typed struct.
#[derive(Debug, Clone, Default)]
pub struct RawRecord {
    pub fields: HashMap<String, String>,
}

impl RawRecord {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Seam for the SSH/DB fallback path, so the core crate does not hard-depend
/// on a concrete SSH library.
#[async_trait]
pub trait FallbackSource: Send + Sync {
    fn is_configured(&self) -> bool;
    async fn fetch_ips_events(&self, since: DateTime<Utc>) -> Result<Vec<RawRecord>>;
}

/// Default fallback: always unconfigured, used when no SSH/DB integration
/// is set up.
pub struct NullFallback;

#[async_trait]
impl FallbackSource for NullFallback {
    fn is_configured(&self) -> bool {
        false
    }

    async fn fetch_ips_events(&self, _since: DateTime<Utc>) -> Result<Vec<RawRecord>> {
        Ok(Vec::new())
    }
}

/// Validate a fallback record open question: source IP and
/// destination IP must both be present, else the record is dropped (the
/// caller increments the parse-error counter). Every other field gets a
/// best-effort default.
fn validate_fallback_record(record: &RawRecord, now: DateTime<Utc>) -> Option<IPSEvent> {
    let src_ip = record.get("src_ip")?.to_string();
    let dst_ip = record.get("dst_ip")?.to_string();

    let time = record
        .get("time")
        .and_then(|t| t.parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or(now);

    Some(IPSEvent {
        id: record
            .get("id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("fallback:{src_ip}:{dst_ip}:{}", time.timestamp_micros())),
        time,
        src_ip,
        src_port: record.get("src_port").and_then(|p| p.parse().ok()),
        dst_ip,
        dst_port: record.get("dst_port").and_then(|p| p.parse().ok()),
        protocol: record.get("protocol").unwrap_or("unknown").to_string(),
        signature: record
            .get("signature")
            .unwrap_or("ET UNKNOWN unspecified signature")
            .to_string(),
        signature_id: record.get("signature_id").and_then(|s| s.parse().ok()).unwrap_or(0),
        category: record.get("category").unwrap_or("UNKNOWN").to_string(),
        severity: crate::domain::ips_event::RawSeverity(
            record.get("severity").and_then(|s| s.parse().ok()).unwrap_or(3),
        ),
        action: record.get("action").unwrap_or("detected").to_string(),
    })
}

/// The effective cutoff for a poll: non-null `since` gets the clock-skew
/// tolerance subtracted; null `since` (first run) uses `now - history_hours`
/// with no skew subtraction.
fn effective_cutoff(since: Option<DateTime<Utc>>, now: DateTime<Utc>, history_hours: u64) -> DateTime<Utc> {
    match since {
        Some(t) => t - clock_skew_tolerance(),
        None => now - ChronoDuration::hours(history_hours as i64),
    }
}

pub struct Collector<'a, T: ControllerTransport> {
    client: &'a ControllerClient<T>,
    fallback: Box<dyn FallbackSource>,
    history_hours_max: u64,
}

impl<'a, T: ControllerTransport> Collector<'a, T> {
    pub fn new(client: &'a ControllerClient<T>, fallback: Box<dyn FallbackSource>, history_hours_max: u64) -> Self {
        Self {
            client,
            fallback,
            history_hours_max,
        }
    }

    pub fn with_null_fallback(client: &'a ControllerClient<T>, history_hours_max: u64) -> Self {
        Self::new(client, Box::new(NullFallback), history_hours_max)
    }

    /// Fetch events and IPS events for `site`, filtered to the effective
    /// cutoff derived from `since`/`history_hours`. Falls back to the
    /// SSH/DB path, strictly additively, when the API returned no IPS
    /// events and a fallback is configured.
    pub async fn collect(
        &self,
        site: &str,
        since: Option<DateTime<Utc>>,
        history_hours: u64,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Event>, Vec<IPSEvent>)> {
        let cutoff = effective_cutoff(since, now, history_hours.min(self.history_hours_max));

        let raw_events = self.client.get_events(site).await?;
        let events: Vec<Event> = raw_events.into_iter().filter(|e| e.time > cutoff).collect();

        let mut raw_ips = self.client.get_ips_events(site).await?;

        if raw_ips.is_empty() && self.fallback.is_configured() {
            match self.fallback.fetch_ips_events(cutoff).await {
                Ok(records) => {
                    for record in records {
                        match validate_fallback_record(&record, now) {
                            Some(event) => raw_ips.push(event),
                            None => {
                                METRICS.inc_parse_error();
                                warn!("dropped fallback IPS record missing src_ip/dst_ip");
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SSH/DB fallback fetch failed, proceeding with API data only");
                }
            }
        }

        let ips_events: Vec<IPSEvent> = raw_ips.into_iter().filter(|e| e.time > cutoff).collect();

        Ok((events, ips_events))
    }

    /// Fetch device stats for `site`. Callers wrap this in isolation: a
    /// failure here must not abort the tick.
    pub async fn collect_devices(&self, site: &str) -> Result<Vec<DeviceStats>> {
        self.client.get_devices(site).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn first_run_cutoff_uses_history_hours_with_no_skew() {
        let now = ts(12, 0);
        let cutoff = effective_cutoff(None, now, 24);
        assert_eq!(cutoff, now - ChronoDuration::hours(24));
    }

    #[test]
    fn repeat_run_cutoff_subtracts_five_minutes() {
        let since = ts(10, 0);
        let cutoff = effective_cutoff(Some(since), ts(12, 0), 24);
        assert_eq!(cutoff, since - ChronoDuration::minutes(5));
    }

    #[test]
    fn skew_boundary_admits_four_fifty_nine_filters_five_oh_one() {
        let since = ts(10, 0);
        let cutoff = effective_cutoff(Some(since), ts(12, 0), 24);
        let admitted = since - ChronoDuration::minutes(4) - ChronoDuration::seconds(59);
        let filtered = since - ChronoDuration::minutes(5) - ChronoDuration::seconds(1);
        assert!(admitted > cutoff);
        assert!(filtered < cutoff);
    }

    #[test]
    fn fallback_record_requires_both_ips() {
        let now = ts(0, 0);
        let mut fields = HashMap::new();
        fields.insert("src_ip".to_string(), "10.0.0.5".to_string());
        let missing_dst = RawRecord { fields };
        assert!(validate_fallback_record(&missing_dst, now).is_none());
    }

    #[test]
    fn fallback_record_with_both_ips_parses_with_defaults() {
        let now = ts(0, 0);
        let mut fields = HashMap::new();
        fields.insert("src_ip".to_string(), "10.0.0.5".to_string());
        fields.insert("dst_ip".to_string(), "1.2.3.4".to_string());
        let record = RawRecord { fields };
        let event = validate_fallback_record(&record, now).unwrap();
        assert_eq!(event.src_ip, "10.0.0.5");
        assert_eq!(event.dst_ip, "1.2.3.4");
        assert_eq!(event.action, "detected");
        assert_eq!(event.category, "UNKNOWN");
    }

    struct StubTransport;

    #[async_trait]
    impl ControllerTransport for StubTransport {
        async fn execute(
            &self,
            _method: crate::controller::Method,
            _url: &str,
            _body: Option<serde_json::Value>,
            _timeout: std::time::Duration,
        ) -> std::result::Result<crate::controller::RawResponse, crate::controller::TransportError> {
            Ok(crate::controller::RawResponse {
                status: 200,
                headers: HashMap::new(),
                body: br#"{"meta":{"rc":"ok"},"data":[]}"#.to_vec(),
            })
        }
    }

    #[tokio::test]
    async fn empty_controller_response_is_not_an_error() {
        let client = ControllerClient::new(
            StubTransport,
            "unifi.example.com",
            "admin",
            "secret",
            std::time::Duration::from_secs(5),
            3,
        );
        client.detect_device_type().await.unwrap();
        client.authenticate().await.unwrap();
        let collector = Collector::with_null_fallback(&client, 720);
        let (events, ips) = collector.collect("default", None, 24, ts(12, 0)).await.unwrap();
        assert!(events.is_empty());
        assert!(ips.is_empty());
    }
}
