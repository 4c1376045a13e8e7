//! The root output type assembled once per tick and handed to the renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::finding::{Finding, Severity};
use super::ControllerKind;
use crate::device_health::DeviceHealthResult;
use crate::ips_analyzer::ThreatAnalysisResult;

/// The immutable result of one scheduler tick, handed to the renderer and
/// the delivery manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,

    /// The `since` watermark passed to the collector for this tick.
    pub period_start: DateTime<Utc>,
    /// Equal to `generated_at`.
    pub period_end: DateTime<Utc>,

    pub site: String,
    pub controller_kind: ControllerKind,

    pub findings: Vec<Finding>,
    pub ips_analysis: Option<ThreatAnalysisResult>,
    pub health_analysis: Option<DeviceHealthResult>,

    pub event_count: usize,
    pub ips_event_count: usize,
}

impl Report {
    /// Invariant: `period_start <= period_end <= generated_at`. Enforced
    /// by construction in `ReportBuilder`; this is a cheap spot-check
    /// usable from tests and from defensive callers.
    pub fn time_ordering_holds(&self) -> bool {
        self.period_start <= self.period_end && self.period_end <= self.generated_at
    }

    pub fn severe_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity == Severity::Severe).count()
    }

    pub fn medium_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity == Severity::Medium).count()
    }

    pub fn low_count(&self) -> usize {
        self.findings.iter().filter(|f| f.severity == Severity::Low).count()
    }

    /// `true` when the report has nothing to show — still delivered, as
    /// the user's confirmation that the daemon is alive.
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.ips_analysis.is_none() && self.health_analysis.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, h, 0, 0).unwrap()
    }

    fn sample(findings: Vec<Finding>) -> Report {
        Report {
            id: Uuid::nil(),
            generated_at: ts(2),
            period_start: ts(0),
            period_end: ts(2),
            site: "default".into(),
            controller_kind: ControllerKind::UdmLike,
            findings,
            ips_analysis: None,
            health_analysis: None,
            event_count: 0,
            ips_event_count: 0,
        }
    }

    #[test]
    fn empty_report_is_still_valid_and_flagged_empty() {
        let r = sample(vec![]);
        assert!(r.time_ordering_holds());
        assert!(r.is_empty());
        assert_eq!(r.severe_count(), 0);
    }
}
