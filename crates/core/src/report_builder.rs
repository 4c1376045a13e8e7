//! ReportBuilder: assembles the immutable [`Report`] for one tick.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::device_health::DeviceHealthResult;
use crate::domain::{ControllerKind, Finding, Report};
use crate::ips_analyzer::ThreatAnalysisResult;

pub struct ReportBuilder {
    site: String,
    controller_kind: ControllerKind,
}

impl ReportBuilder {
    pub fn new(site: impl Into<String>, controller_kind: ControllerKind) -> Self {
        Self {
            site: site.into(),
            controller_kind,
        }
    }

    /// `since` is the watermark passed to the collector for this tick;
    /// `generated_at` is both `period_end` and the report's own timestamp.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        since: DateTime<Utc>,
        generated_at: DateTime<Utc>,
        findings: Vec<Finding>,
        ips_analysis: Option<ThreatAnalysisResult>,
        health_analysis: Option<DeviceHealthResult>,
        event_count: usize,
        ips_event_count: usize,
    ) -> Report {
        Report {
            id: Uuid::new_v4(),
            generated_at,
            period_start: since,
            period_end: generated_at,
            site: self.site.clone(),
            controller_kind: self.controller_kind,
            findings,
            ips_analysis,
            health_analysis,
            event_count,
            ips_event_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn builds_report_with_consistent_time_ordering() {
        let builder = ReportBuilder::new("default", ControllerKind::UdmLike);
        let report = builder.build(ts(0), ts(1), Vec::new(), None, None, 0, 0);
        assert!(report.time_ordering_holds());
        assert_eq!(report.site, "default");
        assert!(report.is_empty());
    }
}
