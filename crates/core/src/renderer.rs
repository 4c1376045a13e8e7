//! Renderer: produces `(html_bytes, text_bytes)` from a [`Report`]
//! via `tera`.
//!
//! Timezone conversion happens only here, at render time — every other
//! component works exclusively in UTC. All display logic (badge
//! classes, recurring tags, conditional sections) is precomputed into a
//! small set of view structs before the templates ever see the data, so
//! the templates themselves stay "strict lookup with explicit
//! conditionals" rather than growing their own business logic.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tera::{Context, Tera};

use crate::device_health::{DeviceHealthFinding, DeviceHealthResult, DeviceHealthStatus, HealthDimension};
use crate::domain::{Category, Finding, Report, Severity};
use crate::error::{Result, ScannerError};
use crate::ips_analyzer::ThreatAnalysisResult;

const HTML_TEMPLATE: &str = include_str!("../templates/report.html.tera");
const TEXT_TEMPLATE: &str = include_str!("../templates/report.txt.tera");

/// Tooltip shown for the cybersecure badge; the only other piece of
/// text a badge is allowed to carry.
const CYBERSECURE_TOOLTIP: &str = "Detected by CyberSecure enhanced signatures";

#[derive(Debug, Clone, Serialize)]
struct FindingView {
    title: String,
    description: String,
    category_label: String,
    badge_class: String,
    severity_label: String,
    remediation: Option<String>,
    occurrence_summary: String,
    first_seen: String,
    last_seen: String,
}

#[derive(Debug, Clone, Serialize)]
struct ThreatView {
    category: String,
    description: String,
    count: u32,
    badge_class: String,
    severity_label: String,
    sample_signature: String,
    source_ips: Vec<String>,
    remediation: Option<String>,
    cybersecure_tooltip: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct IpAggregateView {
    ip: String,
    count: u32,
    scope_label: String,
    sample_signatures: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct IpsView {
    blocked_threats: Vec<ThreatView>,
    detected_threats: Vec<ThreatView>,
    ip_aggregates: Vec<IpAggregateView>,
    detection_mode_note: Option<String>,
    total_events: usize,
    cybersecure_events: usize,
}

#[derive(Debug, Clone, Serialize)]
struct DeviceHealthFindingView {
    device_name: String,
    dimension_label: String,
    badge_class: String,
    current: String,
    threshold: String,
    remediation: String,
}

#[derive(Debug, Clone, Serialize)]
struct DeviceSummaryView {
    name: String,
    badge_class: String,
    status_label: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthView {
    critical: Vec<DeviceHealthFindingView>,
    warning: Vec<DeviceHealthFindingView>,
    device_summaries: Vec<DeviceSummaryView>,
}

#[derive(Debug, Clone, Serialize)]
struct ReportView {
    site: String,
    controller_kind: String,
    generated_at: String,
    period_start: String,
    period_end: String,
    severe_count: usize,
    medium_count: usize,
    low_count: usize,
    event_count: usize,
    ips_event_count: usize,
    is_empty: bool,
    findings: Vec<FindingView>,
    ips: Option<IpsView>,
    health: Option<HealthView>,
}

/// Renders reports into HTML and plain-text bytes using a fixed IANA
/// timezone, resolved once at construction.
pub struct Renderer {
    tera: Tera,
    tz: Tz,
}

impl Renderer {
    /// `timezone` must be a valid IANA zone name; invalid values are a
    /// configuration error, not a render-time failure.
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ScannerError::Config(format!("unknown IANA timezone: {timezone}")))?;

        let mut tera = Tera::default();
        tera.add_raw_templates(vec![("report.html", HTML_TEMPLATE), ("report.txt", TEXT_TEMPLATE)])
            .map_err(|e| ScannerError::Config(format!("failed to load report templates: {e}")))?;

        Ok(Self { tera, tz })
    }

    pub fn render(&self, report: &Report) -> Result<(Vec<u8>, Vec<u8>)> {
        let view = self.build_view(report);
        let ctx = Context::from_serialize(&view)
            .map_err(|e| ScannerError::Parse(format!("failed to build render context: {e}")))?;

        let html = self
            .tera
            .render("report.html", &ctx)
            .map_err(|e| ScannerError::Parse(format!("failed to render HTML report: {e}")))?;
        let text = self
            .tera
            .render("report.txt", &ctx)
            .map_err(|e| ScannerError::Parse(format!("failed to render text report: {e}")))?;

        Ok((html.into_bytes(), text.into_bytes()))
    }

    fn local(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format("%Y-%m-%d %H:%M:%S %Z").to_string()
    }

    fn build_view(&self, report: &Report) -> ReportView {
        let findings = report.findings.iter().map(|f| self.finding_view(f)).collect();
        let ips = report.ips_analysis.as_ref().map(|a| self.ips_view(a));
        let health = report.health_analysis.as_ref().map(|h| health_view(h));

        ReportView {
            site: report.site.clone(),
            controller_kind: format!("{:?}", report.controller_kind),
            generated_at: self.local(report.generated_at),
            period_start: self.local(report.period_start),
            period_end: self.local(report.period_end),
            severe_count: report.severe_count(),
            medium_count: report.medium_count(),
            low_count: report.low_count(),
            event_count: report.event_count,
            ips_event_count: report.ips_event_count,
            is_empty: report.is_empty(),
            findings,
            ips,
            health,
        }
    }

    fn finding_view(&self, f: &Finding) -> FindingView {
        let mut occurrence_summary = format!(
            "seen {} time{}",
            f.occurrence_count,
            if f.occurrence_count == 1 { "" } else { "s" }
        );
        if f.recurring() {
            occurrence_summary.push_str(" — Recurring Issue");
        }

        FindingView {
            title: f.title.clone(),
            description: f.description.clone(),
            category_label: category_label(f.category),
            badge_class: severity_badge_class(f.severity),
            severity_label: severity_label(f.severity),
            remediation: remediation_for(f.severity, &f.remediation),
            occurrence_summary,
            first_seen: self.local(f.first_seen),
            last_seen: self.local(f.last_seen),
        }
    }

    fn ips_view(&self, a: &ThreatAnalysisResult) -> IpsView {
        IpsView {
            blocked_threats: a.blocked_threats.iter().map(threat_view).collect(),
            detected_threats: a.detected_threats.iter().map(threat_view).collect(),
            ip_aggregates: a
                .ip_aggregates
                .iter()
                .map(|agg| IpAggregateView {
                    ip: agg.ip.clone(),
                    count: agg.count,
                    scope_label: if agg.internal { "internal".to_string() } else { "external".to_string() },
                    sample_signatures: agg.sample_signatures.clone(),
                })
                .collect(),
            detection_mode_note: a.detection_mode_note.clone(),
            total_events: a.total_events,
            cybersecure_events: a.cybersecure_events,
        }
    }
}

fn category_label(category: Category) -> String {
    match category {
        Category::Security => "Security",
        Category::Connectivity => "Connectivity",
        Category::Performance => "Performance",
        Category::System => "System",
        Category::DeviceHealth => "Device Health",
        Category::Uncategorized => "Uncategorized",
    }
    .to_string()
}

fn severity_label(severity: Severity) -> String {
    match severity {
        Severity::Severe => "Severe",
        Severity::Medium => "Medium",
        Severity::Low => "Low",
    }
    .to_string()
}

/// Badge class: severe = red, medium = amber, low = neutral.
/// `blocked`/`cybersecure` are separate badges, not severity badges, and
/// are applied only to IPS threat summaries (see [`threat_view`]).
fn severity_badge_class(severity: Severity) -> String {
    match severity {
        Severity::Severe => "badge-red",
        Severity::Medium => "badge-amber",
        Severity::Low => "badge-neutral",
    }
    .to_string()
}

/// Remediation box is rendered only for `severity ∈ {severe, medium}`.
fn remediation_for(severity: Severity, remediation: &Option<String>) -> Option<String> {
    match severity {
        Severity::Severe | Severity::Medium => remediation.clone(),
        Severity::Low => None,
    }
}

fn threat_view(t: &crate::domain::ThreatSummary) -> ThreatView {
    ThreatView {
        category: t.category.clone(),
        description: t.description.clone(),
        count: t.count,
        badge_class: severity_badge_class(t.severity),
        severity_label: severity_label(t.severity),
        sample_signature: t.sample_signature.clone(),
        source_ips: t.source_ips.clone(),
        remediation: remediation_for(t.severity, &t.remediation),
        cybersecure_tooltip: t.is_cybersecure.then(|| CYBERSECURE_TOOLTIP.to_string()),
    }
}

fn health_view(h: &DeviceHealthResult) -> HealthView {
    HealthView {
        critical: h.critical.iter().map(device_health_finding_view).collect(),
        warning: h.warning.iter().map(device_health_finding_view).collect(),
        device_summaries: h
            .device_summaries
            .iter()
            .map(|s| DeviceSummaryView {
                name: s.name.clone(),
                badge_class: device_health_badge_class(s.status),
                status_label: device_health_status_label(s.status),
            })
            .collect(),
    }
}

fn device_health_finding_view(f: &DeviceHealthFinding) -> DeviceHealthFindingView {
    DeviceHealthFindingView {
        device_name: f.device_name.clone(),
        dimension_label: dimension_label(f.dimension),
        badge_class: device_health_badge_class(f.status),
        current: format!("{:.1}", f.current),
        threshold: format!("{:.1}", f.threshold),
        remediation: f.remediation.clone(),
    }
}

fn dimension_label(dimension: HealthDimension) -> String {
    match dimension {
        HealthDimension::Temperature => "Temperature",
        HealthDimension::Cpu => "CPU",
        HealthDimension::Memory => "Memory",
        HealthDimension::Uptime => "Uptime",
    }
    .to_string()
}

fn device_health_badge_class(status: DeviceHealthStatus) -> String {
    match status {
        DeviceHealthStatus::Critical => "badge-red",
        DeviceHealthStatus::Warning => "badge-amber",
        DeviceHealthStatus::Healthy => "badge-neutral",
    }
    .to_string()
}

fn device_health_status_label(status: DeviceHealthStatus) -> String {
    match status {
        DeviceHealthStatus::Critical => "Critical",
        DeviceHealthStatus::Warning => "Warning",
        DeviceHealthStatus::Healthy => "Healthy",
    }
    .to_string()
}
