//! AnalysisEngine: dispatches events through the [`RuleRegistry`]
//! and renders matched rules into unrendered, pre-dedup [`Finding`]s.

use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::Event;
use crate::domain::Finding;
use crate::metrics::METRICS;
use crate::rules::template;
use crate::rules::RuleRegistry;

pub struct AnalysisEngine {
    registry: RuleRegistry,
}

impl AnalysisEngine {
    pub fn new(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn with_builtin_rules() -> Self {
        Self::new(RuleRegistry::with_builtin_rules())
    }

    /// Analyze one event, returning a `Finding` per matching rule (usually
    /// zero or one). An event that matches no rule increments
    /// `unknown_event_types` and yields nothing — never an error.
    pub fn analyze(&self, event: &Event) -> Vec<Finding> {
        let Some(rules) = self.registry.lookup(&event.event_type) else {
            METRICS.inc_unknown_event_type();
            return Vec::new();
        };

        let values = placeholder_values(event);
        rules
            .iter()
            .map(|rule| {
                METRICS.inc_events_processed();
                Finding {
                    id: Uuid::new_v4(),
                    severity: rule.severity,
                    category: rule.category,
                    title: template::render(rule.title_template, &values),
                    description: template::render(rule.description_template, &values),
                    remediation: rule
                        .remediation_template
                        .map(|t| template::render(t, &values)),
                    source_event_ids: event_source_id(event).into_iter().collect(),
                    occurrence_count: 1,
                    first_seen: event.time,
                    last_seen: event.time,
                }
            })
            .collect()
    }

    /// Analyze a batch, returning the flattened list of findings.
    pub fn analyze_all<'a>(&self, events: impl IntoIterator<Item = &'a Event>) -> Vec<Finding> {
        events.into_iter().flat_map(|e| self.analyze(e)).collect()
    }
}

fn placeholder_values(event: &Event) -> HashMap<&str, String> {
    let mut values = HashMap::new();
    if let Some(name) = &event.device_name {
        values.insert("device_name", name.clone());
    }
    if let Some(mac) = &event.device_mac {
        values.insert("device_mac", mac.clone());
    }
    values.insert("event_type", event.event_type.clone());
    if let Some(src_ip) = event.attr_str("src_ip") {
        values.insert("src_ip", src_ip.to_string());
    }
    if let Some(port) = event.attr_str("port") {
        values.insert("port", port.to_string());
    }
    values
}

fn event_source_id(event: &Event) -> Option<String> {
    event
        .attrs
        .get("_id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| Some(format!("{}:{}", event.event_type, event.time.timestamp_micros())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_event(event_type: &str) -> Event {
        Event {
            event_type: event_type.to_string(),
            time: Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap(),
            device_mac: Some("aa:bb:cc:dd:ee:ff".into()),
            device_name: Some("ap-lobby".into()),
            message: None,
            attrs: HashMap::new(),
        }
    }

    #[test]
    fn known_event_produces_one_finding_with_substituted_placeholders() {
        let engine = AnalysisEngine::with_builtin_rules();
        let findings = engine.analyze(&sample_event("EVT_AP_Lost_Contact"));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].title.starts_with("[Connectivity]"));
        assert!(findings[0].description.contains("ap-lobby"));
        assert!(findings[0].description.ends_with("(EVT_AP_Lost_Contact)"));
        assert!(findings[0].remediation.is_some());
    }

    #[test]
    fn unknown_event_produces_no_finding() {
        let engine = AnalysisEngine::with_builtin_rules();
        assert!(engine.analyze(&sample_event("EVT_Totally_Unheard_Of")).is_empty());
    }

    #[test]
    fn low_severity_rule_has_no_remediation() {
        let engine = AnalysisEngine::with_builtin_rules();
        let findings = engine.analyze(&sample_event("EVT_WU_Connected"));
        assert_eq!(findings.len(), 1);
        assert!(findings[0].remediation.is_none());
    }

    #[test]
    fn missing_device_name_renders_as_unknown() {
        let engine = AnalysisEngine::with_builtin_rules();
        let mut event = sample_event("EVT_AP_Lost_Contact");
        event.device_name = None;
        let findings = engine.analyze(&event);
        assert!(findings[0].description.contains("Unknown"));
    }
}
