//! FindingStore: merges findings keyed by `(event_type, device_mac)`
//! within a sliding window.
//!
//! The merge key is carried alongside the `Finding` rather than inferred
//! from it, because `Finding` itself does not retain the originating event
//! type once rendered — only the analysis engine knows it.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{Finding, Severity};
use crate::metrics::METRICS;

/// Default merge window: findings for the same key within one hour
/// of each other are merged into a single occurrence count.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(3600);

type Key = (String, Option<String>);

pub struct FindingStore {
    window: chrono::Duration,
    entries: HashMap<Key, Finding>,
}

impl Default for FindingStore {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl FindingStore {
    pub fn new(window: Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window).unwrap_or(chrono::Duration::hours(1)),
            entries: HashMap::new(),
        }
    }

    /// Add a finding, merging it into an existing entry with the same
    /// `(event_type, device_mac)` key if one exists within the window.
    pub fn add(&mut self, event_type: &str, device_mac: Option<&str>, at: DateTime<Utc>, finding: Finding) {
        let key: Key = (event_type.to_string(), device_mac.map(str::to_string));

        if let Some(existing) = self.entries.get_mut(&key) {
            if (at - existing.last_seen).abs() <= self.window {
                existing.occurrence_count += 1;
                if at > existing.last_seen {
                    existing.last_seen = at;
                }
                for id in finding.source_event_ids {
                    if !existing.source_event_ids.contains(&id) {
                        existing.source_event_ids.push(id);
                    }
                }
                return;
            }
        }

        METRICS.inc_findings_emitted();
        self.entries.insert(key, finding);
    }

    /// All findings, sorted by severity descending then `last_seen`
    /// descending, ready for report assembly. `title` breaks ties so the
    /// order is total and independent of the backing map's hash iteration.
    pub fn into_sorted_findings(self) -> Vec<Finding> {
        let mut findings: Vec<Finding> = self.entries.into_values().collect();
        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.last_seen.cmp(&a.last_seen))
                .then_with(|| a.title.cmp(&b.title))
        });
        findings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
