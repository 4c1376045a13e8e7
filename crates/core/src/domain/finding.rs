//! The analysis engine's output atom: one actionable, de-duplicated issue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Finding occurrence count at or above which a finding is tagged
/// "recurring" (display only, never a severity escalation).
pub const RECURRING_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Security,
    Connectivity,
    Performance,
    System,
    DeviceHealth,
    Uncategorized,
}

/// A categorized, severity-bearing, human-readable observation derived
/// from one or more events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub id: Uuid,
    pub severity: Severity,
    pub category: Category,
    pub title: String,
    pub description: String,
    pub remediation: Option<String>,

    /// Opaque event ids (or synthetic ids, for analyzers that do not carry
    /// one) that contributed to this finding.
    pub source_event_ids: Vec<String>,

    pub occurrence_count: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Finding {
    /// `true` iff the finding has recurred at least [`RECURRING_THRESHOLD`]
    /// times within its dedup window. Derived, never stored.
    pub fn recurring(&self) -> bool {
        self.occurrence_count >= RECURRING_THRESHOLD
    }
}
