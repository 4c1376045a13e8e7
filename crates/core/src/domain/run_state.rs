//! Persistent checkpoint schema written to disk between ticks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written to `.last_run.json`. Bump only on breaking
/// schema changes; the state store treats any other value as a decode
/// failure and degrades to "first run".
pub const SCHEMA_VERSION: &str = "1.0";

/// The daemon's sole persistent artifact. The process exclusively owns
/// this on disk; see [`crate::state_store`] for read/write semantics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunState {
    pub schema_version: String,

    /// Timezone-aware UTC instant of the last successful delivery.
    pub last_successful_run: DateTime<Utc>,

    /// Recorded for forward compatibility; never consulted by any
    /// decision in this daemon.
    pub last_report_count: Option<usize>,
}

impl RunState {
    pub fn new(last_successful_run: DateTime<Utc>, last_report_count: usize) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            last_successful_run,
            last_report_count: Some(last_report_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn json_roundtrip_preserves_microseconds() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 24, 14, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let state = RunState::new(ts, 3);
        let json = serde_json::to_string(&state).unwrap();
        let back: RunState = serde_json::from_str(&json).unwrap();
        assert_eq!(back.last_successful_run, ts);
        assert_eq!(back.last_report_count, Some(3));
        assert_eq!(back.schema_version, SCHEMA_VERSION);
    }
}
