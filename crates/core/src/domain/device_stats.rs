//! Polled device health statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Ap,
    Switch,
    Gateway,
    Udm,
    Unknown,
}

/// Snapshot of a single device's health metrics at poll time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceStats {
    pub mac: String,
    pub name: String,
    pub model: String,
    pub device_type: DeviceType,

    /// 0.0-100.0, when reported.
    pub cpu_pct: Option<f64>,
    /// 0.0-100.0, when reported.
    pub mem_pct: Option<f64>,
    pub uptime_seconds: Option<u64>,
    /// Normalized to Celsius.
    pub temperature_c: Option<f64>,

    pub poe_budget_w: Option<f64>,
    pub poe_used_w: Option<f64>,

    pub state: String,
    pub last_seen: DateTime<Utc>,
}

impl DeviceStats {
    /// Derived from `uptime_seconds`; `None` when uptime is unknown.
    pub fn uptime_days(&self) -> Option<f64> {
        self.uptime_seconds.map(|s| s as f64 / 86_400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(uptime_seconds: Option<u64>) -> DeviceStats {
        DeviceStats {
            mac: "aa:bb:cc:dd:ee:ff".into(),
            name: "ap-lobby".into(),
            model: "U6-Pro".into(),
            device_type: DeviceType::Ap,
            cpu_pct: Some(12.0),
            mem_pct: Some(30.0),
            uptime_seconds,
            temperature_c: Some(45.0),
            poe_budget_w: None,
            poe_used_w: None,
            state: "connected".into(),
            last_seen: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn uptime_days_derived_from_seconds() {
        let d = sample(Some(864_000));
        assert_eq!(d.uptime_days(), Some(10.0));
    }

    #[test]
    fn uptime_days_none_when_unknown() {
        assert_eq!(sample(None).uptime_days(), None);
    }
}
