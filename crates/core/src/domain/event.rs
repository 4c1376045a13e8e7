//! A generic event polled from the controller's event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A generic controller-originated log record.
///
/// Read-only, produced by the collector and consumed by the analysis
/// engine and the finding store. No ownership beyond a single run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    /// Opaque controller event key, e.g. `"EVT_AP_Lost_Contact"`.
    pub event_type: String,

    /// When the controller recorded the event.
    pub time: DateTime<Utc>,

    /// Device MAC address, when the event is device-scoped.
    pub device_mac: Option<String>,

    /// Friendly device name, when known.
    pub device_name: Option<String>,

    /// Free-form human-readable message from the controller, if any.
    pub message: Option<String>,

    /// Raw controller attribute bag, kept for template rendering
    /// (`{src_ip}`, `{port}`, ...) and for forward compatibility with
    /// fields this type does not model explicitly.
    pub attrs: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Identity used by the dedup store: `(event_type, device_mac)`.
    /// System-scoped events (no device) use `None` as the second element.
    pub fn dedup_key(&self) -> (String, Option<String>) {
        (self.event_type.clone(), self.device_mac.clone())
    }

    /// Look up a string-valued attribute, falling back to `None` if absent
    /// or not a string.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(event_type: &str, mac: Option<&str>) -> Event {
        Event {
            event_type: event_type.to_string(),
            time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            device_mac: mac.map(|s| s.to_string()),
            device_name: None,
            message: None,
            attrs: HashMap::new(),
        }
    }

    #[test]
    fn dedup_key_distinguishes_devices() {
        let a = sample("EVT_AP_Lost_Contact", Some("aa:bb"));
        let b = sample("EVT_AP_Lost_Contact", Some("cc:dd"));
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn dedup_key_system_scope_is_none() {
        let a = sample("EVT_Backup_Created", None);
        assert_eq!(a.dedup_key(), ("EVT_Backup_Created".to_string(), None));
    }
}
