//! An IPS (intrusion detection/prevention) event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound (inclusive) of the ET Pro / Cybersecure signature ID range.
pub const ET_PRO_SID_MIN: u64 = 2_800_000;
/// Upper bound (inclusive) of the ET Pro / Cybersecure signature ID range.
pub const ET_PRO_SID_MAX: u64 = 2_899_999;

/// Controller-reported severity. `1` is the highest severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawSeverity(pub u8);

/// An intrusion-detection record with a signature, a source/destination IP
/// tuple, and an action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IPSEvent {
    /// Opaque controller-assigned id.
    pub id: String,

    /// When the controller recorded the event.
    pub time: DateTime<Utc>,

    pub src_ip: String,
    pub src_port: Option<u16>,
    pub dst_ip: String,
    pub dst_port: Option<u16>,

    /// L4 protocol name, e.g. `"tcp"`.
    pub protocol: String,

    /// Raw signature string, e.g. `"ET SCAN Nmap"`.
    pub signature: String,

    /// Numeric signature id, used to attribute ET Pro (Cybersecure).
    pub signature_id: u64,

    /// Raw category name as reported by the controller (not the friendly
    /// name computed by the IPS analyzer).
    pub category: String,

    /// Controller-reported severity, 1 (high) to 3 (low).
    pub severity: RawSeverity,

    /// Raw action string, e.g. `"blocked"`, `"allowed"`.
    pub action: String,
}

impl IPSEvent {
    /// `true` iff the action indicates the IPS blocked the traffic.
    /// Case-insensitive set membership over `{"blocked", "drop", "reject"}`.
    pub fn blocked(&self) -> bool {
        matches!(
            self.action.to_ascii_lowercase().as_str(),
            "blocked" | "drop" | "reject"
        )
    }

    /// `true` iff the signature id falls in the ET Pro (Cybersecure) range.
    /// Attribution is purely a function of signature id.
    pub fn cybersecure(&self) -> bool {
        (ET_PRO_SID_MIN..=ET_PRO_SID_MAX).contains(&self.signature_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(signature_id: u64, action: &str) -> IPSEvent {
        IPSEvent {
            id: "evt-1".into(),
            time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            src_ip: "10.0.0.5".into(),
            src_port: Some(4444),
            dst_ip: "1.2.3.4".into(),
            dst_port: Some(80),
            protocol: "tcp".into(),
            signature: "ET SCAN Nmap".into(),
            signature_id,
            category: "SCAN".into(),
            severity: RawSeverity(2),
            action: action.to_string(),
        }
    }

    #[test]
    fn blocked_is_case_insensitive_set_membership() {
        assert!(sample(1, "Blocked").blocked());
        assert!(sample(1, "DROP").blocked());
        assert!(sample(1, "reject").blocked());
        assert!(!sample(1, "allowed").blocked());
        assert!(!sample(1, "detected").blocked());
    }

    #[test]
    fn cybersecure_boundary_below_range() {
        assert!(!sample(2_799_999, "allowed").cybersecure());
    }

    #[test]
    fn cybersecure_boundary_inclusive_lower() {
        assert!(sample(2_800_000, "allowed").cybersecure());
    }

    #[test]
    fn cybersecure_boundary_inclusive_upper() {
        assert!(sample(2_899_999, "allowed").cybersecure());
    }

    #[test]
    fn cybersecure_boundary_above_range() {
        assert!(!sample(2_900_000, "allowed").cybersecure());
    }
}
