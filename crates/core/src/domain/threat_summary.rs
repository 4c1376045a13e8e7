//! Output aggregate produced by the IPS analyzer.

use serde::{Deserialize, Serialize};

use super::finding::Severity;

/// One aggregated threat, grouped by raw signature string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreatSummary {
    /// Friendly category name, e.g. `"Reconnaissance"`.
    pub category: String,
    pub description: String,
    pub count: u32,
    pub severity: Severity,
    /// A representative signature string from the constituent group.
    pub sample_signature: String,
    /// Deduplicated source IPs across the constituent group.
    pub source_ips: Vec<String>,
    pub remediation: Option<String>,

    /// `true` iff any constituent event is ET Pro (Cybersecure) attributed.
    pub is_cybersecure: bool,
    /// `0 <= cybersecure_count <= count`.
    pub cybersecure_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_cybersecure_matches_count_invariant() {
        let s = ThreatSummary {
            category: "Malware Activity".into(),
            description: "malware traffic".into(),
            count: 3,
            severity: Severity::Severe,
            sample_signature: "ET MALWARE X".into(),
            source_ips: vec!["10.0.0.1".into()],
            remediation: Some("Isolate host.".into()),
            is_cybersecure: true,
            cybersecure_count: 1,
        };
        assert_eq!(s.is_cybersecure, s.cybersecure_count > 0);
        assert!(s.cybersecure_count <= s.count);
    }
}
