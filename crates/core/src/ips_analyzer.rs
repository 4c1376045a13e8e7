//! IPSAnalyzer: groups raw IPS events into threat summaries and a
//! separate source-IP aggregation.

use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::domain::{IPSEvent, Severity, ThreatSummary};
use crate::metrics::METRICS;
use crate::rules::template;

/// Source-IP aggregate over the raw event stream, independent of the
/// signature-grouped threat summaries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpAggregate {
    pub ip: String,
    pub count: u32,
    pub internal: bool,
    pub category_breakdown: BTreeMap<String, u32>,
    pub sample_signatures: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreatAnalysisResult {
    pub blocked_threats: Vec<ThreatSummary>,
    pub detected_threats: Vec<ThreatSummary>,
    pub ip_aggregates: Vec<IpAggregate>,
    pub detection_mode_note: Option<String>,
    pub total_events: usize,
    pub cybersecure_events: usize,
}

impl ThreatAnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.blocked_threats.is_empty() && self.detected_threats.is_empty()
    }
}

pub struct IPSAnalyzer {
    /// Minimum event count for a source IP to appear in `ip_aggregates`.
    ip_aggregate_threshold: u32,
}

impl Default for IPSAnalyzer {
    fn default() -> Self {
        Self {
            ip_aggregate_threshold: 10,
        }
    }
}

impl IPSAnalyzer {
    pub fn new(ip_aggregate_threshold: u32) -> Self {
        Self {
            ip_aggregate_threshold,
        }
    }

    pub fn analyze(&self, events: &[IPSEvent]) -> ThreatAnalysisResult {
        for _ in events {
            METRICS.inc_ips_events_processed();
        }

        let mut groups: HashMap<&str, Vec<&IPSEvent>> = HashMap::new();
        for event in events {
            groups.entry(event.signature.as_str()).or_default().push(event);
        }

        let mut blocked_threats = Vec::new();
        let mut detected_threats = Vec::new();
        for group in groups.values() {
            let summary = summarize_group(group);
            if group.iter().any(|e| e.blocked()) {
                blocked_threats.push(summary);
            } else {
                detected_threats.push(summary);
            }
        }

        // HashMap iteration order is per-process random; sort both vectors
        // into a total order so identical input always renders identically.
        sort_threats(&mut blocked_threats);
        sort_threats(&mut detected_threats);

        let detection_mode_note = if !events.is_empty() && events.iter().all(|e| !e.blocked()) {
            Some("IPS is in detection mode; threats are logged but not blocked.".to_string())
        } else {
            None
        };

        ThreatAnalysisResult {
            blocked_threats,
            detected_threats,
            ip_aggregates: self.aggregate_by_ip(events),
            detection_mode_note,
            total_events: events.len(),
            cybersecure_events: events.iter().filter(|e| e.cybersecure()).count(),
        }
    }

    fn aggregate_by_ip(&self, events: &[IPSEvent]) -> Vec<IpAggregate> {
        let mut by_ip: HashMap<&str, Vec<&IPSEvent>> = HashMap::new();
        for event in events {
            by_ip.entry(event.src_ip.as_str()).or_default().push(event);
        }

        let mut aggregates: Vec<IpAggregate> = by_ip
            .into_iter()
            .filter(|(_, evts)| evts.len() as u32 >= self.ip_aggregate_threshold)
            .map(|(ip, evts)| {
                let mut category_breakdown: BTreeMap<String, u32> = BTreeMap::new();
                let mut sample_signatures = Vec::new();
                for e in &evts {
                    let (_, friendly) = parse_signature(&e.signature);
                    *category_breakdown.entry(friendly.to_string()).or_insert(0) += 1;
                    if !sample_signatures.contains(&e.signature) && sample_signatures.len() < 3 {
                        sample_signatures.push(e.signature.clone());
                    }
                }
                IpAggregate {
                    ip: ip.to_string(),
                    count: evts.len() as u32,
                    internal: is_internal(ip),
                    category_breakdown,
                    sample_signatures,
                }
            })
            .collect();
        aggregates.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.ip.cmp(&b.ip)));
        aggregates
    }
}

/// Total order for threat summaries: severity desc, then category and
/// sample signature asc, so ties between identically-severe categories
/// resolve the same way on every run.
fn sort_threats(threats: &mut [ThreatSummary]) {
    threats.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.sample_signature.cmp(&b.sample_signature))
    });
}

fn summarize_group(group: &[&IPSEvent]) -> ThreatSummary {
    let representative = group[0];
    let (category_code, friendly) = parse_signature(&representative.signature);
    let severity = severity_from_raw(group.iter().map(|e| e.severity.0).min().unwrap_or(3));

    let mut source_ips: Vec<String> = Vec::new();
    for e in group {
        if !source_ips.contains(&e.src_ip) {
            source_ips.push(e.src_ip.clone());
        }
    }

    let cybersecure_count = group.iter().filter(|e| e.cybersecure()).count() as u32;

    let remediation = if severity == Severity::Low {
        None
    } else {
        remediation_template(category_code).map(|tmpl| {
            let mut values = HashMap::new();
            values.insert("src_ip", representative.src_ip.clone());
            values.insert("dest_ip", representative.dst_ip.clone());
            values.insert("signature", representative.signature.clone());
            template::render(tmpl, &values)
        })
    };

    ThreatSummary {
        category: friendly.to_string(),
        description: format!("{} activity observed ({} events)", friendly, group.len()),
        count: group.len() as u32,
        severity,
        sample_signature: representative.signature.clone(),
        source_ips,
        remediation,
        is_cybersecure: cybersecure_count > 0,
        cybersecure_count,
    }
}

/// `1 -> severe`, `2 -> medium`, `>= 3 -> low`.
fn severity_from_raw(raw: u8) -> Severity {
    match raw {
        1 => Severity::Severe,
        2 => Severity::Medium,
        _ => Severity::Low,
    }
}

/// Parse a signature of the shape `ET <CATEGORY> <description>`, returning
/// the raw category code and its friendly name. Unparseable signatures
/// classify as `("UNKNOWN", "Security Event")`.
fn parse_signature(signature: &str) -> (&'static str, &'static str) {
    let mut parts = signature.splitn(3, ' ');
    let prefix = parts.next().unwrap_or("");
    let category = parts.next().unwrap_or("");
    if prefix != "ET" || category.is_empty() {
        return ("UNKNOWN", "Security Event");
    }
    for (code, friendly) in CATEGORY_TABLE {
        if *code == category {
            return (code, friendly);
        }
    }
    ("UNKNOWN", "Security Event")
}

/// ~24-entry fixed mapping from ET signature category code to a
/// human-readable name, per the category table used across the ET Open
/// and ET Pro rulesets.
static CATEGORY_TABLE: &[(&str, &str)] = &[
    ("SCAN", "Reconnaissance"),
    ("MALWARE", "Malware Activity"),
    ("POLICY", "Policy Violation"),
    ("TROJAN", "Trojan Activity"),
    ("DOS", "Denial of Service"),
    ("PHISHING", "Phishing Attempt"),
    ("TOR", "TOR Network Traffic"),
    ("P2P", "Peer-to-Peer Traffic"),
    ("ATTACK_RESPONSE", "Attack Response"),
    ("CNC", "Command and Control"),
    ("COINMINER", "Cryptomining Activity"),
    ("CURRENT_EVENTS", "Current Event Campaign"),
    ("DNS", "DNS Anomaly"),
    ("EXPLOIT", "Exploit Attempt"),
    ("EXPLOIT_KIT", "Exploit Kit Activity"),
    ("HUNTING", "Threat Hunting Match"),
    ("INFO", "Informational"),
    ("MOBILE_MALWARE", "Mobile Malware"),
    ("NETBIOS", "NetBIOS Anomaly"),
    ("SCADA", "Industrial Control System Traffic"),
    ("SHELLCODE", "Shellcode Detected"),
    ("USER_AGENTS", "Suspicious User Agent"),
    ("WEB_SERVER", "Web Server Attack"),
    ("WORM", "Worm Activity"),
];

fn remediation_template(category_code: &str) -> Option<&'static str> {
    match category_code {
        "MALWARE" | "TROJAN" | "COINMINER" | "MOBILE_MALWARE" | "WORM" => Some(
            "1. Isolate {src_ip} from the rest of the network.\n\
             2. Run an endpoint scan on the host matching {src_ip}.\n\
             3. Confirm the signature {signature} against current threat intelligence before reconnecting the host.",
        ),
        "CNC" | "ATTACK_RESPONSE" => Some(
            "1. Block outbound traffic from {src_ip} to {dest_ip} at the firewall.\n\
             2. Investigate the host at {src_ip} for compromise.",
        ),
        "EXPLOIT" | "EXPLOIT_KIT" | "SHELLCODE" => Some(
            "1. Patch the service targeted by {signature} on {dest_ip}.\n\
             2. Review logs on {dest_ip} for signs of successful exploitation.",
        ),
        "DOS" => Some("Identify whether {src_ip} is part of a legitimate load spike or an attack, and rate-limit or block accordingly."),
        "PHISHING" => Some("Confirm whether the host at {src_ip} reached a known phishing destination and, if so, notify the affected user."),
        "TOR" => Some("Confirm whether TOR usage from {src_ip} is expected policy on this network; block if not."),
        "SCAN" | "HUNTING" => Some("Confirm {src_ip} is an expected scanner (vulnerability management, monitoring) or block it."),
        "POLICY" | "P2P" => Some("Review acceptable-use policy with the owner of {src_ip}."),
        _ => Some("Review the event involving {src_ip} and {dest_ip} matching signature {signature}."),
    }
}

/// RFC1918 (IPv4 private) / RFC4193 (IPv6 unique local, `fc00::/7`)
/// membership, via [`ipnet`]'s containment checks rather than hand-rolled
/// bit arithmetic.
fn is_internal(ip: &str) -> bool {
    let Ok(addr) = ip.parse::<IpAddr>() else {
        return false;
    };
    match addr {
        IpAddr::V4(v4) => v4.is_private(),
        IpAddr::V6(v6) => {
            static ULA: std::sync::OnceLock<ipnet::Ipv6Net> = std::sync::OnceLock::new();
            let ula = ULA.get_or_init(|| {
                "fc00::/7"
                    .parse::<ipnet::Ipv6Net>()
                    .expect("fc00::/7 is a valid IPv6 network literal")
            });
            ula.contains(&v6)
        }
    }
}
