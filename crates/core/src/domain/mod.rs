//! Domain models for the scanner daemon.
//!
//! Canonical definitions for the core value types described in the data
//! model: `Event` and `IPSEvent` (input), `Finding` and `ThreatSummary`
//! (output atoms), `DeviceStats` (input), `Report` (output root) and
//! `RunState` (the only type with on-disk identity).

pub mod device_stats;
pub mod event;
pub mod finding;
pub mod ips_event;
pub mod report;
pub mod run_state;
pub mod threat_summary;

pub use device_stats::{DeviceStats, DeviceType};
pub use event::Event;
pub use finding::{Category, Finding, Severity};
pub use ips_event::{IPSEvent, ET_PRO_SID_MAX, ET_PRO_SID_MIN};
pub use report::Report;
pub use run_state::RunState;
pub use threat_summary::ThreatSummary;

/// The controller flavour, detected once per session by [`crate::controller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    /// UDM/UDM-Pro style appliance, port 443.
    UdmLike,
    /// Self-hosted "UniFi Network Application", port 8443.
    SelfHosted,
    /// UniFi OS Server, port 11443.
    OsServer,
}

impl ControllerKind {
    /// The fixed probe port for this controller flavour.
    pub fn port(self) -> u16 {
        match self {
            ControllerKind::UdmLike => 443,
            ControllerKind::SelfHosted => 8443,
            ControllerKind::OsServer => 11443,
        }
    }

    /// Classify a successfully-probed port into a controller flavour.
    ///
    /// Returns `None` for any port outside the fixed probe order
    /// {443, 8443, 11443}.
    pub fn from_port(port: u16) -> Option<Self> {
        match port {
            443 => Some(ControllerKind::UdmLike),
            8443 => Some(ControllerKind::SelfHosted),
            11443 => Some(ControllerKind::OsServer),
            _ => None,
        }
    }

    /// The login path for this controller flavour.
    pub fn login_path(self) -> &'static str {
        match self {
            ControllerKind::UdmLike | ControllerKind::OsServer => "/api/auth/login",
            ControllerKind::SelfHosted => "/api/login",
        }
    }

    /// Whether API paths are proxied under `/proxy/network` (udm_like,
    /// os_server) or served directly at `/api` (self_hosted).
    pub fn proxied(self) -> bool {
        !matches!(self, ControllerKind::SelfHosted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_order_maps_to_kind() {
        assert_eq!(ControllerKind::from_port(443), Some(ControllerKind::UdmLike));
        assert_eq!(ControllerKind::from_port(8443), Some(ControllerKind::SelfHosted));
        assert_eq!(ControllerKind::from_port(11443), Some(ControllerKind::OsServer));
        assert_eq!(ControllerKind::from_port(80), None);
    }

    #[test]
    fn login_path_depends_on_kind() {
        assert_eq!(ControllerKind::UdmLike.login_path(), "/api/auth/login");
        assert_eq!(ControllerKind::OsServer.login_path(), "/api/auth/login");
        assert_eq!(ControllerKind::SelfHosted.login_path(), "/api/login");
    }
}
