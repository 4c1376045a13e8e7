//! The built-in rule table.
//!
//! Event-type keys follow the controller's own `EVT_<Subsystem>_<Name>`
//! convention. Extending coverage is a matter of appending a `Rule` here;
//! nothing else in the engine needs to change.

use super::Rule;
use crate::domain::{Category, Severity};

pub static RULES: &[Rule] = &[
    // --- security ---------------------------------------------------
    Rule {
        event_types: &["EVT_Admin_Login_Failed"],
        category: Category::Security,
        severity: Severity::Severe,
        title_template: "[Security] Failed admin login attempt",
        description_template: "An administrator login attempt failed for {device_name} (EVT_Admin_Login_Failed)",
        remediation_template: Some(
            "1. Confirm the attempt was not an authorized administrator mistyping credentials.\n\
             2. If unrecognized, rotate the admin password and review the audit log for related attempts.\n\
             3. Consider restricting controller access to a management VLAN or VPN.",
        ),
    },
    Rule {
        event_types: &["EVT_WU_RogueAP", "EVT_AP_RogueAP"],
        category: Category::Security,
        severity: Severity::Severe,
        title_template: "[Security] Rogue access point detected",
        description_template: "A rogue access point was detected near {device_name} (EVT_WU_RogueAP)",
        remediation_template: Some(
            "1. Identify the physical location and owner of the rogue AP.\n\
             2. Verify whether it is a neighboring network or an unauthorized device on this site.\n\
             3. If unauthorized, have it physically removed or request the channel be moved to reduce interference.",
        ),
    },
    Rule {
        event_types: &["EVT_IPS_IpsAlert"],
        category: Category::Security,
        severity: Severity::Severe,
        title_template: "[Security] Intrusion detection alert",
        description_template: "The intrusion prevention system raised an alert involving {src_ip} (EVT_IPS_IpsAlert)",
        remediation_template: Some(
            "1. Review the related entry in the IPS threat summary for the matched signature.\n\
             2. Confirm whether the source host is expected to be present on this network.\n\
             3. Isolate or block the host if the activity cannot be explained.",
        ),
    },
    Rule {
        event_types: &["EVT_Admin_Login"],
        category: Category::Security,
        severity: Severity::Low,
        title_template: "[Security] Admin login succeeded",
        description_template: "An administrator signed in to the controller (EVT_Admin_Login)",
        remediation_template: None,
    },
    // --- connectivity -------------------------------------------------
    Rule {
        event_types: &["EVT_AP_Lost_Contact"],
        category: Category::Connectivity,
        severity: Severity::Severe,
        title_template: "[Connectivity] Access point lost contact",
        description_template: "{device_name} stopped responding to the controller (EVT_AP_Lost_Contact)",
        remediation_template: Some(
            "1. Check that the access point has power and its uplink cable is seated.\n\
             2. Verify upstream switch port status and PoE budget.\n\
             3. If contact does not resume, power-cycle the device.",
        ),
    },
    Rule {
        event_types: &["EVT_SW_Lost_Contact"],
        category: Category::Connectivity,
        severity: Severity::Severe,
        title_template: "[Connectivity] Switch lost contact",
        description_template: "{device_name} stopped responding to the controller (EVT_SW_Lost_Contact)",
        remediation_template: Some(
            "1. Check that the switch has power and its management path is intact.\n\
             2. Verify no upstream device lost contact at the same time.\n\
             3. If contact does not resume, power-cycle the device.",
        ),
    },
    Rule {
        event_types: &["EVT_WAN_Down", "EVT_GW_WANTransition"],
        category: Category::Connectivity,
        severity: Severity::Severe,
        title_template: "[Connectivity] WAN link down",
        description_template: "The gateway's WAN uplink transitioned to down (EVT_WAN_Down)",
        remediation_template: Some(
            "1. Confirm the upstream ISP connection is active.\n\
             2. Check the WAN cable and any modem or ONT between the gateway and the ISP.\n\
             3. Escalate to the ISP if the link does not recover.",
        ),
    },
    Rule {
        event_types: &["EVT_AP_Isolated"],
        category: Category::Connectivity,
        severity: Severity::Severe,
        title_template: "[Connectivity] Access point isolated",
        description_template: "{device_name} is isolated from the rest of the network (EVT_AP_Isolated)",
        remediation_template: Some(
            "1. Check the access point's uplink switch port for spanning-tree or VLAN issues.\n\
             2. Confirm the device still has a route back to the controller.\n\
             3. Re-adopt the device if isolation persists.",
        ),
    },
    Rule {
        event_types: &["EVT_WU_Connected"],
        category: Category::Connectivity,
        severity: Severity::Low,
        title_template: "[Connectivity] Client connected",
        description_template: "A client connected to {device_name} (EVT_WU_Connected)",
        remediation_template: None,
    },
    Rule {
        event_types: &["EVT_WU_Disconnected"],
        category: Category::Connectivity,
        severity: Severity::Low,
        title_template: "[Connectivity] Client disconnected",
        description_template: "A client disconnected from {device_name} (EVT_WU_Disconnected)",
        remediation_template: None,
    },
    // --- performance ----------------------------------------------
    Rule {
        event_types: &["EVT_Device_HighCpu"],
        category: Category::Performance,
        severity: Severity::Medium,
        title_template: "[Performance] High CPU utilization",
        description_template: "{device_name} reported sustained high CPU utilization (EVT_Device_HighCpu)",
        remediation_template: Some(
            "Check for an unusually high client count or a runaway process on the device, and consider \
             rebooting it if utilization does not settle on its own.",
        ),
    },
    Rule {
        event_types: &["EVT_Device_HighMem"],
        category: Category::Performance,
        severity: Severity::Medium,
        title_template: "[Performance] High memory utilization",
        description_template: "{device_name} reported sustained high memory utilization (EVT_Device_HighMem)",
        remediation_template: Some(
            "Check for a memory leak in the device's current firmware release and reboot the device; \
             upgrade firmware if the condition recurs.",
        ),
    },
    Rule {
        event_types: &["EVT_AP_Interference", "EVT_AP_RadarDetected"],
        category: Category::Performance,
        severity: Severity::Medium,
        title_template: "[Performance] RF interference detected",
        description_template: "{device_name} reported RF interference or radar on its operating channel (EVT_AP_Interference)",
        remediation_template: Some(
            "Review the RF environment scan for this access point and consider moving it to a cleaner \
             channel or, for 5GHz DFS channels, accept the automatic channel change.",
        ),
    },
    Rule {
        event_types: &["EVT_SpeedTest_Degraded"],
        category: Category::Performance,
        severity: Severity::Medium,
        title_template: "[Performance] Speed-test degradation",
        description_template: "A scheduled speed test showed degraded throughput (EVT_SpeedTest_Degraded)",
        remediation_template: Some(
            "Compare the result against the contracted WAN bandwidth and rerun the test at a different \
             time of day before escalating to the ISP.",
        ),
    },
    // --- system -------------------------------------------------------
    Rule {
        event_types: &["EVT_Device_Upgraded"],
        category: Category::System,
        severity: Severity::Low,
        title_template: "[System] Firmware updated",
        description_template: "{device_name} was upgraded to new firmware (EVT_Device_Upgraded)",
        remediation_template: None,
    },
    Rule {
        event_types: &["EVT_Device_Restarted"],
        category: Category::System,
        severity: Severity::Low,
        title_template: "[System] Planned restart",
        description_template: "{device_name} restarted as part of a planned operation (EVT_Device_Restarted)",
        remediation_template: None,
    },
    Rule {
        event_types: &["EVT_Device_Adopted"],
        category: Category::System,
        severity: Severity::Low,
        title_template: "[System] Device adopted",
        description_template: "{device_name} was adopted by the controller (EVT_Device_Adopted)",
        remediation_template: None,
    },
    Rule {
        event_types: &["EVT_Device_ConfigurationChanged"],
        category: Category::System,
        severity: Severity::Low,
        title_template: "[System] Configuration changed",
        description_template: "{device_name}'s configuration was changed (EVT_Device_ConfigurationChanged)",
        remediation_template: None,
    },
    Rule {
        event_types: &["EVT_Backup_Created"],
        category: Category::System,
        severity: Severity::Low,
        title_template: "[System] Backup created",
        description_template: "A controller configuration backup was created (EVT_Backup_Created)",
        remediation_template: None,
    },
    Rule {
        event_types: &["EVT_Device_RestartedUnexpected"],
        category: Category::System,
        severity: Severity::Medium,
        title_template: "[System] Unexpected restart",
        description_template: "{device_name} restarted without a corresponding planned operation (EVT_Device_RestartedUnexpected)",
        remediation_template: Some(
            "Check the device's crash log or last kernel panic, if any, and review its power supply \
             for stability issues.",
        ),
    },
    // --- device_health --------------------------------------------
    Rule {
        event_types: &["EVT_Port_PoeDisconnect"],
        category: Category::DeviceHealth,
        severity: Severity::Medium,
        title_template: "[Device Health] PoE port disconnected",
        description_template: "A PoE port on {device_name} disconnected (EVT_Port_PoeDisconnect)",
        remediation_template: Some(
            "Check the powered device's cable and power draw, and confirm the port has not been \
             disabled by a PoE budget limit.",
        ),
    },
    Rule {
        event_types: &["EVT_Switch_PoeOverload"],
        category: Category::DeviceHealth,
        severity: Severity::Severe,
        title_template: "[Device Health] PoE budget exceeded",
        description_template: "{device_name} exceeded its PoE power budget (EVT_Switch_PoeOverload)",
        remediation_template: Some(
            "1. Identify which connected devices are drawing the most PoE power.\n\
             2. Move lower-priority powered devices to another switch or an external injector.\n\
             3. If the overload recurs, plan for a switch with a larger PoE budget.",
        ),
    },
];
