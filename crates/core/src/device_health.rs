//! DeviceHealthAnalyzer: a pure function over polled device
//! statistics and a frozen set of thresholds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DeviceStats, Severity};
use crate::rules::template;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthThresholds {
    pub temp_warn_c: f64,
    pub temp_crit_c: f64,
    pub cpu_warn_pct: f64,
    pub cpu_crit_pct: f64,
    pub mem_warn_pct: f64,
    pub mem_crit_pct: f64,
    pub uptime_warn_days: f64,
    pub uptime_crit_days: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            temp_warn_c: 80.0,
            temp_crit_c: 90.0,
            cpu_warn_pct: 80.0,
            cpu_crit_pct: 95.0,
            mem_warn_pct: 85.0,
            mem_crit_pct: 95.0,
            uptime_warn_days: 90.0,
            uptime_crit_days: 180.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthDimension {
    Temperature,
    Cpu,
    Memory,
    Uptime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceHealthStatus {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceHealthFinding {
    pub device_mac: String,
    pub device_name: String,
    pub dimension: HealthDimension,
    /// Always `Warning` or `Critical` — healthy dimensions produce no finding.
    pub status: DeviceHealthStatus,
    pub current: f64,
    pub threshold: f64,
    pub remediation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceSummary {
    pub mac: String,
    pub name: String,
    pub status: DeviceHealthStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceHealthResult {
    pub critical: Vec<DeviceHealthFinding>,
    pub warning: Vec<DeviceHealthFinding>,
    pub device_summaries: Vec<DeviceSummary>,
}

impl DeviceHealthResult {
    pub fn is_empty(&self) -> bool {
        self.critical.is_empty() && self.warning.is_empty()
    }
}

pub struct DeviceHealthAnalyzer {
    thresholds: HealthThresholds,
}

impl Default for DeviceHealthAnalyzer {
    fn default() -> Self {
        Self::new(HealthThresholds::default())
    }
}

impl DeviceHealthAnalyzer {
    pub fn new(thresholds: HealthThresholds) -> Self {
        Self { thresholds }
    }

    pub fn analyze(&self, stats: &[DeviceStats]) -> DeviceHealthResult {
        let mut critical = Vec::new();
        let mut warning = Vec::new();
        let mut device_summaries = Vec::new();

        for device in stats {
            let mut findings = Vec::new();

            if let Some(current) = device.temperature_c {
                self.check_dimension(
                    device,
                    HealthDimension::Temperature,
                    current,
                    self.thresholds.temp_warn_c,
                    self.thresholds.temp_crit_c,
                    &mut findings,
                );
            }
            if let Some(current) = device.cpu_pct {
                self.check_dimension(
                    device,
                    HealthDimension::Cpu,
                    current,
                    self.thresholds.cpu_warn_pct,
                    self.thresholds.cpu_crit_pct,
                    &mut findings,
                );
            }
            if let Some(current) = device.mem_pct {
                self.check_dimension(
                    device,
                    HealthDimension::Memory,
                    current,
                    self.thresholds.mem_warn_pct,
                    self.thresholds.mem_crit_pct,
                    &mut findings,
                );
            }
            if let Some(current) = device.uptime_days() {
                self.check_dimension(
                    device,
                    HealthDimension::Uptime,
                    current,
                    self.thresholds.uptime_warn_days,
                    self.thresholds.uptime_crit_days,
                    &mut findings,
                );
            }

            let device_status = findings
                .iter()
                .map(|f| f.status)
                .max_by_key(rank)
                .unwrap_or(DeviceHealthStatus::Healthy);
            device_summaries.push(DeviceSummary {
                mac: device.mac.clone(),
                name: device.name.clone(),
                status: device_status,
            });

            for f in findings {
                match f.status {
                    DeviceHealthStatus::Critical => critical.push(f),
                    DeviceHealthStatus::Warning => warning.push(f),
                    DeviceHealthStatus::Healthy => unreachable!("healthy dimensions produce no finding"),
                }
            }
        }

        DeviceHealthResult {
            critical,
            warning,
            device_summaries,
        }
    }

    /// Critical precedes warning within a dimension; at most one finding is
    /// emitted per dimension per device. Comparison is strict `>` —
    /// threshold values themselves do not trip.
    fn check_dimension(
        &self,
        device: &DeviceStats,
        dimension: HealthDimension,
        current: f64,
        warn_threshold: f64,
        crit_threshold: f64,
        out: &mut Vec<DeviceHealthFinding>,
    ) {
        let status = if current > crit_threshold {
            DeviceHealthStatus::Critical
        } else if current > warn_threshold {
            DeviceHealthStatus::Warning
        } else {
            return;
        };

        let threshold = match status {
            DeviceHealthStatus::Critical => crit_threshold,
            _ => warn_threshold,
        };
        let remediation = render_remediation(status, dimension, device, current, threshold);

        out.push(DeviceHealthFinding {
            device_mac: device.mac.clone(),
            device_name: device.name.clone(),
            dimension,
            status,
            current,
            threshold,
            remediation,
        });
    }
}

fn rank(status: &DeviceHealthStatus) -> u8 {
    match status {
        DeviceHealthStatus::Healthy => 0,
        DeviceHealthStatus::Warning => 1,
        DeviceHealthStatus::Critical => 2,
    }
}

fn render_remediation(
    status: DeviceHealthStatus,
    dimension: HealthDimension,
    device: &DeviceStats,
    current: f64,
    threshold: f64,
) -> String {
    let mut values = HashMap::new();
    values.insert("device_name", device.name.clone());
    values.insert("current", format!("{current:.1}"));
    values.insert("threshold", format!("{threshold:.1}"));

    let template_str = match (status, dimension) {
        (DeviceHealthStatus::Critical, HealthDimension::Temperature) => {
            "1. Check {device_name} for blocked vents or direct sunlight.\n\
             2. Verify ambient temperature near the device is within its rated range.\n\
             3. If the reading ({current}) stays above {threshold}, power the device down before it thermal-shuts-down."
        }
        (DeviceHealthStatus::Warning, HealthDimension::Temperature) => {
            "{device_name} is running warm ({current} vs a {threshold} threshold); check ventilation around the device."
        }
        (DeviceHealthStatus::Critical, HealthDimension::Cpu) => {
            "1. Check {device_name} for an unusually high client or process load.\n\
             2. Capture a process snapshot if the controller exposes one.\n\
             3. Reboot {device_name} if CPU usage ({current}%) does not recede from the {threshold}% threshold."
        }
        (DeviceHealthStatus::Warning, HealthDimension::Cpu) => {
            "{device_name}'s CPU usage ({current}%) is elevated above the {threshold}% threshold; monitor for a trend."
        }
        (DeviceHealthStatus::Critical, HealthDimension::Memory) => {
            "1. Check {device_name} for a memory leak in its current firmware.\n\
             2. Reboot {device_name} to reclaim memory.\n\
             3. Upgrade firmware if usage ({current}%) returns above {threshold}% soon after reboot."
        }
        (DeviceHealthStatus::Warning, HealthDimension::Memory) => {
            "{device_name}'s memory usage ({current}%) is elevated above the {threshold}% threshold; monitor for a trend."
        }
        (DeviceHealthStatus::Critical, HealthDimension::Uptime) => {
            "1. Schedule a maintenance window to reboot {device_name}.\n\
             2. Check whether a firmware update is available before rebooting.\n\
             3. Uptime is {current} days, well past the {threshold}-day threshold."
        }
        (DeviceHealthStatus::Warning, HealthDimension::Uptime) => {
            "{device_name} has been up for {current} days, past the {threshold}-day threshold; plan a reboot during the next maintenance window."
        }
        (DeviceHealthStatus::Healthy, _) => "",
    };

    template::render(template_str, &values)
}

/// `severity ∈ {severe, medium}` mapping used where a `DeviceHealthFinding`
/// needs to be expressed as the generic [`Severity`] the renderer expects.
pub fn dimension_severity(status: DeviceHealthStatus) -> Severity {
    match status {
        DeviceHealthStatus::Critical => Severity::Severe,
        DeviceHealthStatus::Warning => Severity::Medium,
        DeviceHealthStatus::Healthy => Severity::Low,
    }
}
