//! Declarative configuration.
//!
//! Loaded from a YAML file and overlaid with environment variables; any
//! sensitive field may instead be supplied as `<FIELD>_FILE=/path` to read
//! the value from a file (secret-manager integration). All failures are
//! collected and reported together rather than failing on the first bad
//! field, per the `Config` error kind's contract.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Result, ScannerError};

fn default_true() -> bool {
    true
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    5
}
fn default_lookback_hours() -> u64 {
    24
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
fn default_health_file() -> String {
    "/tmp/unifi-scanner-health".to_string()
}
fn default_timezone() -> String {
    "UTC".to_string()
}

/// Maximum allowed `initial_lookback_hours`, 30 days.
pub const MAX_LOOKBACK_HOURS: u64 = 720;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub to: Vec<String>,
}

fn default_smtp_port() -> u16 {
    587
}

/// Channels the delivery manager may fan out to. At least one must be
/// configured.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    pub file: bool,
    pub email: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IntegrationConfig {
    pub name: String,
    pub credentials: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub username: String,
    pub password: String,
    pub port: Option<u16>,

    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_lookback_hours")]
    pub initial_lookback_hours: u64,

    pub poll_interval_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default)]
    pub site: Option<String>,

    pub reports_dir: PathBuf,
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub smtp: Option<SmtpConfig>,

    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default)]
    pub channels: ChannelsConfig,

    #[serde(default)]
    pub integrations: Vec<IntegrationConfig>,

    #[serde(default = "default_health_file")]
    pub health_file: String,
}

impl Config {
    /// Load configuration from a YAML file, apply the `<FIELD>_FILE`
    /// secret-indirection convention, and validate it.
    ///
    /// All validation failures are collected and returned together as a
    /// single [`ScannerError::Config`]
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScannerError::Config(format!("cannot read {}: {e}", path.display())))?;
        let mut config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| ScannerError::Config(format!("invalid YAML in {}: {e}", path.display())))?;

        config.apply_secret_file_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve `<FIELD>_FILE` environment variables for secret fields.
    /// Currently: `PASSWORD_FILE`, `SMTP_PASSWORD_FILE`.
    fn apply_secret_file_overrides(&mut self) -> Result<()> {
        if let Ok(path) = std::env::var("PASSWORD_FILE") {
            self.password = read_secret_file(&path)?;
        }
        if let Some(smtp) = self.smtp.as_mut() {
            if let Ok(path) = std::env::var("SMTP_PASSWORD_FILE") {
                smtp.password = Some(read_secret_file(&path)?);
            }
        }
        Ok(())
    }

    /// Effective state directory: `state_dir`, or `reports_dir` when unset.
    pub fn effective_state_dir(&self) -> &Path {
        self.state_dir.as_deref().unwrap_or(&self.reports_dir)
    }

    pub fn connect_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.connect_timeout_secs)
    }

    /// Validate every field, collecting *all* failures before returning
    /// a single `ConfigError` that lists every failing field at once,
    /// rather than stopping at the first problem found.
    fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if self.host.trim().is_empty() {
            problems.push("host must not be empty".to_string());
        }
        if self.username.trim().is_empty() {
            problems.push("username must not be empty".to_string());
        }
        if self.password.is_empty() {
            problems.push("password must not be empty".to_string());
        }
        if self.initial_lookback_hours == 0 || self.initial_lookback_hours > MAX_LOOKBACK_HOURS {
            problems.push(format!(
                "initial_lookback_hours must be in 1..={MAX_LOOKBACK_HOURS}, got {}",
                self.initial_lookback_hours
            ));
        }
        if self.poll_interval_secs == 0 {
            problems.push("poll_interval_secs must be greater than zero".to_string());
        }
        if !self.channels.file && !self.channels.email {
            problems.push("at least one delivery channel (file, email) must be enabled".to_string());
        }
        if self.channels.email {
            match &self.smtp {
                None => problems.push("channels.email is enabled but no smtp config was provided".to_string()),
                Some(smtp) if smtp.to.is_empty() => {
                    problems.push("channels.email is enabled but smtp.to has no recipients".to_string())
                }
                Some(_) => {}
            }
        }
        match std::fs::create_dir_all(&self.reports_dir) {
            Ok(()) => {
                if let Err(e) = is_writable(&self.reports_dir) {
                    problems.push(format!("reports_dir is not writable: {e}"));
                }
            }
            Err(e) => problems.push(format!("cannot create reports_dir: {e}")),
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ScannerError::Config(problems.join("; ")))
        }
    }
}

fn read_secret_file(path: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim_end_matches(['\n', '\r']).to_string())
        .map_err(|e| ScannerError::Config(format!("cannot read secret file {path}: {e}")))
}

fn is_writable(dir: &Path) -> std::io::Result<()> {
    let probe = dir.join(".write_probe");
    std::fs::write(&probe, b"")?;
    std::fs::remove_file(&probe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_yaml(reports_dir: &str) -> String {
        format!(
            "host: unifi.example.com\n\
             username: admin\n\
             password: secret\n\
             poll_interval_secs: 300\n\
             reports_dir: {reports_dir}\n\
             channels:\n  file: true\n"
        )
    }

    #[test]
    fn loads_minimal_valid_config_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = minimal_yaml(dir.path().to_str().unwrap());
        let file = dir.path().join("config.yaml");
        std::fs::write(&file, yaml).unwrap();

        let cfg = Config::load(&file).unwrap();
        assert!(cfg.verify_ssl);
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.initial_lookback_hours, 24);
        assert_eq!(cfg.effective_state_dir(), dir.path());
    }

    #[test]
    fn rejects_lookback_hours_above_max() {
        let dir = tempfile::tempdir().unwrap();
        let mut yaml = minimal_yaml(dir.path().to_str().unwrap());
        yaml.push_str("initial_lookback_hours: 1000\n");
        let file = dir.path().join("config.yaml");
        std::fs::write(&file, yaml).unwrap();

        let err = Config::load(&file).unwrap_err();
        assert!(matches!(err, ScannerError::Config(_)));
        assert!(err.to_string().contains("initial_lookback_hours"));
    }

    #[test]
    fn collects_multiple_problems_at_once() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = "host: \"\"\nusername: \"\"\npassword: \"\"\npoll_interval_secs: 0\nreports_dir: {}\n"
            .replace("{}", dir.path().to_str().unwrap());
        let file = dir.path().join("config.yaml");
        std::fs::write(&file, yaml).unwrap();

        let err = Config::load(&file).unwrap_err().to_string();
        assert!(err.contains("host"));
        assert!(err.contains("username"));
        assert!(err.contains("password"));
        assert!(err.contains("poll_interval_secs"));
        assert!(err.contains("delivery channel"));
    }

    #[test]
    fn rejects_email_channel_with_no_recipients() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = format!(
            "host: unifi.example.com\n\
             username: admin\n\
             password: secret\n\
             poll_interval_secs: 300\n\
             reports_dir: {}\n\
             channels:\n  file: false\n  email: true\n\
             smtp:\n  host: smtp.example.com\n  from: scanner@example.com\n  to: []\n",
            dir.path().to_str().unwrap()
        );
        let file = dir.path().join("config.yaml");
        std::fs::write(&file, yaml).unwrap();

        let err = Config::load(&file).unwrap_err().to_string();
        assert!(err.contains("smtp.to"));
    }

    #[test]
    fn secret_file_override_reads_password() {
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("password.secret");
        std::fs::write(&secret_path, "from-file-secret\n").unwrap();

        let mut yaml = minimal_yaml(dir.path().to_str().unwrap());
        yaml.push_str("password: placeholder\n");
        let file = dir.path().join("config.yaml");
        std::fs::write(&file, yaml).unwrap();

        std::env::set_var("PASSWORD_FILE", &secret_path);
        let cfg = Config::load(&file);
        std::env::remove_var("PASSWORD_FILE");

        assert_eq!(cfg.unwrap().password, "from-file-secret");
    }
}
