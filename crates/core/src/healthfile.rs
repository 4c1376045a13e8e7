//! Health file.
//!
//! A small JSON document rewritten atomically on every status transition
//! and after every tick, so an external supervisor (container orchestrator
//! liveness probe) can observe the daemon's state without talking to it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

use crate::error::{Result, ScannerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Starting,
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthDocument {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

/// Writes [`HealthDocument`]s to a fixed path using the same
/// write-temp-then-rename discipline as the state store.
pub struct HealthFile {
    path: std::path::PathBuf,
}

impl HealthFile {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, status: HealthStatus, details: impl Into<String>) -> Result<()> {
        let doc = HealthDocument {
            status,
            timestamp: Utc::now(),
            details: details.into(),
        };
        self.write_document(&doc)
    }

    fn write_document(&self, doc: &HealthDocument) -> Result<()> {
        let json = serde_json::to_string_pretty(doc)
            .map_err(|e| ScannerError::State(format!("failed to serialize health file: {e}")))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| ScannerError::State(format!("cannot create temp health file: {e}")))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ScannerError::State(format!("cannot write temp health file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| ScannerError::State(format!("cannot persist health file: {e}")))?;
        Ok(())
    }
}
