//! Checkpoint persistence.
//!
//! Reads and writes `.last_run.json` atomically: write to a sibling temp
//! file in the same directory, `fsync`, then rename over the target. The
//! temp file is cleaned up on any failure path (handled by `tempfile`'s
//! `Drop` impl when `persist` is never reached).

use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::RunState;
use crate::error::{Result, ScannerError};

const STATE_FILE_NAME: &str = ".last_run.json";

pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(STATE_FILE_NAME),
        }
    }

    /// Validate that the state directory is writable. Called once at
    /// startup so a misconfigured mount fails fast rather than silently
    /// degrading every tick to "first run".
    pub fn validate_writable(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .map_err(|e| ScannerError::Config(format!("state_dir not creatable: {e}")))?;
        let probe = dir.join(".unifi_scanner_write_probe");
        std::fs::write(&probe, b"")
            .map_err(|e| ScannerError::Config(format!("state_dir not writable: {e}")))?;
        let _ = std::fs::remove_file(&probe);
        Ok(())
    }

    /// Read the last successful run timestamp.
    ///
    /// Returns `Ok(None)` (with a warning log) on: file missing, JSON
    /// decode failure, missing required field, or any other schema
    /// violation. Only propagates an error on permission denied.
    pub fn read(&self) -> Result<Option<RunState>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ScannerError::State(format!(
                    "permission denied reading {}: {e}",
                    self.path.display()
                )));
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "failed to read state file, treating as first run");
                return Ok(None);
            }
        };

        match serde_json::from_str::<RunState>(&raw) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "state file is corrupt, treating as first run");
                Ok(None)
            }
        }
    }

    /// Atomically replace the state file with a freshly computed
    /// `RunState`. Only ever called by the scheduler after the delivery
    /// manager's success predicate is true.
    pub fn write(&self, last_successful_run: chrono::DateTime<chrono::Utc>, report_count: usize) -> Result<()> {
        let state = RunState::new(last_successful_run, report_count);
        let json = serde_json::to_string_pretty(&state)
            .map_err(|e| ScannerError::State(format!("failed to serialize state: {e}")))?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)
            .map_err(|e| ScannerError::State(format!("cannot create state dir: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| ScannerError::State(format!("cannot create temp state file: {e}")))?;
        tmp.write_all(json.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ScannerError::State(format!("cannot write temp state file: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| ScannerError::State(format!("cannot persist state file: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn write_then_read_roundtrips_to_microsecond_precision() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        let ts = sample_timestamp();
        store.write(ts, 3).unwrap();

        let state = store.read().unwrap().unwrap();
        assert_eq!(state.last_successful_run, ts);
        assert_eq!(state.last_report_count, Some(3));
        assert_eq!(state.schema_version, crate::domain::run_state::SCHEMA_VERSION);
    }

    #[test]
    fn corrupted_json_degrades_to_first_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".last_run.json"), "{\"").unwrap();
        let store = StateStore::new(dir.path());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn missing_required_field_degrades_to_first_run() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".last_run.json"),
            r#"{"schema_version": "1.0"}"#,
        )
        .unwrap();
        let store = StateStore::new(dir.path());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());
        store.write(sample_timestamp(), 0).unwrap();
        store.write(sample_timestamp(), 1).unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    fn sample_timestamp() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc.with_ymd_and_hms(2026, 1, 24, 14, 30, 0).unwrap()
            + chrono::Duration::microseconds(654_321)
    }
}
