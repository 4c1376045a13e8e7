//! Error taxonomy for the scanner daemon.
//!
//! Kinds mirror the design doc exactly: `Config` and startup-time
//! `Connection`/`Authentication` are fatal; everything else is recovered
//! locally by the component that raised it (see each component's module).

use thiserror::Error;

/// Scanner-level errors.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// Missing required field, unwritable path, bad enum value. Fatal at
    /// startup; the process prints every failing field and exits 1.
    #[error("configuration error: {0}")]
    Config(String),

    /// TCP/TLS failure, or no controller port responded within the
    /// aggregate timeout. Terminal for the current tick.
    #[error("connection error: {0}")]
    Connection(String),

    /// A 401 survived one transparent reauth, or the login response hints
    /// at MFA/SSO. Carries a human-readable hint (never carries secrets).
    #[error("authentication error: {message} (hint: {hint})")]
    Authentication { message: String, hint: String },

    /// Non-401/429 4xx, or `meta.rc != "ok"` in a controller response.
    #[error("controller API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Malformed event/IPS payload. The caller increments a counter and
    /// skips the record; this variant exists so that decision is explicit
    /// at the call site rather than silently swallowed.
    #[error("failed to parse controller payload: {0}")]
    Parse(String),

    /// All delivery channels failed. State must not advance.
    #[error("all delivery channels failed: {0}")]
    Delivery(String),

    /// State file could not be read or written.
    #[error("state store error: {0}")]
    State(String),
}

/// Result alias for scanner operations.
pub type Result<T> = std::result::Result<T, ScannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authentication_error_carries_hint() {
        let err = ScannerError::Authentication {
            message: "401 after reauth".into(),
            hint: "local account required; SSO/MFA accounts cannot authenticate".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("401 after reauth"));
        assert!(msg.contains("SSO/MFA"));
    }

    #[test]
    fn api_error_includes_status() {
        let err = ScannerError::Api {
            status: 403,
            body: "forbidden".into(),
        };
        assert!(err.to_string().contains("403"));
    }
}
