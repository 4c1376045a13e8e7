//! DeliveryManager: channel fan-out with per-channel retry and an
//! `any(channel_succeeded)` success predicate.

use std::path::{Path, PathBuf};

use lettre::message::{header::ContentType, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::config::{ChannelsConfig, SmtpConfig};
use crate::domain::Report;
use crate::error::{Result, ScannerError};
use crate::metrics::METRICS;
use crate::retry::{retry, BackoffPolicy, Outcome, RetryOutcome};

/// Deterministic filename slug: `<timestamp>-<site-slug>`, stable across equal inputs for test reproducibility.
fn slug(report: &Report) -> String {
    let site_slug: String = report
        .site
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    format!("{}-{}", report.generated_at.format("%Y%m%dT%H%M%SZ"), site_slug)
}

struct FileChannel {
    reports_dir: PathBuf,
}

impl FileChannel {
    /// Atomic write-then-rename, identical discipline to the state store.
    fn deliver(&self, report: &Report, html: &[u8], text: &[u8]) -> Result<()> {
        let base = slug(report);
        self.write_atomic(&self.reports_dir.join(format!("{base}.html")), html)?;
        self.write_atomic(&self.reports_dir.join(format!("{base}.txt")), text)?;
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.reports_dir)
            .map_err(|e| ScannerError::Delivery(format!("cannot create reports_dir: {e}")))?;
        let mut tmp = NamedTempFile::new_in(&self.reports_dir)
            .map_err(|e| ScannerError::Delivery(format!("cannot create temp report file: {e}")))?;
        use std::io::Write;
        tmp.write_all(contents)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ScannerError::Delivery(format!("cannot write temp report file: {e}")))?;
        tmp.persist(path)
            .map_err(|e| ScannerError::Delivery(format!("cannot persist report file: {e}")))?;
        Ok(())
    }
}

struct EmailChannel {
    config: SmtpConfig,
    backoff: BackoffPolicy,
}

impl EmailChannel {
    fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.host)
            .port(self.config.port);

        if let (Some(username), Some(password)) = (&self.config.username, &self.config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }

    /// One SMTP transaction per recipient, each retried independently under
    /// the same exponential backoff as C1 — a transient failure partway
    /// through the recipient list must not resend to recipients already
    /// delivered.
    async fn deliver(&self, report: &Report, html: &[u8], text: &[u8]) -> Result<()> {
        let transport = self.build_transport()?;
        let subject = format!(
            "UniFi scan report — {} ({} severe, {} medium)",
            report.site,
            report.severe_count(),
            report.medium_count()
        );
        let html_body = String::from_utf8_lossy(html).into_owned();
        let text_body = String::from_utf8_lossy(text).into_owned();

        for recipient in &self.config.to {
            let result = retry(&self.backoff, |_attempt| {
                let transport = &transport;
                let subject = subject.clone();
                let html_body = html_body.clone();
                let text_body = text_body.clone();
                async move {
                    match self.send_once(transport, recipient, &subject, &html_body, &text_body).await {
                        Ok(()) => Outcome::Done(()),
                        Err(_) => Outcome::Retryable,
                    }
                }
            })
            .await;

            match result {
                Ok(()) => {}
                Err(RetryOutcome::Exhausted) => {
                    return Err(ScannerError::Delivery(format!(
                        "SMTP submission to {recipient} exhausted all retries"
                    )))
                }
                Err(RetryOutcome::Fatal) => {
                    return Err(ScannerError::Delivery(format!("SMTP submission to {recipient} failed fatally")))
                }
            }
        }
        Ok(())
    }

    async fn send_once(
        &self,
        transport: &AsyncSmtpTransport<Tokio1Executor>,
        recipient: &str,
        subject: &str,
        html_body: &str,
        text_body: &str,
    ) -> Result<()> {
        let body = MultiPart::alternative()
            .singlepart(SinglePart::builder().header(ContentType::TEXT_PLAIN).body(text_body.to_string()))
            .singlepart(SinglePart::builder().header(ContentType::TEXT_HTML).body(html_body.to_string()));

        let message = Message::builder()
            .from(
                self.config
                    .from
                    .parse()
                    .map_err(|e| ScannerError::Delivery(format!("invalid from address: {e}")))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| ScannerError::Delivery(format!("invalid recipient address {recipient}: {e}")))?)
            .subject(subject)
            .multipart(body)
            .map_err(|e| ScannerError::Delivery(format!("failed to build message: {e}")))?;

        transport
            .send(message)
            .await
            .map_err(|e| ScannerError::Delivery(format!("SMTP submission failed: {e}")))?;
        Ok(())
    }
}

/// Executes channel fan-out and applies the `any(channel_succeeded)`
/// success predicate that governs checkpoint advancement.
pub struct DeliveryManager {
    file: Option<FileChannel>,
    email: Option<EmailChannel>,
}

impl DeliveryManager {
    pub fn new(channels: &ChannelsConfig, reports_dir: PathBuf, smtp: Option<SmtpConfig>, max_retries: u32) -> Self {
        let file = channels.file.then(|| FileChannel { reports_dir });
        let email = if channels.email {
            smtp.map(|config| EmailChannel {
                config,
                backoff: BackoffPolicy::http_default(max_retries),
            })
        } else {
            None
        };
        Self { file, email }
    }

    /// Empty reports are still delivered — the user's confirmation the
    /// daemon is alive.
    pub async fn deliver(&self, report: &Report, html: &[u8], text: &[u8]) -> bool {
        let mut any_succeeded = false;

        if let Some(file) = &self.file {
            match file.deliver(report, html, text) {
                Ok(()) => any_succeeded = true,
                Err(e) => warn!(error = %e, channel = "file", "delivery channel failed"),
            }
        }

        if let Some(email) = &self.email {
            match email.deliver(report, html, text).await {
                Ok(()) => any_succeeded = true,
                Err(e) => warn!(error = %e, channel = "email", "delivery channel failed"),
            }
        }

        if any_succeeded {
            METRICS.inc_delivery_success();
        } else {
            METRICS.inc_delivery_failure();
        }
        any_succeeded
    }
}
