//! Scheduler / JobRunner: single-flight, coalescing poll loop driving
//! the pipeline `Collector -> analysis -> FindingStore -> ReportBuilder ->
//! Renderer -> DeliveryManager -> StateStore` once per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::analysis::AnalysisEngine;
use crate::collector::Collector;
use crate::controller::{ControllerClient, ControllerTransport};
use crate::delivery::DeliveryManager;
use crate::device_health::DeviceHealthAnalyzer;
use crate::error::{Result, ScannerError};
use crate::finding_store::FindingStore;
use crate::healthfile::{HealthFile, HealthStatus};
use crate::integrations::IntegrationRunner;
use crate::ips_analyzer::IPSAnalyzer;
use crate::metrics::METRICS;
use crate::renderer::Renderer;
use crate::report_builder::ReportBuilder;
use crate::state_store::StateStore;

/// Process exit code for each terminal condition.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 1;
    pub const CONNECTION_ERROR: i32 = 2;
    pub const AUTHENTICATION_ERROR: i32 = 3;
}

pub fn exit_code_for(err: &ScannerError) -> i32 {
    match err {
        ScannerError::Config(_) => exit_code::CONFIG_ERROR,
        ScannerError::Connection(_) => exit_code::CONNECTION_ERROR,
        ScannerError::Authentication { .. } => exit_code::AUTHENTICATION_ERROR,
        _ => exit_code::CONNECTION_ERROR,
    }
}

/// Tracks SIGTERM/SIGINT receipt without cancelling whatever is currently
/// running. A background task sets `requested` and wakes `notify` the
/// moment either signal arrives; callers poll `requested()` between
/// atomic units of work (a tick, a sleep) instead of racing the signal
/// against the work itself.
struct ShutdownSignal {
    requested: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    fn install() -> Result<Self> {
        let requested = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());

        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .map_err(|e| ScannerError::Connection(format!("failed to install SIGTERM handler: {e}")))?;

        let flag = requested.clone();
        let waker = notify.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            flag.store(true, Ordering::SeqCst);
            waker.notify_waiters();
        });

        Ok(Self { requested, notify })
    }

    fn requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await;
    }
}

pub struct SchedulerConfig {
    pub site: String,
    pub poll_interval: Duration,
    pub initial_lookback_hours: u64,
    pub shutdown_grace: Duration,
}

/// Owns every long-lived component and drives the tick loop.
pub struct Scheduler<'a, T: ControllerTransport> {
    client: &'a ControllerClient<T>,
    collector: Collector<'a, T>,
    analysis: AnalysisEngine,
    ips_analyzer: IPSAnalyzer,
    health_analyzer: DeviceHealthAnalyzer,
    report_builder: ReportBuilder,
    renderer: Renderer,
    delivery: DeliveryManager,
    state_store: StateStore,
    health_file: HealthFile,
    integrations: IntegrationRunner,
    config: SchedulerConfig,
}

#[allow(clippy::too_many_arguments)]
impl<'a, T: ControllerTransport> Scheduler<'a, T> {
    pub fn new(
        client: &'a ControllerClient<T>,
        collector: Collector<'a, T>,
        analysis: AnalysisEngine,
        ips_analyzer: IPSAnalyzer,
        health_analyzer: DeviceHealthAnalyzer,
        report_builder: ReportBuilder,
        renderer: Renderer,
        delivery: DeliveryManager,
        state_store: StateStore,
        health_file: HealthFile,
        integrations: IntegrationRunner,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            client,
            collector,
            analysis,
            ips_analyzer,
            health_analyzer,
            report_builder,
            renderer,
            delivery,
            state_store,
            health_file,
            integrations,
            config,
        }
    }

    /// Startup sequence: device-type detection and fresh authentication.
    /// Failures here are fatal to the process — the caller
    /// maps the returned error to exit code 2 or 3.
    pub async fn startup(&self) -> Result<()> {
        let _ = self.health_file.write(HealthStatus::Starting, "detecting controller");
        if self.client.kind().await.is_none() {
            self.client.detect_device_type().await?;
        }
        self.client.authenticate().await?;

        let excluded = self.integrations.validate_all();
        if !excluded.is_empty() {
            warn!(?excluded, "one or more integrations excluded at startup");
        }

        let _ = self.health_file.write(HealthStatus::Healthy, "startup complete");
        Ok(())
    }

    /// Run one poll, `max_instances=1` (never concurrent with itself by
    /// construction — the caller awaits this before scheduling the next).
    /// Connection/authentication failures during a tick are logged and
    /// leave state untouched; they do not propagate.
    pub async fn tick(&self) -> Result<()> {
        let now = Utc::now();

        // Fresh authentication at the start of every tick (not just at
        // process startup): a tick-time auth failure aborts this tick
        // only, unlike the startup probe where the same error is fatal.
        if let Err(e) = self.client.authenticate().await {
            warn!(error = %e, "tick aborted: authentication failed");
            let _ = self.health_file.write(HealthStatus::Unhealthy, format!("authentication failed: {e}"));
            return Ok(());
        }

        let since = self.state_store.read()?.map(|s| s.last_successful_run);

        let (events, ips_events) = match self
            .collector
            .collect(&self.config.site, since, self.config.initial_lookback_hours, now)
            .await
        {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "tick aborted: collection failed");
                let _ = self.health_file.write(HealthStatus::Unhealthy, format!("collection failed: {e}"));
                return Ok(());
            }
        };

        let mut store = FindingStore::default();
        for event in &events {
            for finding in self.analysis.analyze(event) {
                store.add(&event.event_type, event.device_mac.as_deref(), event.time, finding);
            }
        }
        let findings = store.into_sorted_findings();

        let ips_analysis = if ips_events.is_empty() { None } else { Some(self.ips_analyzer.analyze(&ips_events)) };

        // Step 5/6: device health is isolated — a failure here must not
        // abort the tick, only omit the health section.
        let health_analysis = match self.collector.collect_devices(&self.config.site).await {
            Ok(devices) => Some(self.health_analyzer.analyze(&devices)),
            Err(e) => {
                warn!(error = %e, "device stats unavailable this tick, omitting health section");
                None
            }
        };

        let report = self
            .report_builder
            .build(since.unwrap_or(now), now, findings, ips_analysis, health_analysis, events.len(), ips_events.len());

        let (html, text) = self.renderer.render(&report)?;
        let delivered = self.delivery.deliver(&report, &html, &text).await;

        let integration_results = self.integrations.run_all().await;
        for (name, outcome) in &integration_results {
            if !matches!(outcome, crate::integrations::IntegrationOutcome::Success | crate::integrations::IntegrationOutcome::Skipped) {
                warn!(integration = name, reason = outcome.reason(), "integration fetch did not succeed");
            }
        }

        if delivered {
            self.state_store.write(now, report.findings.len())?;
            let _ = self.health_file.write(HealthStatus::Healthy, "tick delivered");
        } else {
            warn!("all delivery channels failed; checkpoint not advanced");
            let _ = self.health_file.write(HealthStatus::Unhealthy, "delivery failed");
        }

        METRICS.flush(&self.config.site);
        Ok(())
    }

    /// The main loop: tick, sleep until the next interval (coalesced — a
    /// tick that overruns the interval is followed immediately by the
    /// next, never queued twice). SIGTERM/SIGINT let any in-flight tick
    /// complete before exiting — the signal is only checked between ticks and while
    /// sleeping, never used to cancel `tick()` itself.
    pub async fn run(&self) -> Result<()> {
        self.startup().await?;

        let shutdown = ShutdownSignal::install()?;

        loop {
            self.tick().await?;

            if shutdown.requested() {
                info!("shutdown requested, exiting after completed tick");
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.poll_interval) => {}
                _ = shutdown.notified() => {
                    info!("shutdown requested during poll wait, exiting");
                    return Ok(());
                }
            }

            if shutdown.requested() {
                return Ok(());
            }
        }
    }

    /// Run exactly one tick and return, used by `--once`.
    pub async fn run_once(&self) -> Result<()> {
        self.startup().await?;
        self.tick().await
    }
}
