//! Entry point for `unifi-scannerd`.
//!
//! Wires the configuration, controller session, analysis pipeline and
//! scheduler together, then runs either one tick (`--once`) or the
//! persistent poll loop.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};

use unifi_scanner_core::analysis::AnalysisEngine;
use unifi_scanner_core::collector::Collector;
use unifi_scanner_core::controller::{ControllerClient, ReqwestTransport};
use unifi_scanner_core::delivery::DeliveryManager;
use unifi_scanner_core::device_health::DeviceHealthAnalyzer;
use unifi_scanner_core::healthfile::HealthFile;
use unifi_scanner_core::integrations::IntegrationRunner;
use unifi_scanner_core::ips_analyzer::IPSAnalyzer;
use unifi_scanner_core::renderer::Renderer;
use unifi_scanner_core::report_builder::ReportBuilder;
use unifi_scanner_core::scheduler::{exit_code, exit_code_for, Scheduler, SchedulerConfig};
use unifi_scanner_core::state_store::StateStore;
use unifi_scanner_core::{config::Config, telemetry};

/// UniFi controller security & health scanner.
#[derive(Parser, Debug)]
#[command(name = "unifi-scannerd", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, env = "UNIFI_SCANNER_CONFIG", default_value = "/etc/unifi-scanner/config.yaml")]
    config: PathBuf,

    /// Run a single collection/analysis/delivery cycle and exit.
    #[arg(long)]
    once: bool,

    /// Load and validate the configuration file, print the outcome, and exit.
    #[arg(long)]
    validate_config: bool,
}

fn parse_log_level(level: &str) -> Level {
    level.parse().unwrap_or(Level::INFO)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.validate_config {
        return match Config::load(&cli.config) {
            Ok(_) => {
                println!("configuration at {} is valid", cli.config.display());
                ExitCode::from(exit_code::SUCCESS as u8)
            }
            Err(e) => {
                eprintln!("configuration error: {e}");
                ExitCode::from(exit_code::CONFIG_ERROR as u8)
            }
        };
    }

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(exit_code::CONFIG_ERROR as u8);
        }
    };

    telemetry::init_tracing(config.log_format == "json", parse_log_level(&config.log_level));

    let site = config.site.clone().unwrap_or_else(|| "default".to_string());
    info!(
        config = %cli.config.display(),
        host = %config.host,
        site = %site,
        poll_interval_secs = config.poll_interval_secs,
        "unifi-scannerd starting"
    );

    match run(&config, &site, cli.once).await {
        Ok(()) => ExitCode::from(exit_code::SUCCESS as u8),
        Err(e) => {
            error!(error = %e, "fatal error, exiting");
            ExitCode::from(exit_code_for(&e) as u8)
        }
    }
}

async fn run(config: &Config, site: &str, once: bool) -> unifi_scanner_core::Result<()> {
    let state_store = StateStore::new(config.effective_state_dir());
    state_store.validate_writable()?;

    let transport = ReqwestTransport::new(config.verify_ssl)?;
    let client = ControllerClient::new(
        transport,
        config.host.clone(),
        config.username.clone(),
        config.password.clone(),
        config.connect_timeout(),
        config.max_retries,
    );

    let collector = Collector::with_null_fallback(&client, unifi_scanner_core::config::MAX_LOOKBACK_HOURS);
    let analysis = AnalysisEngine::with_builtin_rules();
    let ips_analyzer = IPSAnalyzer::default();
    let health_analyzer = DeviceHealthAnalyzer::default();

    // Device-type detection happens once, up front, so the report builder
    // can be stamped with the controller flavour for every tick afterward;
    // the scheduler's own startup sequence skips re-detecting.
    client.detect_device_type().await?;
    let kind = client
        .kind()
        .await
        .expect("detect_device_type succeeded, so kind must be set");
    let report_builder = ReportBuilder::new(site, kind);

    let renderer = Renderer::new(&config.timezone)?;
    let delivery = DeliveryManager::new(&config.channels, config.reports_dir.clone(), config.smtp.clone(), config.max_retries);
    let health_file = HealthFile::new(&config.health_file);
    let integrations = IntegrationRunner::new(Vec::new(), unifi_scanner_core::integrations::DEFAULT_TIMEOUT);

    let scheduler_config = SchedulerConfig {
        site: site.to_string(),
        poll_interval: Duration::from_secs(config.poll_interval_secs),
        initial_lookback_hours: config.initial_lookback_hours,
        shutdown_grace: Duration::from_secs(30),
    };

    let scheduler = Scheduler::new(
        &client,
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
        scheduler_config,
    );

    if once {
        scheduler.run_once().await
    } else {
        scheduler.run().await
    }
}

