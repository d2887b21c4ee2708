mod analyzer;
mod config;
mod coordinator;
mod logging;
mod model;
mod normalizer;
mod notifier;
mod scraper;
mod storage;

use chrono::{Datelike, Local};
use clap::Parser;
use config::{AppConfig, CategoryConfig, load_config};
use coordinator::{Channels, Coordinator, RunReport, RunSettings};
use model::{RunError, TargetOutcome};
use notifier::SlackNotifier;
use std::process::ExitCode;
use std::time::Instant;
use storage::{ArtifactPaths, SnapshotStore, TargetSource};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tracing::{error, info, warn};

use crate::scraper::{ChromiumSession, ExtractorImpl, StaticFetcher};

const NETWORK_TIMEOUT: Duration = Duration::from_secs(10);

/// Checks a category of scholarship and notice boards once and reports
/// anything new to Slack.
#[derive(Debug, Parser)]
#[command(name = "notice-sniper", version)]
struct Cli {
    /// Category key from the config file.
    #[arg(default_value = "univ")]
    category: String,

    /// Path to the JSON config file.
    #[arg(long, default_value = "config.json")]
    config: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("😱 Panic occurred: {:?}", panic_info);
    }));

    let config = match load_config(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Config load error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let log = match logging::init(&config.logs_dir, &cli.category) {
        Ok(log) => log,
        Err(e) => {
            eprintln!("Logging setup failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("|| {} || logging to {}", cli.category, log.dir.display());

    match run(&cli.category, &config).await {
        Ok(report) => {
            log_report(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("[FATAL] {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Setup, batch and cleanup for one category. The browser is closed on
/// every path once it has been launched.
async fn run(key: &str, config: &AppConfig) -> Result<RunReport, RunError> {
    let started_at = Instant::now();

    let category = config
        .categories
        .get(key)
        .ok_or_else(|| RunError::UnknownCategory(key.to_string()))?;

    check_network(&config.network_probe).await?;

    let notifier = SlackNotifier::new(config.slack_token()).map_err(|e| RunError::Config(e.to_string()))?;
    let fetcher = StaticFetcher::new().map_err(|e| RunError::Config(e.to_string()))?;

    let session = ChromiumSession::launch(&config.browser)
        .await
        .map_err(|e| RunError::Browser(e.to_string()))?;
    info!("[DRIVER] browser ready");
    let mut extractor = ExtractorImpl::new(fetcher, Some(session));

    let result = crawl(key, config, category, &mut extractor, &notifier, started_at).await;

    extractor.shutdown().await;
    result
}

async fn crawl(
    key: &str,
    config: &AppConfig,
    category: &CategoryConfig,
    extractor: &mut ExtractorImpl<ChromiumSession>,
    notifier: &SlackNotifier,
    started_at: Instant,
) -> Result<RunReport, RunError> {
    let source = TargetSource::open(&category.db_path)?;
    let loaded = source.load_targets(category, Local::now().month());
    match source.close() {
        Ok(()) => info!("[DB] connection closed"),
        Err(e) => error!("[DB] error while closing connection: {}", e),
    }
    let targets = loaded?;
    info!("[DB] loaded {} targets for '{}'", targets.len(), key);

    let date = Local::now().format("%Y-%m-%d").to_string();
    let settings = RunSettings {
        key: key.to_string(),
        artifacts: ArtifactPaths::for_run(&config.logs_dir, &config.data_dir, key, &date),
        date,
        keywords: config.keywords.clone(),
        channels: Channels {
            scholarship: config.slack.scholarship_channel.clone(),
            notice: config.slack.notice_channel.clone(),
        },
        started_at,
    };
    let store = SnapshotStore::new(config.data_dir.join(key));
    info!("[DATA] snapshots in {}", store.dir().display());

    let report = Coordinator::new(settings, extractor, store, notifier)
        .run(&targets)
        .await;
    Ok(report)
}

fn log_report(report: &RunReport) {
    let sent: usize = report
        .outcomes
        .iter()
        .map(|(_, outcome)| match outcome {
            TargetOutcome::Delivered { matched, .. } => *matched,
            _ => 0,
        })
        .sum();
    let skipped: usize = report
        .outcomes
        .iter()
        .map(|(_, outcome)| match outcome {
            TargetOutcome::Delivered { unmatched, .. } => *unmatched,
            _ => 0,
        })
        .sum();
    info!(
        "run complete: {} succeeded, {} failed, {} items sent, {} without keywords",
        report.summary.success_count, report.summary.failure_count, sent, skipped
    );
    if !report.errors.is_empty() {
        warn!("{} targets recorded errors", report.errors.len());
    }
    for failure in &report.failures {
        warn!("[FAILED] {}", failure);
    }
}

async fn check_network(probe: &str) -> Result<(), RunError> {
    match timeout(NETWORK_TIMEOUT, TcpStream::connect(probe)).await {
        Ok(Ok(_)) => {
            info!("[NETWORK] connectivity check passed");
            Ok(())
        }
        Ok(Err(e)) => Err(RunError::NetworkUnreachable(e.to_string())),
        Err(_) => Err(RunError::NetworkUnreachable(format!(
            "no connection to {} within {}s",
            probe,
            NETWORK_TIMEOUT.as_secs()
        ))),
    }
}
