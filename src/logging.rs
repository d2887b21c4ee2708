// Console and per-run file logging
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the file writers alive; dropping it flushes the run's log files.
pub struct RunLog {
    pub dir: PathBuf,
    _guards: Vec<WorkerGuard>,
}

/// Installs the global subscriber: console output plus
/// `logs/{key}/{date}/info_{time}.log` (INFO and above) and
/// `error_{time}.log` (ERROR only).
pub fn init(logs_dir: &Path, key: &str) -> Result<RunLog, Box<dyn std::error::Error>> {
    let now = Local::now();
    let dir = logs_dir.join(key).join(now.format("%Y-%m-%d").to_string());
    fs::create_dir_all(&dir)?;
    let stamp = now.format("%Y-%m-%d_%H-%M").to_string();

    let info_file = tracing_appender::rolling::never(&dir, format!("info_{}.log", stamp));
    let error_file = tracing_appender::rolling::never(&dir, format!("error_{}.log", stamp));
    let (info_writer, info_guard) = tracing_appender::non_blocking(info_file);
    let (error_writer, error_guard) = tracing_appender::non_blocking(error_file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(info_writer))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(error_writer.with_max_level(Level::ERROR)),
        )
        .try_init()?;

    Ok(RunLog {
        dir,
        _guards: vec![info_guard, error_guard],
    })
}

/// Logs `message` centered between two rule lines.
pub fn log_with_border(message: &str) {
    let border = "=".repeat(50);
    info!("{}", border);
    info!("{:^50}", message);
    info!("{}", border);
}
