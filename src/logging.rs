//! Tracing setup: stderr plus two log files per run.
//!
//! Each run writes `file_search_<YYYYmmdd_HHMMSS>.log` and overwrites
//! `file_search_latest.log` in the configured log directory. `RUST_LOG`
//! takes precedence over the configured level. Stdout is never written,
//! which keeps it free for JSON output and the stdio MCP transport.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

pub const LOG_PREFIX: &str = "file_search";

/// Keeps the non-blocking file writers alive. Drop it last.
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
    pub run_log: Option<PathBuf>,
}

/// Build the filter directive for `level`, letting `RUST_LOG` win.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(normalize_level(level)))
}

/// Map loosely spelled level names ("WARNING", "Info") onto tracing levels.
pub fn normalize_level(level: &str) -> String {
    match level.trim().to_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" | "fatal" => "error".to_string(),
        "" => "info".to_string(),
        other => other.to_string(),
    }
}

pub fn run_log_name(stamp: &str) -> String {
    format!("{}_{}.log", LOG_PREFIX, stamp)
}

pub fn latest_log_name() -> String {
    format!("{}_latest.log", LOG_PREFIX)
}

/// Install the global subscriber.
///
/// When the log directory cannot be created the service still starts,
/// logging to stderr only.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuards> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut guards = Vec::new();
    let mut run_log = None;

    let (run_layer, latest_layer) = match prepare_log_dir(&config.dir) {
        Ok(dir) => {
            let run_appender = tracing_appender::rolling::never(&dir, run_log_name(&stamp));
            let (run_writer, run_guard) = tracing_appender::non_blocking(run_appender);
            guards.push(run_guard);

            let latest_appender = tracing_appender::rolling::never(&dir, latest_log_name());
            let (latest_writer, latest_guard) = tracing_appender::non_blocking(latest_appender);
            guards.push(latest_guard);

            run_log = Some(dir.join(run_log_name(&stamp)));
            let run_layer = tracing_subscriber::fmt::layer()
                .with_writer(run_writer)
                .with_ansi(false)
                .with_filter(env_filter(&config.level));
            let latest_layer = tracing_subscriber::fmt::layer()
                .with_writer(latest_writer)
                .with_ansi(false)
                .with_filter(env_filter(&config.level));
            (Some(run_layer), Some(latest_layer))
        }
        Err(err) => {
            eprintln!("Warning: failed to prepare log directory: {:#}", err);
            (None, None)
        }
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(&config.level));

    tracing_subscriber::registry()
        .with(run_layer)
        .with(latest_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuards {
        _guards: guards,
        run_log,
    })
}

/// Create the log directory and truncate the "latest" file.
fn prepare_log_dir(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    let latest = dir.join(latest_log_name());
    std::fs::File::create(&latest)
        .with_context(|| format!("Failed to reset {}", latest.display()))?;
    Ok(dir.to_path_buf())
}

/// Log host and configuration details once at startup.
pub fn log_system_info(search_dirs: &[PathBuf], log_dir: &Path) {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1),
        "file search service starting"
    );
    if let Ok(cwd) = std::env::current_dir() {
        tracing::info!(cwd = %cwd.display(), "working directory");
    }
    tracing::info!(log_dir = %log_dir.display(), "log directory");
    for dir in search_dirs {
        tracing::info!(dir = %dir.display(), exists = dir.is_dir(), "search directory");
    }
}
