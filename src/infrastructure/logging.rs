//! Logging system configuration and initialization
//!
//! - Console and file output, each optional
//! - Non-blocking file writer, optionally rolled over daily
//! - Configuration file based log level control, `RUST_LOG` override
//! - Structured JSON logging (optional)
//! - Local-time timestamps

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use lazy_static::lazy_static;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    fmt::{self, time::FormatTime},
    layer::{Layered, SubscriberExt},
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

pub use crate::infrastructure::config::LoggingConfig;

/// Base name of the log file; daily rotation appends the date.
pub const LOG_FILE_NAME: &str = "catalog-harvester.log";

/// Dependencies capped below the application level unless tracing.
const NOISY_TARGETS: [(&str, &str); 8] = [
    ("sqlx::query", "warn"),
    ("sqlx::sqlite", "warn"),
    ("reqwest", "info"),
    ("hyper", "warn"),
    ("hyper_util", "warn"),
    ("h2", "warn"),
    ("html5ever", "warn"),
    ("selectors", "warn"),
];

// Keeps the log file writer alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

type BoxedLayer = Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync>;

/// Timestamps in the machine's local time zone
struct LocalTimeFormatter;

impl FormatTime for LocalTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Log directory from the configuration, `./logs` by default.
pub fn get_log_directory(config: &LoggingConfig) -> PathBuf {
    config.log_dir.clone().unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize the logging system with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LoggingConfig::default())
}

/// Build the level filter: `RUST_LOG` wins, otherwise the configured level
/// with noisy dependencies capped unless the level is `trace`.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        for (target, level) in NOISY_TARGETS {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
    }
    for (target, level) in &config.module_filters {
        filter = filter.add_directive(
            format!("{target}={level}")
                .parse()
                .with_context(|| format!("Invalid module filter {target}={level}"))?,
        );
    }
    Ok(filter)
}

/// Initialize logging with custom configuration
///
/// ```bash
/// # Show every SQL statement
/// RUST_LOG="debug,sqlx::query=debug" catalog-harvester run
/// ```
pub fn init_logging_with_config(config: LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = build_env_filter(&config)?;
    let log_dir = get_log_directory(&config);
    let mut layers: Vec<BoxedLayer> = Vec::new();

    if config.file_output {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

        if config.auto_cleanup_logs {
            cleanup_old_logs(&log_dir, config.max_files)?;
        }

        let file_appender = if config.daily_rotation {
            rolling::daily(&log_dir, LOG_FILE_NAME)
        } else {
            rolling::never(&log_dir, LOG_FILE_NAME)
        };
        let (file_writer, file_guard) = non_blocking(file_appender);
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(file_guard);

        let file_layer = fmt::Layer::new()
            .with_writer(file_writer)
            .with_timer(LocalTimeFormatter)
            .with_ansi(false);
        layers.push(if config.json_format {
            file_layer
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .boxed()
        } else {
            file_layer.with_target(false).boxed()
        });
    }

    if config.console_output {
        layers.push(
            fmt::Layer::new()
                .with_writer(std::io::stdout)
                .with_timer(LocalTimeFormatter)
                .with_target(false)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log file: {:?}", log_dir.join(LOG_FILE_NAME));
    }
    if !config.level.to_lowercase().contains("trace") {
        info!("Dependency logs capped (use TRACE level to see all logs)");
    }

    Ok(())
}

/// Keep the `max_files` most recently modified log files.
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    if !log_dir.exists() {
        return Ok(());
    }

    let mut log_files = Vec::new();
    for entry in std::fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(LOG_FILE_NAME));
        if !path.is_file() || !is_log {
            continue;
        }
        if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
            log_files.push((path, modified));
        }
    }

    // newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.iter().skip(max_files as usize) {
        if let Err(e) = std::fs::remove_file(path) {
            warn!("Failed to remove old log file {:?}: {}", path, e);
        }
    }

    Ok(())
}

/// Log system information for diagnostics
pub fn log_system_info() {
    info!("=== Catalog Harvester ===");
    info!("Application version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {}", std::env::consts::OS);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
    info!("=========================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_config_default() {
        let config = LoggingConfig::default();
        assert!(!config.level.is_empty());
        assert!(config.console_output);
        assert!(config.file_output);
        assert_eq!(get_log_directory(&config), PathBuf::from("logs"));
    }

    #[test]
    fn test_filter_rejects_bad_module_directive() {
        let mut config = LoggingConfig::default();
        config.module_filters.insert("sqlx".into(), "not a level!".into());
        if std::env::var("RUST_LOG").is_err() {
            assert!(build_env_filter(&config).is_err());
        }
    }

    #[test]
    fn test_cleanup_keeps_newest_files() {
        let dir = TempDir::new().unwrap();
        for day in 1..=4 {
            let path = dir.path().join(format!("{LOG_FILE_NAME}.2026-10-0{day}"));
            std::fs::write(&path, "x").unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20));
        }
        std::fs::write(dir.path().join("other.txt"), "keep").unwrap();

        cleanup_old_logs(dir.path(), 2).unwrap();

        let mut remaining: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        remaining.sort();
        assert_eq!(
            remaining,
            vec![
                format!("{LOG_FILE_NAME}.2026-10-03"),
                format!("{LOG_FILE_NAME}.2026-10-04"),
                "other.txt".to_string(),
            ]
        );
    }
}
