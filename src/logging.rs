//! Tracing subscriber setup: stdout plus the application's log file.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::args::LogLevel;

/// Filter for the given level. `RUST_LOG` takes precedence when set.
pub fn env_filter(level: LogLevel) -> EnvFilter {
    if std::env::var(EnvFilter::DEFAULT_ENV)
        .unwrap_or_default()
        .is_empty()
    {
        EnvFilter::new(format!("{},lapin=warn,ureq=warn", level.as_str()))
    } else {
        EnvFilter::from_default_env()
    }
}

/// Install the global subscriber. The returned guard flushes the log file when
/// dropped and must live until the process exits.
pub fn init_logging(level: LogLevel, log_file: &Path) -> Result<WorkerGuard> {
    let dir = log_file
        .parent()
        .ok_or_else(|| anyhow!("log file {} has no parent directory", log_file.display()))?;
    let name = log_file
        .file_name()
        .ok_or_else(|| anyhow!("log file {} has no file name", log_file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    let no_color = std::env::var("RUST_LOG_STYLE")
        .map(|val| val == "never")
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(!no_color)
                .with_target(false)
                .with_filter(env_filter(level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(env_filter(level)),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
