use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggerSettings;

/// Directory holding per-account log files.
pub const LOG_DIR: &str = "logs";

/// Log file path for an account.
pub fn log_file_path(username: &str) -> PathBuf {
    PathBuf::from(LOG_DIR).join(format!("{username}.log"))
}

/// Install the global subscriber.
///
/// The console layer honours `RUST_LOG`, falling back to `console_level`.
/// With `save` on, a second plain-text layer appends to
/// `logs/<username>.log` at `file_level`.
pub fn init(settings: &LoggerSettings, username: &str) -> Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.console_level.as_str()));
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(settings.colored)
        .with_filter(console_filter);

    let file = if settings.save {
        let path = log_file_path(username);
        fs::create_dir_all(LOG_DIR).with_context(|| format!("failed to create {LOG_DIR}/"))?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        Some(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_filter(settings.file_level.filter()),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}
