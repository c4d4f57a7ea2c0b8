use std::{backtrace::Backtrace, fs, path::PathBuf};

use eyre::{Result, WrapErr};
use tracing::error;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOGS_DIR: &str = "logs";
pub const LOG_FILE_PREFIX: &str = "webhook";
pub const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Directory receiving one `webhook.<date>.log` file per UTC day
    pub dir: PathBuf,
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines on stdout instead of the human-readable format
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { dir: PathBuf::from(DEFAULT_LOGS_DIR), level: "info".to_string(), json: false }
    }
}

/// Initialize the global subscriber with a stdout layer and a daily-rotated file layer.
///
/// The returned guard flushes the file writer on drop and must be held for the process
/// lifetime.
pub fn init_logging(settings: &LogSettings) -> Result<WorkerGuard> {
    fs::create_dir_all(&settings.dir)
        .wrap_err_with(|| format!("Failed to create logs directory {}", settings.dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(&settings.dir)
        .wrap_err("Failed to create rolling log file appender")?;

    // Concurrent appends are serialized by the background writer thread
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .wrap_err_with(|| format!("Invalid log level '{}'", settings.level))?;

    let file_layer = fmt::layer().with_ansi(false).with_target(false).with_writer(file_writer);
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    let installed = if settings.json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    };
    installed.wrap_err("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Log panics through `tracing` so they reach the log file with a backtrace
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = Backtrace::force_capture();
        let location = info.location().map(|l| l.to_string()).unwrap_or_default();
        error!(location = %location, backtrace = %backtrace, "Uncaught panic: {info}");
    }));
}
