//! Tracing setup: a console layer plus a daily-rotating file layer.
//!
//! Startup messages (config loading, validation) go through a console-only
//! bootstrap subscriber, since the file location is only known once the
//! configuration is read.

use crate::config::LoggerConfig;
use std::error::Error;
use std::path::Path;
use tracing::subscriber::DefaultGuard;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt as tfmt, EnvFilter};

/// Prefix of the rotated log files; the date is appended on rotation.
pub const LOG_FILE_PREFIX: &str = "results";
pub const LOG_FILE_SUFFIX: &str = "log";

/// Level used before the configuration has been read.
const BOOTSTRAP_LEVEL: &str = "info";

/// Install a console-only subscriber for the current thread.
///
/// The returned guard uninstalls it on drop. It shadows the global subscriber
/// installed by [`init`] until then.
pub fn bootstrap() -> DefaultGuard {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_LEVEL));
    let subscriber = tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Build the daily-rotating appender under `dir`.
///
/// # Arguments
///
/// * `dir` - Directory holding the log files. It must already exist.
///
/// # Returns
///
/// An appender writing to `results.<date>.log`, rotated at midnight UTC.
///
/// # Errors
///
/// Returns an error if the first log file cannot be created.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, Box<dyn Error>> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .build(dir)?;
    Ok(appender)
}

/// Install the global subscriber: console output filtered by `RUST_LOG` or
/// `logger.level`, and file output filtered by `logger.file_level`.
///
/// # Arguments
///
/// * `config` - The `logger` section; `config.dir` must already exist.
///
/// # Returns
///
/// The guard of the background file writer. Keep it alive for the whole run,
/// dropping it flushes buffered lines.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened, a level directive does
/// not parse, or a global subscriber is already installed.
pub fn init(config: &LoggerConfig) -> Result<WorkerGuard, Box<dyn Error>> {
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender(&config.dir)?);

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let file_filter = EnvFilter::try_new(&config.file_level)?;

    let console = tfmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(UtcTime::rfc_3339())
        .with_filter(console_filter);
    let file = tfmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_timer(UtcTime::rfc_3339())
        .with_writer(file_writer)
        .with_filter(file_filter);

    tracing_subscriber::registry().with(console).with(file).try_init()?;
    Ok(guard)
}
