//! Logging setup.
//!
//! Installs a `tracing` subscriber writing to a daily rolling file and to
//! stderr. The file receives everything the filter allows; stderr only shows
//! warnings and errors so progress output stays readable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;
use tracing::Level;
use tracing_subscriber::fmt::time::OffsetTime;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub use tracing_appender::non_blocking::WorkerGuard;

/// Environment variable overriding the log filter.
pub const LOG_ENV: &str = "RIMEUP_LOG";

/// Base name of the rolling log file.
pub const LOG_FILE_NAME: &str = "rimeup.log";

/// Errors from [`init_logging`].
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory could not be created.
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Init(String),
}

/// Default filter directive.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "rimeup=debug,info"
    } else {
        "info"
    }
}

/// Install the global subscriber.
///
/// Must be called before any threads are spawned; the local UTC offset can
/// only be determined reliably in a single-threaded process. Keep the
/// returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(log_dir: &Path, verbose: bool) -> Result<WorkerGuard, LoggingError> {
    fs::create_dir_all(log_dir).map_err(|e| LoggingError::CreateDir {
        path: log_dir.to_path_buf(),
        source: e,
    })?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let timer = OffsetTime::local_rfc_3339()
        .unwrap_or_else(|_| OffsetTime::new(UtcOffset::UTC, Rfc3339));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_timer(timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr.with_max_level(Level::WARN))
        .with_target(false)
        .with_timer(timer)
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(false), "info");
        assert!(default_directive(true).contains("rimeup=debug"));
    }

    #[test]
    fn test_init_creates_log_dir_and_rejects_second_init() {
        let temp = TempDir::new().unwrap();
        let log_dir = temp.path().join("logs");

        let guard = init_logging(&log_dir, false).unwrap();
        assert!(log_dir.is_dir());

        let second = init_logging(&log_dir, false);
        assert!(matches!(second, Err(LoggingError::Init(_))));
        drop(guard);
    }
}
