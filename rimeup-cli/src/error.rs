//! CLI error type.

use std::io;

use rimeup::config::ConfigError;
use rimeup::logging::LoggingError;
use rimeup::updater::UpdateError;
use thiserror::Error;

/// Errors surfaced to the user by `main`.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Update(#[from] UpdateError),

    #[error(transparent)]
    ConfigFile(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration or arguments.
    #[error("{0}")]
    Config(String),

    /// Interaction failed (prompt, signal handler).
    #[error("{0}")]
    Interaction(String),
}
