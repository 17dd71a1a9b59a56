//! Shared setup for commands that talk to release sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rimeup::config::{config_file_path, ConfigFile};
use rimeup::deploy::Deployer;
use rimeup::logging::{init_logging, WorkerGuard};
use rimeup::updater::{CombinedUpdater, UpdaterConfig};
use tracing::info;

use crate::error::CliError;

/// Loaded configuration plus the logging guard.
pub struct CliRunner {
    config_path: PathBuf,
    config: ConfigFile,
    _log_guard: WorkerGuard,
}

impl CliRunner {
    /// Load the configuration and install logging.
    ///
    /// Must run before any other thread is spawned.
    pub fn new(config_path: Option<PathBuf>, verbose: bool) -> Result<Self, CliError> {
        let config_path = config_path.unwrap_or_else(config_file_path);
        let config = load_config(&config_path)?;
        let log_guard = init_logging(&config.log_dir(), verbose)?;

        Ok(Self {
            config_path,
            config,
            _log_guard: log_guard,
        })
    }

    /// Log the command being started.
    pub fn log_startup(&self, command: &str) {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command,
            config = %self.config_path.display(),
            "rimeup starting"
        );
    }

    /// The loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Path the configuration was loaded from.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolved updater configuration.
    pub fn updater_config(&self) -> Result<UpdaterConfig, CliError> {
        Ok(self.config.updater_config()?)
    }

    /// The configured deployer.
    pub fn deployer(&self) -> Result<Arc<dyn Deployer>, CliError> {
        let deployer: Arc<dyn Deployer> = Arc::new(self.config.deployer_kind()?);
        Ok(deployer)
    }

    /// A combined updater over every configured artifact.
    pub fn combined_updater(&self) -> Result<(UpdaterConfig, CombinedUpdater), CliError> {
        let config = self.updater_config()?;
        if config.artifacts.is_empty() {
            return Err(CliError::Config(format!(
                "No artifacts configured. Set owner, repo and filename in {}.",
                self.config_path.display()
            )));
        }
        let updater = CombinedUpdater::from_config(&config, self.deployer()?)?;
        Ok((config, updater))
    }
}

/// Load `path`, falling back to defaults when it does not exist yet.
pub fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    if path.exists() {
        Ok(ConfigFile::load_from(path)?)
    } else {
        Ok(ConfigFile::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = load_config(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_existing_config_is_parsed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[deploy]\nengine = none\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.deploy.engine, "none");
    }
}
