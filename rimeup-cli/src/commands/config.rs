//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path` for
//! viewing and modifying settings from the command line.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use rimeup::config::{config_file_path, ConfigKey};

use crate::error::CliError;
use crate::runner::load_config;

/// Shown instead of secret values.
const MASKED: &str = "********";

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., dict.tag)
        key: String,
    },

    /// Set a configuration value (an empty value clears optional settings)
    Set {
        /// Configuration key in format section.key (e.g., general.source)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand against `path`, or the default file.
pub fn run(command: ConfigCommands, path: Option<PathBuf>) -> Result<(), CliError> {
    let path = path.unwrap_or_else(config_file_path);
    match command {
        ConfigCommands::Get { key } => run_get(&path, &key),
        ConfigCommands::Set { key, value } => run_set(&path, &key, &value),
        ConfigCommands::List => run_list(&path),
        ConfigCommands::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'rimeup config list' to see available keys.",
            key
        ))
    })
}

fn display_value(key: ConfigKey, value: &str) -> String {
    if value.is_empty() {
        "(not set)".to_string()
    } else if key.is_secret() {
        MASKED.to_string()
    } else {
        value.to_string()
    }
}

fn run_get(path: &Path, key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = load_config(path)?;

    // `get` prints secrets in full; `list` masks them.
    let value = config_key.get(&config);
    if value.is_empty() {
        println!("(not set)");
    } else {
        println!("{}", value);
    }
    Ok(())
}

fn run_set(path: &Path, key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let mut config = load_config(path)?;

    config_key
        .set(&mut config, value)
        .map_err(|e| CliError::Config(e.to_string()))?;
    config.save_to(path)?;

    let stored = config_key.get(&config);
    println!("Set {} = {}", config_key, display_value(config_key, &stored));
    Ok(())
}

fn run_list(path: &Path) -> Result<(), CliError> {
    let config = load_config(path)?;

    println!("Configuration Settings ({})", path.display());
    println!("======================");
    println!();

    let mut current_section = "";
    for key in ConfigKey::all() {
        let section = key.section();
        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }
        println!(
            "  {} = {}",
            key.key_name(),
            display_value(key, &key.get(&config))
        );
    }
    Ok(())
}
