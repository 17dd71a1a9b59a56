//! Settable configuration keys.
//!
//! Every key a user can `get` or `set` is a variant here. Loading and saving
//! the INI file also goes through these keys, so the file format and the CLI
//! can never disagree about what exists.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::{ConfigError, ConfigFile};
use crate::deploy::DeployerKind;
use crate::release::ReleaseSourceKind;
use crate::updater::{ArtifactKind, ExclusionPattern};

/// Per-artifact settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactField {
    Owner,
    Repo,
    Tag,
    Filename,
    Dest,
    KeyFile,
}

impl ArtifactField {
    const ALL: [ArtifactField; 6] = [
        Self::Owner,
        Self::Repo,
        Self::Tag,
        Self::Filename,
        Self::Dest,
        Self::KeyFile,
    ];

    fn key_name(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Repo => "repo",
            Self::Tag => "tag",
            Self::Filename => "filename",
            Self::Dest => "dest",
            Self::KeyFile => "key_file",
        }
    }
}

/// A `section.key` configuration entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    GeneralSource,
    GeneralRimeDir,
    GeneralCacheDir,
    GeneralLogDir,
    GeneralProxy,
    GeneralTimeoutSecs,
    GeneralGithubToken,
    GeneralExclude,
    GeneralAutoDeploy,
    Artifact(ArtifactKind, ArtifactField),
    HooksPreUpdate,
    HooksPostUpdate,
    DeployEngine,
    DeployTerminateCommand,
    DeployDeployCommand,
    SyncEngineDirs,
    SyncCompatDir,
}

impl ConfigKey {
    /// Every key, grouped by section in file order.
    pub fn all() -> Vec<ConfigKey> {
        let mut keys = vec![
            Self::GeneralSource,
            Self::GeneralRimeDir,
            Self::GeneralCacheDir,
            Self::GeneralLogDir,
            Self::GeneralProxy,
            Self::GeneralTimeoutSecs,
            Self::GeneralGithubToken,
            Self::GeneralExclude,
            Self::GeneralAutoDeploy,
        ];
        for kind in ArtifactKind::ALL {
            keys.extend(ArtifactField::ALL.iter().map(|f| Self::Artifact(kind, *f)));
        }
        keys.extend([
            Self::HooksPreUpdate,
            Self::HooksPostUpdate,
            Self::DeployEngine,
            Self::DeployTerminateCommand,
            Self::DeployDeployCommand,
            Self::SyncEngineDirs,
            Self::SyncCompatDir,
        ]);
        keys
    }

    /// INI section.
    pub fn section(&self) -> &'static str {
        match self {
            Self::GeneralSource
            | Self::GeneralRimeDir
            | Self::GeneralCacheDir
            | Self::GeneralLogDir
            | Self::GeneralProxy
            | Self::GeneralTimeoutSecs
            | Self::GeneralGithubToken
            | Self::GeneralExclude
            | Self::GeneralAutoDeploy => "general",
            Self::Artifact(kind, _) => kind.label(),
            Self::HooksPreUpdate | Self::HooksPostUpdate => "hooks",
            Self::DeployEngine | Self::DeployTerminateCommand | Self::DeployDeployCommand => {
                "deploy"
            }
            Self::SyncEngineDirs | Self::SyncCompatDir => "sync",
        }
    }

    /// Key within its section.
    pub fn key_name(&self) -> &'static str {
        match self {
            Self::GeneralSource => "source",
            Self::GeneralRimeDir => "rime_dir",
            Self::GeneralCacheDir => "cache_dir",
            Self::GeneralLogDir => "log_dir",
            Self::GeneralProxy => "proxy",
            Self::GeneralTimeoutSecs => "timeout_secs",
            Self::GeneralGithubToken => "github_token",
            Self::GeneralExclude => "exclude",
            Self::GeneralAutoDeploy => "auto_deploy",
            Self::Artifact(_, field) => field.key_name(),
            Self::HooksPreUpdate => "pre_update",
            Self::HooksPostUpdate => "post_update",
            Self::DeployEngine => "engine",
            Self::DeployTerminateCommand => "terminate_command",
            Self::DeployDeployCommand => "deploy_command",
            Self::SyncEngineDirs => "engine_dirs",
            Self::SyncCompatDir => "compat_dir",
        }
    }

    /// `section.key`.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    /// Whether `get` should mask the value.
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::GeneralGithubToken)
    }

    /// Current value rendered as it is stored in the file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        let general = &config.general;
        match self {
            Self::GeneralSource => general.source.config_value().to_string(),
            Self::GeneralRimeDir => path_string(&general.rime_dir),
            Self::GeneralCacheDir => path_string(&general.cache_dir),
            Self::GeneralLogDir => path_string(&general.log_dir),
            Self::GeneralProxy => general.proxy.clone().unwrap_or_default(),
            Self::GeneralTimeoutSecs => general.timeout_secs.to_string(),
            Self::GeneralGithubToken => general.github_token.clone().unwrap_or_default(),
            Self::GeneralExclude => general.exclude.join(", "),
            Self::GeneralAutoDeploy => general.auto_deploy.to_string(),
            Self::Artifact(kind, field) => {
                let a = config.artifact(*kind);
                match field {
                    ArtifactField::Owner => a.owner.clone(),
                    ArtifactField::Repo => a.repo.clone(),
                    ArtifactField::Tag => a.tag.clone().unwrap_or_default(),
                    ArtifactField::Filename => a.filename.clone(),
                    ArtifactField::Dest => a.dest.clone().unwrap_or_default(),
                    ArtifactField::KeyFile => a.key_file.clone().unwrap_or_default(),
                }
            }
            Self::HooksPreUpdate => path_string(&config.hooks.pre_update),
            Self::HooksPostUpdate => path_string(&config.hooks.post_update),
            Self::DeployEngine => config.deploy.engine.clone(),
            Self::DeployTerminateCommand => {
                config.deploy.terminate_command.clone().unwrap_or_default()
            }
            Self::DeployDeployCommand => config.deploy.deploy_command.clone().unwrap_or_default(),
            Self::SyncEngineDirs => config
                .sync
                .engine_dirs
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Self::SyncCompatDir => path_string(&config.sync.compat_dir),
        }
    }

    /// Validate and store `value`. An empty value clears optional settings.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let value = value.trim();
        let invalid = |reason: String| ConfigError::InvalidValue {
            key: self.name(),
            value: value.to_string(),
            reason,
        };

        match self {
            Self::GeneralSource => {
                config.general.source = value.parse::<ReleaseSourceKind>().map_err(invalid)?;
            }
            Self::GeneralRimeDir => config.general.rime_dir = optional_path(value),
            Self::GeneralCacheDir => config.general.cache_dir = optional_path(value),
            Self::GeneralLogDir => config.general.log_dir = optional_path(value),
            Self::GeneralProxy => config.general.proxy = optional(value),
            Self::GeneralTimeoutSecs => {
                let secs: u64 = value
                    .parse()
                    .map_err(|e: std::num::ParseIntError| invalid(e.to_string()))?;
                if secs == 0 {
                    return Err(invalid("must be greater than zero".to_string()));
                }
                config.general.timeout_secs = secs;
            }
            Self::GeneralGithubToken => config.general.github_token = optional(value),
            Self::GeneralExclude => {
                let patterns = split_list(value);
                ExclusionPattern::parse_all(&patterns).map_err(|e| invalid(e.to_string()))?;
                config.general.exclude = patterns;
            }
            Self::GeneralAutoDeploy => {
                config.general.auto_deploy = parse_bool(value).ok_or_else(|| {
                    invalid("expected true/false, yes/no, on/off or 1/0".to_string())
                })?;
            }
            Self::Artifact(kind, field) => {
                let a = config.artifact_mut(*kind);
                match field {
                    ArtifactField::Owner => a.owner = value.to_string(),
                    ArtifactField::Repo => a.repo = value.to_string(),
                    ArtifactField::Tag => a.tag = optional(value),
                    ArtifactField::Filename => a.filename = value.to_string(),
                    ArtifactField::Dest => a.dest = optional(value),
                    ArtifactField::KeyFile => a.key_file = optional(value),
                }
            }
            Self::HooksPreUpdate => config.hooks.pre_update = optional_path(value),
            Self::HooksPostUpdate => config.hooks.post_update = optional_path(value),
            Self::DeployEngine => {
                let engine = if value.is_empty() {
                    "auto".to_string()
                } else {
                    value.to_lowercase()
                };
                // Validate the name only; `custom` commands may be set afterwards.
                if engine != "custom" {
                    DeployerKind::from_config(&engine, None, None).map_err(invalid)?;
                }
                config.deploy.engine = engine;
            }
            Self::DeployTerminateCommand => config.deploy.terminate_command = optional(value),
            Self::DeployDeployCommand => config.deploy.deploy_command = optional(value),
            Self::SyncEngineDirs => {
                config.sync.engine_dirs = split_list(value).iter().map(|s| expand_tilde(s)).collect();
            }
            Self::SyncCompatDir => config.sync.compat_dir = optional_path(value),
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section(), self.key_name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn optional_path(value: &str) -> Option<PathBuf> {
    (!value.is_empty()).then(|| expand_tilde(value))
}

fn path_string(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~/` to the home directory.
pub fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(value),
        },
        None => PathBuf::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!(
            "general.source".parse::<ConfigKey>().unwrap(),
            ConfigKey::GeneralSource
        );
        assert_eq!(
            "DICT.tag".parse::<ConfigKey>().unwrap(),
            ConfigKey::Artifact(ArtifactKind::Dict, ArtifactField::Tag)
        );
        assert!(matches!(
            "general.nope".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_names_round_trip() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();

        ConfigKey::GeneralSource.set(&mut config, "cnb").unwrap();
        assert_eq!(ConfigKey::GeneralSource.get(&config), "cnb");

        ConfigKey::GeneralExclude
            .set(&mut config, "*.userdb, user.yaml ,")
            .unwrap();
        assert_eq!(config.general.exclude, vec!["*.userdb", "user.yaml"]);

        let tag = ConfigKey::Artifact(ArtifactKind::Model, ArtifactField::Tag);
        tag.set(&mut config, "").unwrap();
        assert_eq!(tag.get(&config), "");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::GeneralSource.set(&mut config, "gitee").is_err());
        assert!(ConfigKey::GeneralTimeoutSecs.set(&mut config, "0").is_err());
        assert!(ConfigKey::GeneralTimeoutSecs.set(&mut config, "abc").is_err());
        assert!(ConfigKey::GeneralAutoDeploy.set(&mut config, "maybe").is_err());
        assert!(ConfigKey::GeneralExclude.set(&mut config, "regex:(").is_err());
        assert!(ConfigKey::DeployEngine.set(&mut config, "kime").is_err());
    }

    #[test]
    fn test_bool_spellings() {
        let mut config = ConfigFile::default();
        ConfigKey::GeneralAutoDeploy.set(&mut config, "off").unwrap();
        assert!(!config.general.auto_deploy);
        ConfigKey::GeneralAutoDeploy.set(&mut config, "YES").unwrap();
        assert!(config.general.auto_deploy);
    }

    #[test]
    fn test_secret_key() {
        assert!(ConfigKey::GeneralGithubToken.is_secret());
        assert!(!ConfigKey::GeneralProxy.is_secret());
    }
}
