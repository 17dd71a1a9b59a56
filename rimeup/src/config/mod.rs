//! User configuration stored as an INI file.
//!
//! The file lives at `<config dir>/rimeup/config.ini` and is read and written
//! through [`ConfigKey`], which enumerates every supported `section.key`.
//! [`ConfigFile::updater_config`] turns it into the library's
//! [`UpdaterConfig`].

mod keys;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::warn;

pub use keys::{expand_tilde, ArtifactField, ConfigKey};

use crate::deploy::DeployerKind;
use crate::release::ReleaseSourceKind;
use crate::updater::download::DEFAULT_TIMEOUT_SECS;
use crate::updater::{
    ArtifactKind, ArtifactSpec, ExclusionPattern, Hooks, SyncTargets, UpdaterConfig,
};

/// Files that belong to the user and survive upgrades once they exist.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "*.userdb",
    "*.custom.yaml",
    "user.yaml",
    "installation.yaml",
    "custom_phrase*.txt",
];

/// Errors from loading, saving or interpreting the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The file could not be written.
    #[error("failed to write config {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    /// The file is not valid INI.
    #[error("failed to parse config {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    /// A value failed validation.
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// No such key.
    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),
}

/// `[general]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralSettings {
    pub source: ReleaseSourceKind,
    pub rime_dir: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub proxy: Option<String>,
    pub timeout_secs: u64,
    pub github_token: Option<String>,
    pub exclude: Vec<String>,
    pub auto_deploy: bool,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            source: ReleaseSourceKind::Github,
            rime_dir: None,
            cache_dir: None,
            log_dir: None,
            proxy: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            github_token: None,
            exclude: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            auto_deploy: true,
        }
    }
}

/// `[scheme]`, `[dict]` and `[model]` sections.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArtifactSettings {
    pub owner: String,
    pub repo: String,
    pub tag: Option<String>,
    pub filename: String,
    /// Relative to the Rime directory unless absolute.
    pub dest: Option<String>,
    pub key_file: Option<String>,
}

impl ArtifactSettings {
    /// Built-in defaults for `kind`.
    pub fn defaults_for(kind: ArtifactKind) -> Self {
        match kind {
            ArtifactKind::Scheme => Self {
                owner: "amzxyz".into(),
                repo: "rime_wanxiang".into(),
                tag: None,
                filename: "rime-wanxiang-base.zip".into(),
                dest: None,
                key_file: Some("wanxiang.schema.yaml".into()),
            },
            ArtifactKind::Dict => Self {
                owner: "amzxyz".into(),
                repo: "rime_wanxiang".into(),
                tag: Some("dict-nightly".into()),
                filename: "base-dicts.zip".into(),
                dest: Some("dicts".into()),
                key_file: None,
            },
            ArtifactKind::Model => Self {
                owner: "amzxyz".into(),
                repo: "RIME-LMDG".into(),
                tag: Some("LTS".into()),
                filename: "wanxiang-lts-zh-hans.gram".into(),
                dest: None,
                key_file: Some("wanxiang-lts-zh-hans.gram".into()),
            },
        }
    }

    /// Whether enough is configured to track this artifact.
    pub fn is_enabled(&self) -> bool {
        !self.owner.is_empty() && !self.repo.is_empty() && !self.filename.is_empty()
    }
}

/// `[hooks]` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HookSettings {
    pub pre_update: Option<PathBuf>,
    pub post_update: Option<PathBuf>,
}

/// `[deploy]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploySettings {
    pub engine: String,
    pub terminate_command: Option<String>,
    pub deploy_command: Option<String>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            engine: "auto".into(),
            terminate_command: None,
            deploy_command: None,
        }
    }
}

/// `[sync]` section.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyncSettings {
    pub engine_dirs: Vec<PathBuf>,
    pub compat_dir: Option<PathBuf>,
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub general: GeneralSettings,
    pub scheme: ArtifactSettings,
    pub dict: ArtifactSettings,
    pub model: ArtifactSettings,
    pub hooks: HookSettings,
    pub deploy: DeploySettings,
    pub sync: SyncSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            scheme: ArtifactSettings::defaults_for(ArtifactKind::Scheme),
            dict: ArtifactSettings::defaults_for(ArtifactKind::Dict),
            model: ArtifactSettings::defaults_for(ArtifactKind::Model),
            hooks: HookSettings::default(),
            deploy: DeploySettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl ConfigFile {
    /// Load from the default location, or defaults when the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from `path`. Keys missing from the file keep their defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => ConfigError::Parse {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        let known = ConfigKey::all();
        let mut config = Self::default();

        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };
            for (key, value) in properties.iter() {
                let name = format!("{}.{}", section.to_lowercase(), key.to_lowercase());
                match known.iter().find(|k| k.name() == name) {
                    Some(config_key) => config_key.set(&mut config, value)?,
                    None => warn!(key = %name, "Ignoring unknown configuration key"),
                }
            }
        }

        Ok(config)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Save to `path`, creating parent directories.
    ///
    /// Empty values are written only where they override a non-empty default.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let defaults = Self::default();
        let mut ini = Ini::new();
        for key in ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() || !key.get(&defaults).is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Settings of one artifact.
    pub fn artifact(&self, kind: ArtifactKind) -> &ArtifactSettings {
        match kind {
            ArtifactKind::Scheme => &self.scheme,
            ArtifactKind::Dict => &self.dict,
            ArtifactKind::Model => &self.model,
        }
    }

    /// Mutable settings of one artifact.
    pub fn artifact_mut(&mut self, kind: ArtifactKind) -> &mut ArtifactSettings {
        match kind {
            ArtifactKind::Scheme => &mut self.scheme,
            ArtifactKind::Dict => &mut self.dict,
            ArtifactKind::Model => &mut self.model,
        }
    }

    /// Rime data directory, configured or detected.
    pub fn rime_dir(&self) -> Result<PathBuf, ConfigError> {
        self.general
            .rime_dir
            .clone()
            .or_else(default_rime_dir)
            .ok_or_else(|| ConfigError::InvalidValue {
                key: ConfigKey::GeneralRimeDir.name(),
                value: String::new(),
                reason: "could not detect the Rime data directory; set it explicitly".into(),
            })
    }

    /// Cache directory, configured or default.
    pub fn cache_dir(&self) -> PathBuf {
        self.general
            .cache_dir
            .clone()
            .unwrap_or_else(default_cache_dir)
    }

    /// Log directory, configured or `<cache>/logs`.
    pub fn log_dir(&self) -> PathBuf {
        self.general
            .log_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir().join("logs"))
    }

    /// The deployer selected by `[deploy]`.
    pub fn deployer_kind(&self) -> Result<DeployerKind, ConfigError> {
        DeployerKind::from_config(
            &self.deploy.engine,
            self.deploy.terminate_command.as_deref(),
            self.deploy.deploy_command.as_deref(),
        )
        .map_err(|reason| ConfigError::InvalidValue {
            key: ConfigKey::DeployEngine.name(),
            value: self.deploy.engine.clone(),
            reason,
        })
    }

    /// Resolve into the library configuration.
    pub fn updater_config(&self) -> Result<UpdaterConfig, ConfigError> {
        let rime_dir = self.rime_dir()?;
        let exclusions = ExclusionPattern::parse_all(&self.general.exclude).map_err(|e| {
            ConfigError::InvalidValue {
                key: ConfigKey::GeneralExclude.name(),
                value: self.general.exclude.join(", "),
                reason: e.to_string(),
            }
        })?;

        let mut config = UpdaterConfig::new(rime_dir.clone(), self.cache_dir())
            .with_source(self.general.source)
            .with_proxy(self.general.proxy.clone())
            .with_timeout(Duration::from_secs(self.general.timeout_secs))
            .with_exclusions(exclusions)
            .with_hooks(Hooks {
                pre_update: self.hooks.pre_update.clone(),
                post_update: self.hooks.post_update.clone(),
            })
            .with_sync(SyncTargets {
                engine_dirs: self.sync.engine_dirs.clone(),
                compat_dir: self.sync.compat_dir.clone(),
            });
        config.github_token = self.general.github_token.clone();
        config.auto_deploy = self.general.auto_deploy;

        for kind in ArtifactKind::ALL {
            let settings = self.artifact(kind);
            if !settings.is_enabled() {
                continue;
            }
            let dest = match settings.dest.as_deref() {
                Some(dest) => {
                    let dest = expand_tilde(dest);
                    if dest.is_absolute() {
                        dest
                    } else {
                        rime_dir.join(dest)
                    }
                }
                None => rime_dir.clone(),
            };
            let mut spec = ArtifactSpec::new(
                kind,
                settings.owner.clone(),
                settings.repo.clone(),
                settings.filename.clone(),
                dest,
            );
            spec.tag = settings.tag.clone();
            spec.key_file = settings.key_file.clone();
            config = config.with_artifact(spec);
        }

        Ok(config)
    }
}

/// `<config dir>/rimeup/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rimeup")
        .join("config.ini")
}

/// `<cache dir>/rimeup`.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("rimeup")
}

/// Platform default Rime user data directory.
pub fn default_rime_dir() -> Option<PathBuf> {
    if cfg!(target_os = "macos") {
        dirs::home_dir().map(|h| h.join("Library").join("Rime"))
    } else if cfg!(windows) {
        dirs::config_dir().map(|d| d.join("Rime"))
    } else {
        dirs::data_dir().map(|d| d.join("fcitx5").join("rime"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.dict.tag.as_deref(), Some("dict-nightly"));
        assert_eq!(config.model.tag.as_deref(), Some("LTS"));
        assert!(config.general.exclude.contains(&"*.userdb".to_string()));
        assert_eq!(config.deploy.engine, "auto");
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.ini");

        let mut config = ConfigFile::default();
        config.general.source = ReleaseSourceKind::Cnb;
        config.general.rime_dir = Some(temp.path().join("rime"));
        config.dict.filename = "pro-dicts.zip".into();
        config.model.tag = None;
        config.sync.engine_dirs = vec![temp.path().join("a"), temp.path().join("b")];
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[general]\nsource = cnb\n\n[weird]\nthing = 1\n").unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded.general.source, ReleaseSourceKind::Cnb);
        assert_eq!(loaded.scheme, ArtifactSettings::defaults_for(ArtifactKind::Scheme));
    }

    #[test]
    fn test_invalid_value_in_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[general]\ntimeout_secs = soon\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            ConfigFile::load_from(&temp.path().join("absent.ini")),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_updater_config_resolves_paths() {
        let temp = TempDir::new().unwrap();
        let rime = temp.path().join("rime");

        let mut config = ConfigFile::default();
        config.general.rime_dir = Some(rime.clone());
        config.general.cache_dir = Some(temp.path().join("cache"));
        config.model.dest = Some(temp.path().join("models").to_string_lossy().to_string());
        config.scheme.filename = String::new();

        let updater = config.updater_config().unwrap();
        assert_eq!(updater.rime_dir, rime);
        assert!(updater.artifact(ArtifactKind::Scheme).is_none());

        let dict = updater.artifact(ArtifactKind::Dict).unwrap();
        assert_eq!(dict.dest_dir, rime.join("dicts"));
        assert_eq!(dict.tag.as_deref(), Some("dict-nightly"));

        let model = updater.artifact(ArtifactKind::Model).unwrap();
        assert_eq!(model.dest_dir, temp.path().join("models"));
        assert_eq!(updater.exclusions.len(), DEFAULT_EXCLUSIONS.len());
    }

    #[test]
    fn test_log_dir_defaults_under_cache() {
        let mut config = ConfigFile::default();
        config.general.cache_dir = Some(PathBuf::from("/var/cache/rimeup"));
        assert_eq!(config.log_dir(), PathBuf::from("/var/cache/rimeup/logs"));
    }

    #[test]
    fn test_custom_deployer_from_config() {
        let mut config = ConfigFile::default();
        config.deploy.engine = "custom".into();
        assert!(config.deployer_kind().is_err());

        config.deploy.deploy_command = Some("rime_deployer --build".into());
        assert!(matches!(
            config.deployer_kind(),
            Ok(DeployerKind::Custom { .. })
        ));
    }
}
