//! Restarting or reloading the input method after its data changed.
//!
//! Each supported frontend is a variant of [`DeployerKind`], chosen once at
//! startup from configuration or platform detection. Everything else talks to
//! the [`Deployer`] trait, so tests can substitute a recording fake.

mod command;

use std::fmt;
use std::path::PathBuf;

use tracing::info;

pub use command::CommandSpec;

use crate::updater::UpdateResult;

/// Capability to stop and redeploy the consumer of the Rime data directory.
pub trait Deployer: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Stop the running consumer, if the frontend needs that before a rebuild.
    fn terminate_consumer(&self) -> UpdateResult<()>;

    /// Trigger a reload/rebuild from the data directory.
    fn deploy(&self) -> UpdateResult<()>;
}

/// Terminate then deploy.
pub fn redeploy(deployer: &dyn Deployer) -> UpdateResult<()> {
    info!(deployer = deployer.name(), "Deploying");
    deployer.terminate_consumer()?;
    deployer.deploy()?;
    info!(deployer = deployer.name(), "Deploy finished");
    Ok(())
}

/// Default Squirrel executable on macOS.
pub const SQUIRREL_BIN: &str = "/Library/Input Methods/Squirrel.app/Contents/MacOS/Squirrel";

/// Supported frontends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployerKind {
    /// fcitx5 with fcitx5-rime; reloaded in place.
    Fcitx5,
    /// ibus with ibus-rime; the daemon is replaced.
    Ibus,
    /// Squirrel on macOS.
    Squirrel,
    /// Weasel on Windows. `install_dir` holds the Weasel executables; when
    /// unset they are looked up on `PATH`.
    Weasel { install_dir: Option<PathBuf> },
    /// User-provided shell commands.
    Custom {
        terminate: Option<String>,
        deploy: String,
    },
    /// Do nothing.
    None,
}

impl DeployerKind {
    /// Pick the frontend for the current platform.
    pub fn detect() -> Self {
        if cfg!(target_os = "macos") {
            Self::Squirrel
        } else if cfg!(windows) {
            Self::Weasel { install_dir: None }
        } else {
            let ibus = ["XMODIFIERS", "GTK_IM_MODULE", "QT_IM_MODULE"]
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .any(|v| v.to_lowercase().contains("ibus"));
            if ibus {
                Self::Ibus
            } else {
                Self::Fcitx5
            }
        }
    }

    /// Build from the `[deploy]` config values.
    pub fn from_config(
        engine: &str,
        terminate_command: Option<&str>,
        deploy_command: Option<&str>,
    ) -> Result<Self, String> {
        match engine.trim().to_lowercase().as_str() {
            "" | "auto" => Ok(Self::detect()),
            "fcitx5" | "fcitx" => Ok(Self::Fcitx5),
            "ibus" => Ok(Self::Ibus),
            "squirrel" => Ok(Self::Squirrel),
            "weasel" => Ok(Self::Weasel { install_dir: None }),
            "custom" => match non_empty(deploy_command) {
                Some(deploy) => Ok(Self::Custom {
                    terminate: non_empty(terminate_command).map(String::from),
                    deploy: deploy.to_string(),
                }),
                None => Err("engine 'custom' requires deploy.deploy_command".to_string()),
            },
            "none" | "off" => Ok(Self::None),
            other => Err(format!("unknown deploy engine '{}'", other)),
        }
    }

    fn weasel_bin(install_dir: &Option<PathBuf>, exe: &str) -> String {
        match install_dir {
            Some(dir) => dir.join(exe).to_string_lossy().to_string(),
            None => exe.to_string(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl fmt::Display for DeployerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Deployer for DeployerKind {
    fn name(&self) -> &str {
        match self {
            Self::Fcitx5 => "fcitx5",
            Self::Ibus => "ibus",
            Self::Squirrel => "squirrel",
            Self::Weasel { .. } => "weasel",
            Self::Custom { .. } => "custom",
            Self::None => "none",
        }
    }

    fn terminate_consumer(&self) -> UpdateResult<()> {
        match self {
            Self::Weasel { install_dir } => {
                CommandSpec::new(Self::weasel_bin(install_dir, "WeaselServer.exe"), ["/q"]).run()
            }
            Self::Custom {
                terminate: Some(line),
                ..
            } => CommandSpec::shell(line.clone()).run(),
            _ => Ok(()),
        }
    }

    fn deploy(&self) -> UpdateResult<()> {
        match self {
            Self::Fcitx5 => CommandSpec::new("fcitx5-remote", ["-r"]).run(),
            Self::Ibus => CommandSpec::new("ibus-daemon", ["-drx"]).run(),
            Self::Squirrel => CommandSpec::new(SQUIRREL_BIN, ["--reload"]).run(),
            Self::Weasel { install_dir } => {
                CommandSpec::new(
                    Self::weasel_bin(install_dir, "WeaselDeployer.exe"),
                    ["/deploy"],
                )
                .run()?;
                CommandSpec::new(
                    Self::weasel_bin(install_dir, "WeaselServer.exe"),
                    Vec::<String>::new(),
                )
                .spawn_detached()
            }
            Self::Custom { deploy, .. } => CommandSpec::shell(deploy.clone()).run(),
            Self::None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_named_engines() {
        assert_eq!(
            DeployerKind::from_config("fcitx5", None, None),
            Ok(DeployerKind::Fcitx5)
        );
        assert_eq!(
            DeployerKind::from_config("IBus", None, None),
            Ok(DeployerKind::Ibus)
        );
        assert_eq!(
            DeployerKind::from_config("none", None, None),
            Ok(DeployerKind::None)
        );
        assert!(DeployerKind::from_config("kime", None, None).is_err());
    }

    #[test]
    fn test_custom_requires_deploy_command() {
        assert!(DeployerKind::from_config("custom", Some("pkill x"), None).is_err());
        assert!(DeployerKind::from_config("custom", None, Some("  ")).is_err());

        let kind = DeployerKind::from_config("custom", Some(""), Some("rime_deployer")).unwrap();
        assert_eq!(
            kind,
            DeployerKind::Custom {
                terminate: None,
                deploy: "rime_deployer".into()
            }
        );
    }

    #[test]
    fn test_auto_detects_something() {
        let kind = DeployerKind::from_config("auto", None, None).unwrap();
        assert_ne!(kind, DeployerKind::None);
    }

    #[test]
    fn test_none_is_noop() {
        assert!(redeploy(&DeployerKind::None).is_ok());
    }

    #[test]
    fn test_weasel_paths() {
        let dir = Some(PathBuf::from("C:/Rime/weasel-0.16"));
        let server = DeployerKind::weasel_bin(&dir, "WeaselServer.exe");
        assert!(server.ends_with("WeaselServer.exe"));
        assert!(server.starts_with("C:/Rime"));
        assert_eq!(
            DeployerKind::weasel_bin(&None, "WeaselDeployer.exe"),
            "WeaselDeployer.exe"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_custom_runs_terminate_then_deploy() {
        let temp = tempfile::TempDir::new().unwrap();
        let log = temp.path().join("order.txt");
        let kind = DeployerKind::Custom {
            terminate: Some(format!("echo stop >> {}", log.display())),
            deploy: format!("echo deploy >> {}", log.display()),
        };

        redeploy(&kind).unwrap();
        let order = std::fs::read_to_string(&log).unwrap();
        assert_eq!(order.lines().collect::<Vec<_>>(), vec!["stop", "deploy"]);
    }
}
