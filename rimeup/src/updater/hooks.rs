//! User-configured scripts run around an update.
//!
//! The pre-update hook is a hard gate: a non-zero exit aborts the run before
//! anything is modified. The post-update hook is advisory and only logged.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{info, warn};

use super::error::{UpdateError, UpdateResult};
use super::kind::ArtifactKind;

/// Context exported to hooks through environment variables.
#[derive(Debug, Clone)]
pub struct HookContext<'a> {
    /// Artifact being updated (`RIMEUP_KIND`).
    pub kind: ArtifactKind,
    /// Tag being applied (`RIMEUP_TAG`).
    pub tag: &'a str,
    /// Destination directory (`RIMEUP_DEST`).
    pub dest: &'a Path,
}

/// Configured hook executables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hooks {
    /// Runs before any mutation; failure aborts the run.
    pub pre_update: Option<PathBuf>,
    /// Runs after the record is written; failure is logged only.
    pub post_update: Option<PathBuf>,
}

impl Hooks {
    /// Run the pre-update hook if configured.
    pub fn run_pre_update(&self, ctx: &HookContext<'_>) -> UpdateResult<()> {
        let Some(hook) = &self.pre_update else {
            return Ok(());
        };

        info!(hook = %hook.display(), kind = %ctx.kind, "Running pre-update hook");
        run_hook(hook, ctx).map_err(|reason| UpdateError::HookAborted {
            hook: hook.clone(),
            reason,
        })
    }

    /// Run the post-update hook if configured.
    ///
    /// Returns the failure message, if any, so callers can surface it.
    pub fn run_post_update(&self, ctx: &HookContext<'_>) -> Option<String> {
        let hook = self.post_update.as_ref()?;

        info!(hook = %hook.display(), kind = %ctx.kind, "Running post-update hook");
        match run_hook(hook, ctx) {
            Ok(()) => None,
            Err(reason) => {
                warn!(hook = %hook.display(), %reason, "Post-update hook failed");
                Some(reason)
            }
        }
    }
}

fn run_hook(hook: &Path, ctx: &HookContext<'_>) -> Result<(), String> {
    let output = Command::new(hook)
        .env("RIMEUP_KIND", ctx.kind.label())
        .env("RIMEUP_TAG", ctx.tag)
        .env("RIMEUP_DEST", ctx.dest)
        .output()
        .map_err(|e| format!("failed to start: {}", e))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(match output.status.code() {
        Some(code) => format!("exited with status {}: {}", code, stderr.trim()),
        None => format!("terminated by signal: {}", stderr.trim()),
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn ctx(dest: &Path) -> HookContext<'_> {
        HookContext {
            kind: ArtifactKind::Dict,
            tag: "dict-nightly",
            dest,
        }
    }

    #[test]
    fn test_no_hooks_is_ok() {
        let hooks = Hooks::default();
        let dest = PathBuf::from("/tmp");
        assert!(hooks.run_pre_update(&ctx(&dest)).is_ok());
        assert!(hooks.run_post_update(&ctx(&dest)).is_none());
    }

    #[test]
    fn test_failing_pre_hook_aborts() {
        let temp = TempDir::new().unwrap();
        let hooks = Hooks {
            pre_update: Some(script(temp.path(), "pre.sh", "echo busy >&2; exit 3")),
            post_update: None,
        };

        let err = hooks.run_pre_update(&ctx(temp.path())).unwrap_err();
        match err {
            UpdateError::HookAborted { reason, .. } => {
                assert!(reason.contains("status 3"));
                assert!(reason.contains("busy"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hook_receives_environment() {
        let temp = TempDir::new().unwrap();
        let marker = temp.path().join("env.txt");
        let body = format!(
            "echo \"$RIMEUP_KIND $RIMEUP_TAG\" > {}",
            marker.display()
        );
        let hooks = Hooks {
            pre_update: Some(script(temp.path(), "pre.sh", &body)),
            post_update: None,
        };

        hooks.run_pre_update(&ctx(temp.path())).unwrap();
        assert_eq!(fs::read_to_string(marker).unwrap().trim(), "dict dict-nightly");
    }

    #[test]
    fn test_failing_post_hook_is_reported_not_raised() {
        let temp = TempDir::new().unwrap();
        let hooks = Hooks {
            pre_update: None,
            post_update: Some(script(temp.path(), "post.sh", "exit 1")),
        };

        let failure = hooks.run_post_update(&ctx(temp.path()));
        assert!(failure.unwrap().contains("status 1"));
    }

    #[test]
    fn test_missing_hook_executable_aborts() {
        let hooks = Hooks {
            pre_update: Some(PathBuf::from("/nonexistent/hook.sh")),
            post_update: None,
        };
        let dest = PathBuf::from("/tmp");
        assert!(matches!(
            hooks.run_pre_update(&ctx(&dest)),
            Err(UpdateError::HookAborted { .. })
        ));
    }
}
