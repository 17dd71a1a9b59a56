//! Best-effort copies of an updated artifact into secondary locations.
//!
//! Some setups run a second Rime frontend (e.g. fcitx5 next to ibus) with its
//! own data directory, and some model consumers read from a compatibility
//! directory. Engine directories receive the artifact itself, never the rest
//! of the primary Rime directory. These copies never fail an update; failures
//! are returned as messages for logging and progress reporting. Stale-member
//! pruning is not applied to these locations.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::{UpdateError, UpdateResult};

/// Extra locations that receive a copy after each successful update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncTargets {
    /// Data directories of secondary input method engines.
    pub engine_dirs: Vec<PathBuf>,
    /// Directory that also receives the model file.
    pub compat_dir: Option<PathBuf>,
}

impl SyncTargets {
    /// Whether nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.engine_dirs.is_empty() && self.compat_dir.is_none()
    }

    /// Where `dest` lives inside each engine directory, keeping its position
    /// relative to `rime_dir`.
    pub fn engine_targets(&self, rime_dir: &Path, dest: &Path) -> Vec<PathBuf> {
        let relative = dest.strip_prefix(rime_dir).unwrap_or(Path::new(""));
        self.engine_dirs
            .iter()
            .map(|engine_dir| {
                if relative.as_os_str().is_empty() {
                    engine_dir.clone()
                } else {
                    engine_dir.join(relative)
                }
            })
            .collect()
    }

    /// Run `install` against the counterpart of `dest` in every engine
    /// directory.
    ///
    /// `install` decides what lands there, so an archive is re-applied with
    /// its exclusion rules instead of mirroring the whole destination.
    /// Returns one message per failed target.
    pub fn sync_engines<F>(&self, rime_dir: &Path, dest: &Path, mut install: F) -> Vec<String>
    where
        F: FnMut(&Path) -> UpdateResult<()>,
    {
        let mut failures = Vec::new();

        for target in self.engine_targets(rime_dir, dest) {
            if let Err(e) = install(&target) {
                warn!(target = %target.display(), error = %e, "Engine sync failed");
                failures.push(format!("{}: {}", target.display(), e));
            } else {
                debug!(target = %target.display(), "Engine directory synced");
            }
        }

        failures
    }

    /// Copy a model file into the compatibility directory.
    pub fn sync_compat(&self, model_file: &Path) -> Option<String> {
        let dir = self.compat_dir.as_ref()?;
        let name = model_file.file_name()?;
        let target = dir.join(name);

        match copy_file(model_file, &target) {
            Ok(()) => {
                debug!(target = %target.display(), "Compatibility directory synced");
                None
            }
            Err(e) => {
                warn!(target = %target.display(), error = %e, "Compatibility sync failed");
                Some(format!("{}: {}", target.display(), e))
            }
        }
    }
}

/// Copy a single file to `dest`, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> UpdateResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    fs::copy(source, dest).map_err(|e| UpdateError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
