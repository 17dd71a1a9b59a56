//! Removal of files dropped from an archive between two versions.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::error::{UpdateError, UpdateResult};
use super::extractor::{collapse_nested_member, list_members};

/// Remove from `dest_dir` every file that was a member of `old_archive` but
/// is not a member of `new_archive`.
///
/// Member names are compared after collapsing the redundant `<stem>/<stem>/`
/// level, i.e. where the files actually live once extracted. Does nothing
/// when the old archive is missing (first install). Returns the number of
/// files removed.
pub fn prune_stale_members(
    old_archive: &Path,
    new_archive: &Path,
    dest_dir: &Path,
    stem: &str,
) -> UpdateResult<usize> {
    if !old_archive.is_file() {
        debug!(old = %old_archive.display(), "No previous archive, nothing to prune");
        return Ok(0);
    }

    let old_members = installed_members(old_archive, stem)?;
    let new_members = installed_members(new_archive, stem)?;

    let mut removed = 0;
    for stale in old_members.difference(&new_members) {
        let path = dest_dir.join(stale);
        if !path.is_file() {
            continue;
        }
        fs::remove_file(&path).map_err(|e| UpdateError::PruneFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), "Removed stale member");
        removed += 1;
    }

    if removed > 0 {
        info!(removed, dest = %dest_dir.display(), "Pruned stale archive members");
    }
    Ok(removed)
}

fn installed_members(archive: &Path, stem: &str) -> UpdateResult<BTreeSet<String>> {
    let members = list_members(archive).map_err(|e| prune_error(archive, e))?;
    Ok(members
        .iter()
        .map(|m| collapse_nested_member(m, stem))
        .collect())
}

fn prune_error(archive: &Path, err: UpdateError) -> UpdateError {
    UpdateError::PruneFailed {
        path: archive.to_path_buf(),
        reason: err.to_string(),
    }
}
