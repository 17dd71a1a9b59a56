//! Selective zip extraction.
//!
//! An archive entry is skipped only when it matches an exclusion pattern AND a
//! file already exists at its destination. A fresh install therefore always
//! receives the shipped defaults while an upgrade never clobbers a protected
//! user file. Directory entries are always created.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use zip::ZipArchive;

use super::error::{UpdateError, UpdateResult};
use super::exclusion::{is_excluded, ExclusionPattern};

/// Suffix of the temporary directory used while hoisting nested content.
const HOIST_SUFFIX: &str = ".rimeup-hoist";

/// Counts from one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files written from the archive.
    pub written: usize,
    /// Files left untouched because they are protected user copies.
    pub preserved: usize,
    /// Directories created or confirmed.
    pub directories: usize,
}

/// Zip extractor honoring exclusion patterns.
#[derive(Debug, Clone, Default)]
pub struct SelectiveExtractor {
    patterns: Vec<ExclusionPattern>,
}

impl SelectiveExtractor {
    /// Create an extractor protecting files that match `patterns`.
    pub fn new(patterns: Vec<ExclusionPattern>) -> Self {
        Self { patterns }
    }

    /// The configured exclusion patterns.
    pub fn patterns(&self) -> &[ExclusionPattern] {
        &self.patterns
    }

    /// Extract `archive_path` into `dest_dir`.
    pub fn extract(&self, archive_path: &Path, dest_dir: &Path) -> UpdateResult<ExtractSummary> {
        fs::create_dir_all(dest_dir).map_err(|e| UpdateError::CreateDirFailed {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;

        let mut archive = open_archive(archive_path)?;
        let mut summary = ExtractSummary::default();

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| extraction_error(archive_path, e))?;

            // Entries escaping the destination (absolute or `..`) are ignored.
            let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
                debug!(name = entry.name(), "Skipping unsafe archive entry");
                continue;
            };
            let out_path = dest_dir.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&out_path).map_err(|e| UpdateError::CreateDirFailed {
                    path: out_path.clone(),
                    source: e,
                })?;
                summary.directories += 1;
                continue;
            }

            let relative_str = relative.to_string_lossy();
            if out_path.exists() && is_excluded(&self.patterns, &relative_str) {
                debug!(path = %relative_str, "Preserving existing user file");
                summary.preserved += 1;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDirFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }

            let mut out_file = File::create(&out_path).map_err(|e| UpdateError::WriteFailed {
                path: out_path.clone(),
                source: e,
            })?;
            io::copy(&mut entry, &mut out_file).map_err(|e| UpdateError::ExtractionFailed {
                path: archive_path.to_path_buf(),
                reason: format!("failed to write {}: {}", out_path.display(), e),
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode().map(|m| m & 0o7777).filter(|m| m & 0o777 != 0) {
                    fs::set_permissions(&out_path, fs::Permissions::from_mode(mode)).map_err(
                        |e| UpdateError::WriteFailed {
                            path: out_path.clone(),
                            source: e,
                        },
                    )?;
                }
            }

            summary.written += 1;
        }

        info!(
            archive = %archive_path.display(),
            written = summary.written,
            preserved = summary.preserved,
            "Archive extracted"
        );
        Ok(summary)
    }
}

/// List the file members of an archive as `/`-separated relative paths.
///
/// Directory entries and unsafe names are left out.
pub fn list_members(archive_path: &Path) -> UpdateResult<BTreeSet<String>> {
    let mut archive = open_archive(archive_path)?;
    let mut members = BTreeSet::new();

    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| extraction_error(archive_path, e))?;
        if entry.is_dir() {
            continue;
        }
        if let Some(relative) = entry.enclosed_name() {
            members.insert(relative.to_string_lossy().replace('\\', "/"));
        }
    }

    Ok(members)
}

/// Where an archive member lands once [`normalize_nested`] has run.
///
/// `<stem>/<stem>/rest` becomes `<stem>/rest`; other names are unchanged.
pub fn collapse_nested_member(member: &str, stem: &str) -> String {
    if stem.is_empty() {
        return member.to_string();
    }
    let nested = format!("{}/{}/", stem, stem);
    match member.strip_prefix(&nested) {
        Some(rest) => format!("{}/{}", stem, rest),
        None => member.to_string(),
    }
}

/// Collapse one redundant nesting level produced by some mirror packages.
///
/// When `dest/<stem>/<stem>/` exists, its contents are merged up into
/// `dest/<stem>/` and the inner directory is removed. The inner directory is
/// first renamed to a temporary name so no path is both the source and the
/// target of a move. Existing directories are merged, never replaced, and an
/// existing file matching `patterns` keeps the user's copy. Returns whether
/// anything was hoisted.
pub fn normalize_nested(
    dest_dir: &Path,
    stem: &str,
    patterns: &[ExclusionPattern],
) -> UpdateResult<bool> {
    if stem.is_empty() {
        return Ok(false);
    }

    let outer = dest_dir.join(stem);
    let inner = outer.join(stem);
    if !inner.is_dir() {
        return Ok(false);
    }

    let staging = outer.join(format!("{}{}", stem, HOIST_SUFFIX));
    if staging.exists() {
        fs::remove_dir_all(&staging).map_err(|e| hoist_error(&staging, e))?;
    }
    fs::rename(&inner, &staging).map_err(|e| hoist_error(&inner, e))?;

    let preserved = merge_dir(&staging, &outer, stem, patterns)?;

    // Only shipped copies of preserved files remain.
    fs::remove_dir_all(&staging).map_err(|e| hoist_error(&staging, e))?;
    info!(dir = %outer.display(), preserved, "Collapsed redundant nested directory");
    Ok(true)
}

/// Move the contents of `source` into `target`, recursing into directories
/// present on both sides. `relative` is `target` relative to the extraction
/// root, used for exclusion matching. Returns the number of preserved files.
fn merge_dir(
    source: &Path,
    target: &Path,
    relative: &str,
    patterns: &[ExclusionPattern],
) -> UpdateResult<usize> {
    let entries = fs::read_dir(source).map_err(|e| UpdateError::ReadFailed {
        path: source.to_path_buf(),
        source: e,
    })?;

    let mut preserved = 0;
    for entry in entries {
        let entry = entry.map_err(|e| UpdateError::ReadFailed {
            path: source.to_path_buf(),
            source: e,
        })?;
        let from = entry.path();
        let to = target.join(entry.file_name());
        let member = format!("{}/{}", relative, entry.file_name().to_string_lossy());

        if from.is_dir() {
            if to.is_dir() {
                preserved += merge_dir(&from, &to, &member, patterns)?;
                continue;
            }
            if to.exists() {
                fs::remove_file(&to).map_err(|e| hoist_error(&to, e))?;
            }
        } else if to.exists() {
            if is_excluded(patterns, &member) {
                debug!(path = %member, "Preserving existing user file");
                preserved += 1;
                continue;
            }
            if to.is_dir() {
                fs::remove_dir_all(&to).map_err(|e| hoist_error(&to, e))?;
            } else {
                fs::remove_file(&to).map_err(|e| hoist_error(&to, e))?;
            }
        }
        fs::rename(&from, &to).map_err(|e| hoist_error(&to, e))?;
    }

    Ok(preserved)
}

fn open_archive(archive_path: &Path) -> UpdateResult<ZipArchive<File>> {
    let file = File::open(archive_path).map_err(|e| UpdateError::ReadFailed {
        path: archive_path.to_path_buf(),
        source: e,
    })?;
    ZipArchive::new(file).map_err(|e| extraction_error(archive_path, e))
}

fn extraction_error(archive_path: &Path, err: zip::result::ZipError) -> UpdateError {
    UpdateError::ExtractionFailed {
        path: archive_path.to_path_buf(),
        reason: err.to_string(),
    }
}

fn hoist_error(path: &Path, err: io::Error) -> UpdateError {
    UpdateError::ExtractionFailed {
        path: PathBuf::from(path),
        reason: format!("failed to collapse nested directory: {}", err),
    }
}
