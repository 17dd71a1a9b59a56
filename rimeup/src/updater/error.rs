//! Error types for the update pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::kind::ArtifactKind;

/// Result type for updater operations.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Errors that can occur while checking, downloading, applying or deploying
/// an artifact.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// No release asset matched the configured filename.
    #[error("release resolver: no asset named '{filename}' in {owner}/{repo} on {source_label}")]
    NotFound {
        filename: String,
        owner: String,
        repo: String,
        source_label: String,
    },

    /// Network failure that persisted through every retry.
    #[error("release resolver: {url} failed after {attempts} attempt(s): {reason}")]
    TransientNetwork {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// The release source answered with something that could not be parsed.
    #[error("release source: unreadable response from {url}: {reason}")]
    SourceParse { url: String, reason: String },

    /// Failed to download an artifact.
    #[error("downloader: {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Downloaded file has the wrong length and was deleted.
    #[error(
        "downloader: size mismatch for {}: expected {expected} bytes, got {actual} bytes",
        path.display()
    )]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    /// Downloaded file does not match the published digest.
    #[error("validator: checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// The pre-update hook failed, nothing was modified.
    #[error("pre-update hook {} aborted the update: {reason}", hook.display())]
    HookAborted { hook: PathBuf, reason: String },

    /// Archive extraction failed.
    #[error("extractor: {}: {reason}", path.display())]
    ExtractionFailed { path: PathBuf, reason: String },

    /// Removing obsolete archive members failed.
    #[error("pruner: {}: {reason}", path.display())]
    PruneFailed { path: PathBuf, reason: String },

    /// Reading or writing an update record failed.
    #[error("record store: {}: {reason}", path.display())]
    RecordFailed { path: PathBuf, reason: String },

    /// The consumer process could not be stopped or redeployed.
    #[error("deployer: {0}")]
    DeployFailed(String),

    /// An exclusion pattern could not be parsed.
    #[error("invalid exclusion pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A worker thread running an artifact update panicked.
    #[error("{0} updater thread panicked")]
    WorkerPanicked(ArtifactKind),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// One or more artifacts failed while others may have succeeded.
    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<(ArtifactKind, UpdateError)>),
}

impl UpdateError {
    /// Whether retrying the whole run later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransientNetwork { .. }
                | Self::DownloadFailed { .. }
                | Self::SizeMismatch { .. }
                | Self::ChecksumMismatch { .. }
        )
    }
}

fn format_aggregate(errors: &[(ArtifactKind, UpdateError)]) -> String {
    let parts: Vec<String> = errors
        .iter()
        .map(|(kind, err)| format!("{}: {}", kind.label(), err))
        .collect();
    format!("{} artifact(s) failed: {}", errors.len(), parts.join("; "))
}
