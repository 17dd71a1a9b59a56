//! Seams of the update pipeline.
//!
//! These abstractions allow the artifact updaters to be exercised with fake
//! downloaders in tests while production code uses [`HttpDownloader`].
//!
//! [`HttpDownloader`]: super::download::HttpDownloader

use std::path::Path;

use super::download::DownloadSample;
use super::error::UpdateResult;

/// Callback receiving throttled byte-level samples during a download.
pub type DownloadProgressFn<'a> = dyn Fn(DownloadSample) + Send + Sync + 'a;

/// Fetches a remote artifact into a local file.
pub trait ArtifactDownloader: Send + Sync {
    /// Download `url` into `dest`, resuming a partial file when possible.
    ///
    /// When `expected_size` is given and the finished file has a different
    /// length, the file is deleted and `SizeMismatch` is returned. Any other
    /// failure leaves the partial file in place for the next attempt.
    ///
    /// Returns the final size of `dest` in bytes.
    fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        on_progress: Option<&DownloadProgressFn<'_>>,
    ) -> UpdateResult<u64>;
}
