//! HTTP-based artifact downloader with resume support.
//!
//! - Resumable downloads via HTTP Range requests
//! - Throttled progress callbacks for UI updates
//! - Size validation that deletes truncated output

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::progress::ProgressThrottle;
use crate::updater::error::{UpdateError, UpdateResult};
use crate::updater::traits::{ArtifactDownloader, DownloadProgressFn};

/// Default timeout for HTTP requests in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("rimeup/", env!("CARGO_PKG_VERSION"));

/// How the destination file is opened for a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    /// Server honored the range; keep existing bytes.
    Append(u64),
    /// Start over from byte zero.
    Truncate,
}

/// HTTP-based artifact downloader.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    timeout: Duration,
}

impl HttpDownloader {
    /// Create a downloader with the default timeout and no proxy.
    pub fn new() -> UpdateResult<Self> {
        Self::with_settings(Duration::from_secs(DEFAULT_TIMEOUT_SECS), None)
    }

    /// Create a downloader with a custom timeout and optional proxy URL.
    pub fn with_settings(timeout: Duration, proxy: Option<&str>) -> UpdateResult<Self> {
        let mut builder = Client::builder().timeout(timeout).user_agent(USER_AGENT);
        if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| UpdateError::Config(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| UpdateError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Download with resumption support.
    fn download_with_resume(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        progress: Option<&DownloadProgressFn<'_>>,
    ) -> UpdateResult<u64> {
        let mut existing_size = fs::metadata(dest).map(|m| m.len()).unwrap_or(0);

        if let Some(expected) = expected_size {
            if existing_size == expected && expected > 0 {
                debug!(path = %dest.display(), "Download already complete");
                if let Some(cb) = progress {
                    cb(ProgressThrottle::new(expected, expected).finish(expected));
                }
                return Ok(expected);
            }
            if existing_size > expected {
                debug!(
                    path = %dest.display(),
                    existing_size,
                    expected,
                    "Partial file larger than expected, restarting"
                );
                existing_size = 0;
            }
        }

        ensure_parent(dest)?;

        let mut response = self.send(url, existing_size)?;
        if response.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            warn!(url, existing_size, "Range not satisfiable, restarting download");
            existing_size = 0;
            response = self.send(url, 0)?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(UpdateError::DownloadFailed {
                url: url.to_string(),
                reason: format!("GET request failed with status {}", status),
            });
        }

        let mode = if existing_size > 0 && status == StatusCode::PARTIAL_CONTENT {
            debug!(url, offset = existing_size, "Resuming download");
            WriteMode::Append(existing_size)
        } else {
            WriteMode::Truncate
        };

        let start_byte = match mode {
            WriteMode::Append(offset) => offset,
            WriteMode::Truncate => 0,
        };
        let total_size = expected_size
            .or_else(|| response.content_length().map(|len| len + start_byte))
            .unwrap_or(0);

        let file = open_destination(dest, mode)?;
        self.stream_download(url, &mut response, file, dest, start_byte, total_size, progress)?;

        let final_size = fs::metadata(dest)
            .map_err(|e| UpdateError::ReadFailed {
                path: dest.to_path_buf(),
                source: e,
            })?
            .len();

        if let Some(expected) = expected_size {
            if final_size != expected {
                fs::remove_file(dest).ok();
                return Err(UpdateError::SizeMismatch {
                    path: dest.to_path_buf(),
                    expected,
                    actual: final_size,
                });
            }
        }

        Ok(final_size)
    }

    /// Issue the GET, with a Range header when resuming.
    fn send(&self, url: &str, start_byte: u64) -> UpdateResult<reqwest::blocking::Response> {
        let mut request = self.client.get(url);
        if start_byte > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={}-", start_byte));
        }

        request.send().map_err(|e| UpdateError::DownloadFailed {
            url: url.to_string(),
            reason: if e.is_timeout() {
                format!("timed out after {}s", self.timeout.as_secs())
            } else {
                e.to_string()
            },
        })
    }

    /// Stream the response body to the destination file.
    #[allow(clippy::too_many_arguments)]
    fn stream_download(
        &self,
        url: &str,
        response: &mut reqwest::blocking::Response,
        file: File,
        dest: &Path,
        start_byte: u64,
        total_size: u64,
        progress: Option<&DownloadProgressFn<'_>>,
    ) -> UpdateResult<u64> {
        let mut writer = BufWriter::new(file);
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut downloaded = start_byte;
        let mut throttle = ProgressThrottle::new(start_byte, total_size);

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| UpdateError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| UpdateError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            downloaded += bytes_read as u64;

            if let Some(cb) = progress {
                if let Some(sample) = throttle.observe(downloaded) {
                    cb(sample);
                }
            }
        }

        writer.flush().map_err(|e| UpdateError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        if let Some(cb) = progress {
            cb(throttle.finish(downloaded));
        }

        Ok(downloaded)
    }
}

impl ArtifactDownloader for HttpDownloader {
    fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_size: Option<u64>,
        on_progress: Option<&DownloadProgressFn<'_>>,
    ) -> UpdateResult<u64> {
        self.download_with_resume(url, dest, expected_size, on_progress)
    }
}

fn ensure_parent(dest: &Path) -> UpdateResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| UpdateError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn open_destination(dest: &Path, mode: WriteMode) -> UpdateResult<File> {
    let result = match mode {
        WriteMode::Append(_) => OpenOptions::new().append(true).open(dest),
        WriteMode::Truncate => File::create(dest),
    };
    result.map_err(|e| UpdateError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })
}
