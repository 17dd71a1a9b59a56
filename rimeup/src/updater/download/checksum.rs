//! SHA-256 content validation.
//!
//! Used both to skip work that was already done (a cached archive that matches
//! the published digest) and to verify a fresh download.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::updater::error::{UpdateError, UpdateResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Calculate the SHA-256 checksum of a file as lowercase hex.
pub fn calculate_file_checksum(path: &Path) -> UpdateResult<String> {
    let mut file = File::open(path).map_err(|e| UpdateError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| UpdateError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of an in-memory string as lowercase hex.
pub fn digest_str(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Whether `path` already holds content with digest `expected`.
///
/// An empty `expected`, a missing file, or an unreadable file all mean "not up
/// to date"; none of them is an error.
pub fn is_up_to_date(expected: &str, path: &Path) -> bool {
    if expected.is_empty() || !path.is_file() {
        return false;
    }
    calculate_file_checksum(path)
        .map(|actual| actual.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// Verify that a file matches an expected checksum.
pub fn verify_checksum(path: &Path, expected: &str) -> UpdateResult<()> {
    let actual = calculate_file_checksum(path)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(UpdateError::ChecksumMismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
