//! Downloading and validating artifact files.
//!
//! - Single file downloads with resume support (`http`)
//! - SHA-256 content validation (`checksum`)
//! - Throttled byte-level progress (`progress`)

pub mod checksum;
mod http;
mod progress;

pub use checksum::{calculate_file_checksum, digest_str, is_up_to_date, verify_checksum};
pub use http::{HttpDownloader, DEFAULT_TIMEOUT_SECS, USER_AGENT};
pub use progress::{DownloadSample, ProgressThrottle, REPORT_INTERVAL};
