//! Release source trait and its error type.

use thiserror::Error;

use super::types::{Release, ReleaseSourceKind};

/// Errors reported by a release source.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SourceError {
    /// The request never produced a response.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The host answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body was not in the expected shape.
    #[error("unexpected response from {url}: {reason}")]
    Parse { url: String, reason: String },
}

impl SourceError {
    /// URL the failing request was sent to.
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } | Self::Parse { url, .. } => {
                url
            }
        }
    }

    /// Whether the release or repository does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Whether trying again might help.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status != 404,
            Self::Parse { .. } => false,
        }
    }
}

/// A host publishing tagged releases with downloadable assets.
///
/// Implementations normalize their native response shape into [`Release`]
/// and handle their own transport-level retries.
pub trait ReleaseSource: Send + Sync {
    /// Which host this is.
    fn kind(&self) -> ReleaseSourceKind;

    /// Fetch releases for `owner/repo`, or only the release tagged `tag`.
    ///
    /// Releases are returned newest first, as the host lists them.
    fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
        tag: Option<&str>,
    ) -> Result<Vec<Release>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let transport = SourceError::Transport {
            url: "u".into(),
            reason: "reset".into(),
        };
        let missing = SourceError::Status {
            url: "u".into(),
            status: 404,
        };
        let throttled = SourceError::Status {
            url: "u".into(),
            status: 403,
        };
        let parse = SourceError::Parse {
            url: "u".into(),
            reason: "eof".into(),
        };

        assert!(transport.is_retryable());
        assert!(throttled.is_retryable());
        assert!(!missing.is_retryable());
        assert!(missing.is_not_found());
        assert!(!parse.is_retryable());
        assert_eq!(parse.url(), "u");
    }
}
