//! Resolves an artifact's configured filename to the matching remote asset.

use std::sync::Arc;
use std::thread;

use tracing::{debug, info, warn};

use super::retry::RetryPolicy;
use super::source::{ReleaseSource, SourceError};
use super::types::{Release, ReleaseSourceKind, UpdateInfo};
use crate::updater::{ArtifactSpec, UpdateError, UpdateResult};

/// Looks up the newest matching asset for an artifact, retrying transient
/// failures with backoff.
pub struct ReleaseResolver {
    source: Arc<dyn ReleaseSource>,
    policy: RetryPolicy,
}

impl ReleaseResolver {
    /// Create a resolver with the default backoff (1s base, 10s cap, 3 attempts).
    pub fn new(source: Arc<dyn ReleaseSource>) -> Self {
        Self {
            source,
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Which source this resolver queries.
    pub fn source_kind(&self) -> ReleaseSourceKind {
        self.source.kind()
    }

    /// Resolve the asset named `spec.filename`.
    ///
    /// # Errors
    ///
    /// - `NotFound` when no release asset matches (never retried)
    /// - `TransientNetwork` when every attempt failed at the transport or status level
    /// - `SourceParse` when the source answered with an unreadable body
    pub fn resolve(&self, spec: &ArtifactSpec) -> UpdateResult<UpdateInfo> {
        let releases = self.fetch_with_retry(spec)?;

        match find_asset(&releases, &spec.filename, self.source.kind()) {
            Some(info) => {
                info!(
                    kind = %spec.kind,
                    tag = %info.tag,
                    updated = %info.update_time,
                    "Resolved remote version"
                );
                Ok(info)
            }
            None => Err(self.not_found(spec)),
        }
    }

    fn fetch_with_retry(&self, spec: &ArtifactSpec) -> UpdateResult<Vec<Release>> {
        let mut attempt = 1;
        loop {
            let err = match self
                .source
                .fetch_releases(&spec.owner, &spec.repo, spec.tag.as_deref())
            {
                Ok(releases) => {
                    debug!(count = releases.len(), attempt, "Fetched releases");
                    return Ok(releases);
                }
                Err(e) => e,
            };

            if err.is_not_found() {
                return Err(self.not_found(spec));
            }
            if let SourceError::Parse { url, reason } = err {
                return Err(UpdateError::SourceParse { url, reason });
            }

            match self.policy.delay_for_attempt(attempt) {
                Some(delay) => {
                    warn!(
                        error = %err,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Release lookup failed, retrying"
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                None => {
                    return Err(UpdateError::TransientNetwork {
                        url: err.url().to_string(),
                        attempts: attempt,
                        reason: err.to_string(),
                    })
                }
            }
        }
    }

    fn not_found(&self, spec: &ArtifactSpec) -> UpdateError {
        UpdateError::NotFound {
            filename: spec.filename.clone(),
            owner: spec.owner.clone(),
            repo: spec.repo.clone(),
            source_label: self.source.kind().label().to_string(),
        }
    }
}

/// First asset named exactly `filename` across the flattened releases.
pub fn find_asset(
    releases: &[Release],
    filename: &str,
    source: ReleaseSourceKind,
) -> Option<UpdateInfo> {
    releases.iter().find_map(|release| {
        release
            .assets
            .iter()
            .find(|asset| asset.name == filename)
            .map(|asset| UpdateInfo::from_match(release, asset, source))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::release::types::ReleaseAsset;
    use crate::updater::ArtifactKind;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedSource {
        responses: Mutex<Vec<Result<Vec<Release>, SourceError>>>,
        calls: AtomicU32,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<Vec<Release>, SourceError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicU32::new(0),
            })
        }
    }

    impl ReleaseSource for ScriptedSource {
        fn kind(&self) -> ReleaseSourceKind {
            ReleaseSourceKind::Github
        }

        fn fetch_releases(
            &self,
            _owner: &str,
            _repo: &str,
            _tag: Option<&str>,
        ) -> Result<Vec<Release>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn release(tag: &str, names: &[&str]) -> Release {
        Release {
            tag: tag.to_string(),
            body: String::new(),
            assets: names
                .iter()
                .map(|n| ReleaseAsset {
                    name: n.to_string(),
                    download_url: format!("https://example.com/{}/{}", tag, n),
                    last_modified: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                    size_bytes: 10,
                    sha256: None,
                    id: String::new(),
                })
                .collect(),
        }
    }

    fn spec() -> ArtifactSpec {
        ArtifactSpec::new(ArtifactKind::Dict, "o", "r", "dicts.zip", "/tmp/dicts")
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::fixed(3, Duration::ZERO)
    }

    fn transport() -> SourceError {
        SourceError::Transport {
            url: "https://api.example.com/releases".into(),
            reason: "connection reset".into(),
        }
    }

    #[test]
    fn test_first_match_wins() {
        let releases = vec![
            release("new", &["other.zip", "dicts.zip"]),
            release("old", &["dicts.zip"]),
        ];
        let info = find_asset(&releases, "dicts.zip", ReleaseSourceKind::Github).unwrap();
        assert_eq!(info.tag, "new");
        assert_eq!(info.url, "https://example.com/new/dicts.zip");
    }

    #[test]
    fn test_exact_match_only() {
        let releases = vec![release("v1", &["dicts.zip.sha256", "Dicts.zip"])];
        assert!(find_asset(&releases, "dicts.zip", ReleaseSourceKind::Github).is_none());
    }

    #[test]
    fn test_not_found_is_not_retried() {
        let source = ScriptedSource::new(vec![Ok(vec![release("v1", &["x.zip"])])]);
        let resolver = ReleaseResolver::new(source.clone()).with_policy(fast());

        let err = resolver.resolve(&spec()).unwrap_err();
        assert!(matches!(err, UpdateError::NotFound { .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_tag_is_not_found() {
        let source = ScriptedSource::new(vec![Err(SourceError::Status {
            url: "u".into(),
            status: 404,
        })]);
        let resolver = ReleaseResolver::new(source.clone()).with_policy(fast());
        assert!(matches!(
            resolver.resolve(&spec()),
            Err(UpdateError::NotFound { .. })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_errors_are_retried() {
        let source = ScriptedSource::new(vec![
            Err(transport()),
            Err(SourceError::Status {
                url: "u".into(),
                status: 502,
            }),
            Ok(vec![release("v2", &["dicts.zip"])]),
        ]);
        let resolver = ReleaseResolver::new(source.clone()).with_policy(fast());

        let info = resolver.resolve(&spec()).unwrap();
        assert_eq!(info.tag, "v2");
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exhausted_retries_surface_attempt_count() {
        let source = ScriptedSource::new(vec![
            Err(transport()),
            Err(transport()),
            Err(SourceError::Status {
                url: "u".into(),
                status: 503,
            }),
        ]);
        let resolver = ReleaseResolver::new(source.clone()).with_policy(fast());

        match resolver.resolve(&spec()).unwrap_err() {
            UpdateError::TransientNetwork {
                attempts, reason, ..
            } => {
                assert_eq!(attempts, 3);
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_error_is_terminal() {
        let source = ScriptedSource::new(vec![Err(SourceError::Parse {
            url: "u".into(),
            reason: "eof".into(),
        })]);
        let resolver = ReleaseResolver::new(source.clone()).with_policy(fast());
        assert!(matches!(
            resolver.resolve(&spec()),
            Err(UpdateError::SourceParse { .. })
        ));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
