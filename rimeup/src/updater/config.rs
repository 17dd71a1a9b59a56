//! Resolved configuration for the updaters.

use std::path::PathBuf;
use std::time::Duration;

use super::download::DEFAULT_TIMEOUT_SECS;
use super::exclusion::ExclusionPattern;
use super::hooks::Hooks;
use super::kind::{ArtifactKind, ArtifactSpec};
use super::sync::SyncTargets;
use crate::release::ReleaseSourceKind;

/// Everything the updaters need, with paths already made absolute.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Rime user data directory.
    pub rime_dir: PathBuf,

    /// Holds records, staged downloads and committed archives.
    pub cache_dir: PathBuf,

    /// Which host releases are fetched from.
    pub source: ReleaseSourceKind,

    /// Token for authenticated GitHub API requests.
    pub github_token: Option<String>,

    /// Proxy URL for every HTTP request.
    pub proxy: Option<String>,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Files protected from being overwritten during extraction.
    pub exclusions: Vec<ExclusionPattern>,

    /// Pre/post update hooks.
    pub hooks: Hooks,

    /// Secondary engine and compatibility directories.
    pub sync: SyncTargets,

    /// Artifacts to track, at most one per kind.
    pub artifacts: Vec<ArtifactSpec>,

    /// Deploy automatically after a combined update changed something.
    pub auto_deploy: bool,
}

impl UpdaterConfig {
    /// Create a configuration with no artifacts.
    pub fn new(rime_dir: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            rime_dir: rime_dir.into(),
            cache_dir: cache_dir.into(),
            source: ReleaseSourceKind::default(),
            github_token: None,
            proxy: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            exclusions: Vec::new(),
            hooks: Hooks::default(),
            sync: SyncTargets::default(),
            artifacts: Vec::new(),
            auto_deploy: true,
        }
    }

    /// Add or replace the spec for one artifact kind.
    pub fn with_artifact(mut self, spec: ArtifactSpec) -> Self {
        self.artifacts.retain(|a| a.kind != spec.kind);
        self.artifacts.push(spec);
        self.artifacts.sort_by_key(|a| a.kind);
        self
    }

    /// Set the release source.
    pub fn with_source(mut self, source: ReleaseSourceKind) -> Self {
        self.source = source;
        self
    }

    /// Set the exclusion patterns.
    pub fn with_exclusions(mut self, exclusions: Vec<ExclusionPattern>) -> Self {
        self.exclusions = exclusions;
        self
    }

    /// Set the hooks.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the sync targets.
    pub fn with_sync(mut self, sync: SyncTargets) -> Self {
        self.sync = sync;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the proxy.
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.is_empty());
        self
    }

    /// The spec configured for `kind`.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&ArtifactSpec> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_artifact_replaces_same_kind() {
        let config = UpdaterConfig::new("/rime", "/cache")
            .with_artifact(ArtifactSpec::new(
                ArtifactKind::Model,
                "o",
                "r",
                "a.gram",
                "/rime",
            ))
            .with_artifact(ArtifactSpec::new(
                ArtifactKind::Scheme,
                "o",
                "r",
                "s.zip",
                "/rime",
            ))
            .with_artifact(ArtifactSpec::new(
                ArtifactKind::Model,
                "o",
                "r",
                "b.gram",
                "/rime",
            ));

        assert_eq!(config.artifacts.len(), 2);
        assert_eq!(config.artifacts[0].kind, ArtifactKind::Scheme);
        assert_eq!(
            config.artifact(ArtifactKind::Model).unwrap().filename,
            "b.gram"
        );
        assert!(config.artifact(ArtifactKind::Dict).is_none());
    }

    #[test]
    fn test_empty_proxy_is_none() {
        let config = UpdaterConfig::new("/rime", "/cache").with_proxy(Some(String::new()));
        assert!(config.proxy.is_none());
    }
}
