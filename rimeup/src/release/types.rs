//! Normalized release data shared by every release source.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Which upstream host releases are fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReleaseSourceKind {
    /// GitHub releases (primary).
    #[default]
    Github,
    /// CNB mirror.
    Cnb,
}

impl ReleaseSourceKind {
    /// Label shown in progress and status output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Github => "GitHub",
            Self::Cnb => "CNB",
        }
    }

    /// Config-file spelling.
    pub fn config_value(&self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Cnb => "cnb",
        }
    }
}

impl fmt::Display for ReleaseSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ReleaseSourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "github" | "gh" => Ok(Self::Github),
            "cnb" | "mirror" => Ok(Self::Cnb),
            other => Err(format!("unknown release source '{}'", other)),
        }
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseAsset {
    /// File name, matched exactly against the configured artifact filename.
    pub name: String,
    /// Direct download URL.
    pub download_url: String,
    /// When the asset was last modified upstream.
    pub last_modified: DateTime<Utc>,
    /// Size in bytes.
    pub size_bytes: u64,
    /// SHA-256 published by the source, when available.
    pub sha256: Option<String>,
    /// Source-specific asset identifier, empty when the source has none.
    pub id: String,
}

/// A release in the shape every source is normalized to.
#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    /// Tag name.
    pub tag: String,
    /// Release notes.
    pub body: String,
    /// Attached assets.
    pub assets: Vec<ReleaseAsset>,
}

/// The best currently-available remote version of one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInfo {
    /// Asset file name.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// Remote modification time; compared against the stored record.
    pub update_time: DateTime<Utc>,
    /// Release tag.
    pub tag: String,
    /// Release notes.
    pub description: String,
    /// SHA-256 of the asset, when published.
    pub content_hash: Option<String>,
    /// Asset size in bytes.
    pub size_bytes: u64,
    /// Source-specific asset identifier.
    pub source_id: String,
    /// Which source this came from.
    pub source: ReleaseSourceKind,
}

impl UpdateInfo {
    /// Build from the release and asset that matched.
    pub fn from_match(release: &Release, asset: &ReleaseAsset, source: ReleaseSourceKind) -> Self {
        Self {
            name: asset.name.clone(),
            url: asset.download_url.clone(),
            update_time: asset.last_modified,
            tag: release.tag.clone(),
            description: release.body.clone(),
            content_hash: asset.sha256.clone().filter(|h| !h.is_empty()),
            size_bytes: asset.size_bytes,
            source_id: asset.id.clone(),
            source,
        }
    }

    /// Whether this remote version is strictly newer than `local_time`.
    ///
    /// Equal timestamps never count as newer.
    pub fn is_newer_than(&self, local_time: &DateTime<Utc>) -> bool {
        self.update_time > *local_time
    }
}
