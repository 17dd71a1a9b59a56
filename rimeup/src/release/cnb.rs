//! CNB mirror releases API.
//!
//! The mirror lists releases in its own shape: tags may come as `tag_ref`
//! (`refs/tags/<tag>`), asset URLs are site-relative paths, and hashes carry
//! an explicit algorithm name.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::http::HttpClient;
use super::source::{ReleaseSource, SourceError};
use super::types::{Release, ReleaseAsset, ReleaseSourceKind};

/// Default API root.
pub const CNB_API_BASE: &str = "https://api.cnb.cool";

/// Site root that asset paths are relative to.
pub const CNB_WEB_BASE: &str = "https://cnb.cool";

#[derive(Debug, Deserialize)]
struct CnbRelease {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    tag_ref: Option<String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<CnbAsset>,
}

#[derive(Debug, Deserialize)]
struct CnbAsset {
    #[serde(default)]
    id: Value,
    name: String,
    #[serde(default)]
    path: Option<String>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    size_in_byte: u64,
    #[serde(default)]
    hash_algo: Option<String>,
    #[serde(default)]
    hash_value: Option<String>,
}

impl CnbRelease {
    fn tag(&self) -> String {
        self.tag_name
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| {
                self.tag_ref
                    .as_deref()
                    .map(|r| r.strip_prefix("refs/tags/").unwrap_or(r).to_string())
            })
            .unwrap_or_default()
    }
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Release source backed by the CNB mirror.
pub struct CnbSource {
    client: Arc<dyn HttpClient>,
    api_base: String,
    web_base: String,
}

impl CnbSource {
    /// Create a source against the public mirror.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            api_base: CNB_API_BASE.to_string(),
            web_base: CNB_WEB_BASE.to_string(),
        }
    }

    /// Override the API and site roots.
    pub fn with_bases(mut self, api_base: impl Into<String>, web_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self.web_base = web_base.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, owner: &str, repo: &str, tag: Option<&str>) -> String {
        match tag {
            Some(tag) => format!(
                "{}/{}/{}/-/releases/tags/{}",
                self.api_base, owner, repo, tag
            ),
            None => format!("{}/{}/{}/-/releases", self.api_base, owner, repo),
        }
    }

    fn normalize(&self, owner: &str, repo: &str, release: CnbRelease) -> Release {
        let tag = release.tag();
        let assets = release
            .assets
            .into_iter()
            .map(|asset| {
                let download_url = match asset.path.as_deref() {
                    Some(p) if p.starts_with("http://") || p.starts_with("https://") => {
                        p.to_string()
                    }
                    Some(p) if !p.is_empty() => {
                        format!("{}/{}", self.web_base, p.trim_start_matches('/'))
                    }
                    _ => format!(
                        "{}/{}/{}/-/releases/download/{}/{}",
                        self.web_base, owner, repo, tag, asset.name
                    ),
                };
                let sha256 = match (asset.hash_algo.as_deref(), asset.hash_value) {
                    (Some(algo), Some(value)) if algo.eq_ignore_ascii_case("sha256") => {
                        Some(value.to_lowercase())
                    }
                    _ => None,
                };
                ReleaseAsset {
                    id: id_string(&asset.id),
                    name: asset.name,
                    download_url,
                    last_modified: asset.updated_at,
                    size_bytes: asset.size_in_byte,
                    sha256,
                }
            })
            .collect();

        Release {
            tag,
            body: release.body.unwrap_or_default(),
            assets,
        }
    }
}

impl ReleaseSource for CnbSource {
    fn kind(&self) -> ReleaseSourceKind {
        ReleaseSourceKind::Cnb
    }

    fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
        tag: Option<&str>,
    ) -> Result<Vec<Release>, SourceError> {
        let url = self.url(owner, repo, tag);
        debug!(url = %url, "Fetching CNB releases");
        let headers = [("Accept", "application/vnd.cnb.api+json".to_string())];
        let body = self.client.get(&url, &headers)?;

        let parse_err = |e: serde_json::Error| SourceError::Parse {
            url: url.clone(),
            reason: e.to_string(),
        };
        let releases: Vec<CnbRelease> = if tag.is_some() {
            vec![serde_json::from_slice(&body).map_err(parse_err)?]
        } else {
            serde_json::from_slice(&body).map_err(parse_err)?
        };

        Ok(releases
            .into_iter()
            .map(|r| self.normalize(owner, repo, r))
            .collect())
    }
}
