//! GitHub releases API.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::http::HttpClient;
use super::source::{ReleaseSource, SourceError};
use super::types::{Release, ReleaseAsset, ReleaseSourceKind};

/// Default API root.
pub const GITHUB_API_BASE: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    size: u64,
    /// `sha256:<hex>` on assets uploaded after digests were introduced.
    #[serde(default)]
    digest: Option<String>,
}

impl From<GithubRelease> for Release {
    fn from(release: GithubRelease) -> Self {
        Release {
            tag: release.tag_name,
            body: release.body.unwrap_or_default(),
            assets: release
                .assets
                .into_iter()
                .map(|asset| ReleaseAsset {
                    sha256: asset
                        .digest
                        .as_deref()
                        .and_then(|d| d.strip_prefix("sha256:"))
                        .map(str::to_lowercase),
                    name: asset.name,
                    download_url: asset.browser_download_url,
                    last_modified: asset.updated_at,
                    size_bytes: asset.size,
                    id: String::new(),
                })
                .collect(),
        }
    }
}

/// Release source backed by the GitHub REST API.
pub struct GithubSource {
    client: Arc<dyn HttpClient>,
    api_base: String,
    token: Option<String>,
}

impl GithubSource {
    /// Create a source against the public API.
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self {
            client,
            api_base: GITHUB_API_BASE.to_string(),
            token: None,
        }
    }

    /// Override the API root.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into().trim_end_matches('/').to_string();
        self
    }

    /// Authenticate requests with a personal access token.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.is_empty());
        self
    }

    fn url(&self, owner: &str, repo: &str, tag: Option<&str>) -> String {
        match tag {
            Some(tag) => format!(
                "{}/repos/{}/{}/releases/tags/{}",
                self.api_base, owner, repo, tag
            ),
            None => format!("{}/repos/{}/{}/releases", self.api_base, owner, repo),
        }
    }

    fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![
            ("Accept", "application/vnd.github+json".to_string()),
            ("X-GitHub-Api-Version", "2022-11-28".to_string()),
        ];
        if let Some(token) = &self.token {
            headers.push(("Authorization", format!("Bearer {}", token)));
        }
        headers
    }
}

impl ReleaseSource for GithubSource {
    fn kind(&self) -> ReleaseSourceKind {
        ReleaseSourceKind::Github
    }

    fn fetch_releases(
        &self,
        owner: &str,
        repo: &str,
        tag: Option<&str>,
    ) -> Result<Vec<Release>, SourceError> {
        let url = self.url(owner, repo, tag);
        debug!(url = %url, "Fetching GitHub releases");
        let body = self.client.get(&url, &self.headers())?;
        parse_releases(&url, &body, tag.is_some())
    }
}

/// Parse a release list, or a single release when `single` is set.
fn parse_releases(url: &str, body: &[u8], single: bool) -> Result<Vec<Release>, SourceError> {
    let parse_err = |e: serde_json::Error| SourceError::Parse {
        url: url.to_string(),
        reason: e.to_string(),
    };

    if single {
        let release: GithubRelease = serde_json::from_slice(body).map_err(parse_err)?;
        Ok(vec![release.into()])
    } else {
        let releases: Vec<GithubRelease> = serde_json::from_slice(body).map_err(parse_err)?;
        Ok(releases.into_iter().map(Release::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const LIST: &str = r#"[
      {
        "tag_name": "v14.2.0",
        "body": "scheme update",
        "assets": [
          {
            "name": "rime-wanxiang-base.zip",
            "browser_download_url": "https://github.com/o/r/releases/download/v14.2.0/rime-wanxiang-base.zip",
            "updated_at": "2026-03-01T08:00:00Z",
            "size": 2048,
            "digest": "sha256:ABCDEF"
          }
        ]
      },
      {
        "tag_name": "dict-nightly",
        "body": null,
        "assets": []
      }
    ]"#;

    struct CannedClient {
        body: String,
        seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl HttpClient for CannedClient {
        fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<Vec<u8>, SourceError> {
            self.seen.lock().unwrap().push((
                url.to_string(),
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            ));
            Ok(self.body.clone().into_bytes())
        }
    }

    fn canned(body: &str) -> Arc<CannedClient> {
        Arc::new(CannedClient {
            body: body.to_string(),
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_parse_release_list() {
        let releases = parse_releases("u", LIST.as_bytes(), false).unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag, "v14.2.0");
        let asset = &releases[0].assets[0];
        assert_eq!(asset.size_bytes, 2048);
        assert_eq!(asset.sha256.as_deref(), Some("abcdef"));
        assert!(asset.id.is_empty());
        assert_eq!(releases[1].body, "");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = parse_releases("u", b"{not json", false).unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
    }

    #[test]
    fn test_tag_endpoint_and_token() {
        let single = r#"{"tag_name":"dict-nightly","body":"","assets":[]}"#;
        let client = canned(single);
        let source = GithubSource::new(client.clone())
            .with_api_base("http://localhost/")
            .with_token(Some("secret".into()));

        let releases = source
            .fetch_releases("amzxyz", "rime_wanxiang", Some("dict-nightly"))
            .unwrap();
        assert_eq!(releases[0].tag, "dict-nightly");

        let seen = client.seen.lock().unwrap();
        assert_eq!(
            seen[0].0,
            "http://localhost/repos/amzxyz/rime_wanxiang/releases/tags/dict-nightly"
        );
        assert!(seen[0]
            .1
            .iter()
            .any(|(k, v)| k == "Authorization" && v == "Bearer secret"));
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = canned("[]");
        let source = GithubSource::new(client.clone()).with_token(Some(String::new()));
        source.fetch_releases("o", "r", None).unwrap();

        let seen = client.seen.lock().unwrap();
        assert!(seen[0].0.ends_with("/repos/o/r/releases"));
        assert!(!seen[0].1.iter().any(|(k, _)| k == "Authorization"));
    }
}
