//! Release discovery.
//!
//! Two hosts publish the artifacts: GitHub (primary) and the CNB mirror. Each
//! has a [`ReleaseSource`] implementation that normalizes its native response
//! shape into [`Release`]; the [`ReleaseResolver`] then matches the configured
//! filename and wraps lookups in exponential backoff.
//!
//! ```text
//! ReleaseResolver ──► dyn ReleaseSource ──► dyn HttpClient
//!                       ├─ GithubSource       └─ ReqwestClient
//!                       └─ CnbSource
//! ```

mod cnb;
mod github;
mod http;
mod resolver;
mod retry;
mod source;
mod types;

use std::sync::Arc;

pub use cnb::{CnbSource, CNB_API_BASE, CNB_WEB_BASE};
pub use github::{GithubSource, GITHUB_API_BASE};
pub use http::{HttpClient, ReqwestClient};
pub use resolver::{find_asset, ReleaseResolver};
pub use retry::RetryPolicy;
pub use source::{ReleaseSource, SourceError};
pub use types::{Release, ReleaseAsset, ReleaseSourceKind, UpdateInfo};

/// Build the release source selected by `kind` on top of `client`.
pub fn create_source(
    kind: ReleaseSourceKind,
    client: Arc<dyn HttpClient>,
    github_token: Option<String>,
) -> Arc<dyn ReleaseSource> {
    match kind {
        ReleaseSourceKind::Github => Arc::new(GithubSource::new(client).with_token(github_token)),
        ReleaseSourceKind::Cnb => Arc::new(CnbSource::new(client)),
    }
}
