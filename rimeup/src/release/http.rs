//! HTTP client abstraction for testability.

use std::thread;
use std::time::Duration;

use tracing::debug;

use super::retry::RetryPolicy;
use super::source::SourceError;

/// Trait for fetching API documents.
///
/// This abstraction allows release sources to be tested against canned JSON
/// instead of live hosts.
pub trait HttpClient: Send + Sync {
    /// Performs a GET request with extra headers and returns the body.
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<Vec<u8>, SourceError>;
}

/// Real HTTP client implementation using reqwest.
///
/// Connection-level failures are retried once after a short pause; status
/// errors are returned to the caller untouched.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
    transport_retry: RetryPolicy,
}

impl ReqwestClient {
    /// Creates a client with the given timeout and optional proxy.
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, SourceError> {
        let mut builder = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(crate::updater::download::USER_AGENT);
        if let Some(proxy) = proxy.filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy).map_err(|e| SourceError::Transport {
                url: proxy.to_string(),
                reason: format!("invalid proxy: {}", e),
            })?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| SourceError::Transport {
            url: String::new(),
            reason: format!("failed to create HTTP client: {}", e),
        })?;

        Ok(Self {
            client,
            transport_retry: RetryPolicy::fixed(2, Duration::from_millis(500)),
        })
    }

    fn get_once(&self, url: &str, headers: &[(&str, String)]) -> Result<Vec<u8>, SourceError> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().map_err(|e| SourceError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| SourceError::Transport {
                url: url.to_string(),
                reason: format!("failed to read body: {}", e),
            })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, headers: &[(&str, String)]) -> Result<Vec<u8>, SourceError> {
        let mut attempt = 1;
        loop {
            match self.get_once(url, headers) {
                Err(SourceError::Transport { reason, .. }) => {
                    match self.transport_retry.delay_for_attempt(attempt) {
                        Some(delay) => {
                            debug!(url, %reason, attempt, "Transport error, retrying");
                            thread::sleep(delay);
                            attempt += 1;
                        }
                        None => {
                            return Err(SourceError::Transport {
                                url: url.to_string(),
                                reason,
                            })
                        }
                    }
                }
                other => return other,
            }
        }
    }
}
