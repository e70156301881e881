//! Remote rule sources.
//!
//! [`RemoteSource`] is the seam the cache fetches through; tests swap in
//! doubles. [`GitHubRawSource`] reads documents from a raw-content host at
//! `{base_url}/{repository}/{reference}/{path}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rulecast_settings::RemoteSettings;
use tracing::debug;

use crate::errors::{FetchError, Result};

/// Read-only access to rule documents by path and content reference.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the body of `path` at `reference` (branch, tag or commit).
    ///
    /// Returns `Ok(None)` when the document does not exist.
    async fn fetch(&self, path: &str, reference: &str) -> Result<Option<String>>;
}

/// Raw-content source for a GitHub repository.
pub struct GitHubRawSource {
    client: reqwest::Client,
    base_url: String,
    repository: String,
    token: Option<String>,
}

impl GitHubRawSource {
    /// Create a source. `timeout` bounds each request.
    pub fn new(
        base_url: impl Into<String>,
        repository: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("rulecast/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            repository: repository.into().trim_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Create a source from remote settings.
    #[must_use]
    pub fn from_settings(settings: &RemoteSettings) -> Self {
        Self::new(
            settings.base_url.clone(),
            settings.repository.clone(),
            settings.token.clone(),
            Duration::from_millis(settings.request_timeout_ms),
        )
    }

    /// URL of `path` at `reference`.
    #[must_use]
    pub fn url_for(&self, path: &str, reference: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            self.base_url,
            self.repository,
            reference,
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl RemoteSource for GitHubRawSource {
    async fn fetch(&self, path: &str, reference: &str) -> Result<Option<String>> {
        let url = self.url_for(path, reference);
        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        debug!(url = %url, status = status.as_u16(), "remote fetch");

        match status {
            s if s.is_success() => {
                let body = response.text().await.map_err(|e| {
                    if e.is_timeout() {
                        FetchError::Timeout
                    } else {
                        FetchError::Unreachable(format!("failed to read body: {e}"))
                    }
                })?;
                Ok(Some(body))
            }
            StatusCode::NOT_FOUND => Ok(None),
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited {
                retry_after_secs: header_u64(&response, "retry-after"),
            }),
            StatusCode::FORBIDDEN if header_u64(&response, "x-ratelimit-remaining") == Some(0) => {
                Err(FetchError::RateLimited {
                    retry_after_secs: header_u64(&response, "retry-after"),
                })
            }
            other => Err(FetchError::Http {
                status: other.as_u16(),
            }),
        }
    }
}

fn header_u64(response: &reqwest::Response, name: &str) -> Option<u64> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
