//! HTTP client for backend mirrors.
//!
//! The aggregator and resolver never touch `reqwest` directly; they go
//! through [`super::traits::HttpFetch`] so tests can substitute scripted
//! responses. This file holds the production implementation.

use std::time::Duration;

use async_trait::async_trait;

use super::traits::HttpFetch;

/// User agent sent to every mirror.
pub const USER_AGENT: &str = concat!("Tidepool/", env!("CARGO_PKG_VERSION"));

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Failed to build HTTP client: {0}")]
    Build(String),
}

/// `reqwest`-backed fetcher.
pub struct HttpClient {
    http_client: reqwest::Client,
}

impl HttpClient {
    /// Create a client with the default user agent.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_user_agent(USER_AGENT)
    }

    /// Create a client with a custom user agent.
    pub fn with_user_agent(user_agent: &str) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Build(e.to_string()))?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl HttpFetch for HttpClient {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, FetchError> {
        let response = self
            .http_client
            .get(url)
            .header("Accept", "application/json")
            .header("x-requested-with", "XMLHttpRequest")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| classify(e, timeout))?;

        Ok(HttpResponse { status, body })
    }
}

fn classify(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Transport(e.to_string())
    }
}

/// Run a fetch bounded by `timeout`, whatever the fetcher does internally.
pub async fn fetch_with_timeout(
    fetcher: &dyn HttpFetch,
    url: &str,
    timeout: Duration,
) -> Result<HttpResponse, FetchError> {
    match tokio::time::timeout(timeout, fetcher.get(url, timeout)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(timeout)),
    }
}
