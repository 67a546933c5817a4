//! HTTP transport seam under the resilient client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::errors::ChainDataError;

/// Raw answer from the provider: status plus undecoded body.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Network-level failure. Always worth another attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("failed to read response body: {0}")]
    Body(String),
}

/// Issues a single GET. No retries, no status interpretation.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Fails when the TLS backend or system configuration cannot be loaded.
    pub fn new(user_agent: &str) -> Result<Self, ChainDataError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| ChainDataError::Transport {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        query: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFailure> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportFailure::Timeout(timeout)
                } else {
                    TransportFailure::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportFailure::Timeout(timeout)
            } else {
                TransportFailure::Body(e.to_string())
            }
        })?;

        Ok(HttpResponse { status, body })
    }
}
