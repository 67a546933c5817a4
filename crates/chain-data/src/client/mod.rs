//! Resilient fetch client.
//!
//! Executes one logical GET against a provider with bounded retries and
//! turns every way it can go wrong into a [`ChainDataError`]:
//!
//! | Outcome of an attempt | Action |
//! |-----------------------|--------|
//! | HTTP 429 | back off, retry (consumes an attempt) |
//! | HTTP 5xx | back off, retry; `Server` once attempts run out |
//! | other non-2xx | `Http`, immediately |
//! | 2xx with embedded error | `Api`, immediately |
//! | timeout / connection failure | back off, retry; `Transport` once attempts run out |

mod transport;

#[cfg(test)]
pub(crate) use transport::scripted;
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport, TransportFailure};

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backoff::{
    BackoffPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_JITTER_RATIO, DEFAULT_MAX_BACKOFF,
};
use crate::errors::ChainDataError;

/// Default number of attempts per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default per-attempt timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body kept in `Http` messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub request_timeout: Duration,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            jitter_ratio: DEFAULT_JITTER_RATIO,
        }
    }
}

impl RetryConfig {
    pub fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.initial_backoff, self.max_backoff, self.jitter_ratio)
    }
}

pub struct ResilientClient {
    transport: Arc<dyn HttpTransport>,
    config: RetryConfig,
    backoff: BackoffPolicy,
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn HttpTransport>, config: RetryConfig) -> Self {
        let backoff = config.backoff_policy();
        Self {
            transport,
            config,
            backoff,
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// GET `url` and decode the body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, ChainDataError> {
        let value = self.get_value(url, query).await?;
        serde_json::from_value(value).map_err(|e| ChainDataError::InvalidResponse {
            message: e.to_string(),
        })
    }

    /// GET `url` and return the decoded JSON document.
    pub async fn get_value(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Value, ChainDataError> {
        let attempts = self.config.max_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            let error = match self.attempt(url, query).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };
            if !error.retry_class().is_retryable() {
                return Err(error);
            }
            warn!(
                "Request to {} failed: {} (attempt {}/{})",
                url,
                error,
                attempt + 1,
                attempts
            );

            if attempt + 1 == attempts {
                // A rate limit has no failure of its own to surface.
                if error != ChainDataError::RateLimited {
                    return Err(error);
                }
            } else {
                let delay = self.backoff.delay(attempt);
                debug!("Retrying {} in {:?}", url, delay);
                tokio::time::sleep(delay).await;
            }
            last_error = error.to_string();
        }

        Err(ChainDataError::RetriesExhausted {
            attempts,
            last_error,
        })
    }

    /// One request, with the response status folded into the error kinds.
    async fn attempt(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Value, ChainDataError> {
        let response = self
            .transport
            .get(url, query, self.config.request_timeout)
            .await
            .map_err(|failure| ChainDataError::Transport {
                message: failure.to_string(),
            })?;

        if response.status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ChainDataError::RateLimited);
        }
        if response.status.is_server_error() {
            return Err(ChainDataError::Server {
                status: response.status.as_u16(),
            });
        }
        if !response.status.is_success() {
            return Err(ChainDataError::Http {
                status: response.status.as_u16(),
                message: error_excerpt(&response),
            });
        }
        decode_body(&response.body)
    }
}

fn decode_body(body: &str) -> Result<Value, ChainDataError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ChainDataError::InvalidResponse {
        message: format!("body is not valid JSON: {}", e),
    })?;

    match embedded_error(&value) {
        Some(message) => Err(ChainDataError::Api { message }),
        None => Ok(value),
    }
}

/// Finds a provider-reported error in an otherwise successful payload.
///
/// Checks a top-level `error` field and the `context.error` field used by
/// Blockchair. `null` means no error.
fn embedded_error(value: &Value) -> Option<String> {
    let field = value
        .get("error")
        .filter(|v| !v.is_null())
        .or_else(|| value.pointer("/context/error").filter(|v| !v.is_null()))?;

    Some(match field {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

fn error_excerpt(response: &HttpResponse) -> String {
    let body = response.body.trim();
    if body.is_empty() {
        return response
            .status
            .canonical_reason()
            .unwrap_or("Unknown status")
            .to_string();
    }
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::scripted::ScriptedTransport;
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn fast_config() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            request_timeout: Duration::from_secs(1),
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(4),
            jitter_ratio: 0.25,
        }
    }

    fn client(transport: &Arc<ScriptedTransport>) -> ResilientClient {
        ResilientClient::new(transport.clone(), fast_config())
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        value: i64,
    }

    #[test]
    fn test_default_config_matches_provider_limits() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.initial_backoff, Duration::from_secs(1));
        assert_eq!(config.max_backoff, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "value": 7 }));

        let payload: Payload = client(&transport).get_json("http://p/x", &[]).await.unwrap();

        assert_eq!(payload, Payload { value: 7 });
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_consumes_attempt_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(429, "");
        transport.push_json(json!({ "value": 1 }));

        let payload: Payload = client(&transport).get_json("http://p/x", &[]).await.unwrap();

        assert_eq!(payload.value, 1);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_rate_limited_on_every_attempt_exhausts_retries() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            transport.push_status(429, "slow down");
        }

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ChainDataError::RetriesExhausted {
                attempts: 3,
                last_error: "HTTP 429 Too Many Requests".to_string(),
            }
        );
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_server_error_retried_then_recovers() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(503, "");
        transport.push_status(500, "");
        transport.push_json(json!({ "value": 3 }));

        let payload: Payload = client(&transport).get_json("http://p/x", &[]).await.unwrap();

        assert_eq!(payload.value, 3);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_persistent_server_error_surfaces_server_kind() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            transport.push_status(502, "bad gateway");
        }

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert_eq!(err, ChainDataError::Server { status: 502 });
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_client_error_fails_immediately() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(404, "");
        transport.push_json(json!({ "value": 1 }));

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ChainDataError::Http {
                status: 404,
                message: "Not Found".to_string(),
            }
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_embedded_error_is_api_error_and_not_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "data": null, "context": { "code": 402, "error": "Limit exceeded" } }));

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ChainDataError::Api {
                message: "Limit exceeded".to_string(),
            }
        );
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_top_level_error_field_is_api_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "error": { "reason": "bad address" } }));

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ChainDataError::Api { ref message } if message.contains("bad address")));
    }

    #[tokio::test]
    async fn test_null_error_fields_are_ignored() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "value": 5, "error": null, "context": { "error": null } }));

        let payload: Payload = client(&transport).get_json("http://p/x", &[]).await.unwrap();
        assert_eq!(payload.value, 5);
    }

    #[tokio::test]
    async fn test_transport_failure_retried_then_surfaces_transport_kind() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_failure(TransportFailure::Timeout(Duration::from_secs(1)));
        transport.push_failure(TransportFailure::Connection("refused".into()));
        transport.push_failure(TransportFailure::Connection("refused".into()));

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ChainDataError::Transport {
                message: "connection failed: refused".to_string(),
            }
        );
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_timeout_then_success() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_failure(TransportFailure::Timeout(Duration::from_secs(1)));
        transport.push_json(json!({ "value": 9 }));

        let payload: Payload = client(&transport).get_json("http://p/x", &[]).await.unwrap();
        assert_eq!(payload.value, 9);
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_status(200, "<html>oops</html>");

        let err = client(&transport)
            .get_value("http://p/x", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ChainDataError::InvalidResponse { .. }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_invalid_response() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "value": "not a number" }));

        let err = client(&transport)
            .get_json::<Payload>("http://p/x", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ChainDataError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_query_is_forwarded() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_json(json!({ "value": 1 }));

        let query = vec![("limit".to_string(), "100".to_string())];
        let _: Payload = client(&transport).get_json("http://p/x", &query).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, "http://p/x");
        assert_eq!(requests[0].param("limit"), Some("100"));
    }
}
