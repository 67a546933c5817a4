//! Error types and retry classification for the chain data crate.
//!
//! This module provides:
//! - [`ChainDataError`]: The typed failure every provider call resolves to
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to a blockchain data provider.
///
/// Every variant is classified into a [`RetryClass`] via
/// [`retry_class`](Self::retry_class). The resilient client only ever
/// surfaces one of these after it has finished retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainDataError {
    /// Connection failure or timeout on the final attempt.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// HTTP 429. Retried; surfaces as `RetriesExhausted` once attempts run out.
    #[error("HTTP 429 Too Many Requests")]
    RateLimited,

    /// The provider kept answering with a 5xx status.
    #[error("Server error: HTTP {status}")]
    Server { status: u16 },

    /// Any other non-success HTTP status. Not retried.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// A 200 response whose payload carries the provider's own error field.
    #[error("API error: {message}")]
    Api { message: String },

    /// Every attempt was spent without a usable answer.
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The payload decoded as JSON but not into the expected shape.
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

impl ChainDataError {
    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use cointracker_chain_data::errors::{ChainDataError, RetryClass};
    ///
    /// let error = ChainDataError::Server { status: 503 };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = ChainDataError::Http { status: 404, message: "Not Found".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Transport { .. } | Self::RateLimited | Self::Server { .. } => {
                RetryClass::WithBackoff
            }

            Self::Http { .. }
            | Self::Api { .. }
            | Self::RetriesExhausted { .. }
            | Self::InvalidResponse { .. } => RetryClass::Never,
        }
    }
}
