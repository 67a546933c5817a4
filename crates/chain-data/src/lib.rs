//! CoinTracker Chain Data Crate
//!
//! Provider-facing half of the wallet sync pipeline. Nothing in here knows
//! about wallets, jobs or storage; callers hand in an address and get back
//! provider records or a typed failure.
//!
//! # Architecture
//!
//! ```text
//! +--------------------+
//! |  HistoryFetcher    |  (pages until exhaustion or the safety cap)
//! +--------------------+
//!           |
//!           v
//! +--------------------+
//! | ChainDataProvider  |  (Blockchair, ...)
//! +--------------------+
//!           |
//!           v
//! +--------------------+     +------------------+
//! |  ResilientClient   | --> |  BackoffPolicy   |
//! +--------------------+     +------------------+
//!           |
//!           v
//! +--------------------+
//! |   HttpTransport    |  (reqwest in production)
//! +--------------------+
//! ```
//!
//! Records coming back from a provider are turned into
//! [`NormalizedTransaction`]s by [`normalizer::normalize`].

pub mod backoff;
pub mod client;
pub mod errors;
pub mod history;
pub mod models;
pub mod normalizer;
pub mod provider;

pub use backoff::BackoffPolicy;
pub use client::{HttpResponse, HttpTransport, ReqwestTransport, ResilientClient, RetryConfig};
pub use errors::{ChainDataError, RetryClass};
pub use history::{HistoryConfig, HistoryFetch, HistoryFetcher};
pub use models::{
    sats_to_btc, AddressSummary, NormalizedTransaction, RawTransaction, TransactionDirection,
    SATS_PER_BTC,
};
pub use normalizer::{normalize, parse_provider_timestamp, NormalizeOutcome};
pub use provider::{BlockchairProvider, ChainDataProvider};
