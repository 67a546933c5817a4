//! Chain data provider trait definition.

use async_trait::async_trait;

use crate::errors::ChainDataError;
use crate::models::{AddressSummary, RawTransaction};

/// Largest page most providers hand out per request.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Read-only view of the chain, queried by address.
///
/// Implementations are expected to route their requests through a
/// [`ResilientClient`](crate::client::ResilientClient), so every error they
/// return is already final.
#[async_trait]
pub trait ChainDataProvider: Send + Sync {
    /// Unique identifier for this provider, used in logs.
    fn id(&self) -> &'static str;

    /// Maximum number of records one page request may ask for.
    fn max_page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    /// Current balance and total transaction count for `address`.
    async fn get_address_summary(&self, address: &str) -> Result<AddressSummary, ChainDataError>;

    /// One page of the address history, newest first.
    async fn get_address_transactions(
        &self,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawTransaction>, ChainDataError>;
}
