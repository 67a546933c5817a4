//! Blockchair provider for Bitcoin address data.
//!
//! Both the summary and the paged history come from the address dashboard
//! endpoint. Amounts are reported in satoshis.

mod models;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::debug;

use crate::client::{HttpTransport, ReqwestTransport, ResilientClient, RetryConfig};
use crate::errors::ChainDataError;
use crate::models::{AddressSummary, RawTransaction};
use crate::provider::traits::DEFAULT_PAGE_SIZE;
use crate::provider::ChainDataProvider;

use models::{DashboardResponse, HistoryDashboard, SummaryDashboard};

/// Provider ID constant
const PROVIDER_ID: &str = "BLOCKCHAIR";

pub const DEFAULT_BASE_URL: &str = "https://api.blockchair.com/bitcoin";

const USER_AGENT: &str = "CoinTracker/1.0";

pub struct BlockchairProvider {
    client: ResilientClient,
    base_url: String,
}

impl BlockchairProvider {
    /// Provider over a real HTTP client. Fails only when that client cannot be built.
    pub fn new(base_url: impl Into<String>, config: RetryConfig) -> Result<Self, ChainDataError> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(USER_AGENT)?);
        Ok(Self::with_transport(base_url, transport, config))
    }

    pub fn with_transport(
        base_url: impl Into<String>,
        transport: Arc<dyn HttpTransport>,
        config: RetryConfig,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: ResilientClient::new(transport, config),
            base_url,
        }
    }

    fn dashboard_url(&self, address: &str) -> String {
        format!("{}/dashboards/address/{}", self.base_url, address)
    }

    /// Pulls the entry for `address` out of the dashboard map.
    ///
    /// Bech32 addresses may come back lowercased, so fall back to a
    /// case-insensitive match.
    fn take_entry<T>(mut data: HashMap<String, T>, address: &str) -> Result<T, ChainDataError> {
        if let Some(entry) = data.remove(address) {
            return Ok(entry);
        }

        data.into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(address))
            .map(|(_, entry)| entry)
            .ok_or_else(|| ChainDataError::InvalidResponse {
                message: format!("response has no data for address {}", address),
            })
    }
}

#[async_trait]
impl ChainDataProvider for BlockchairProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn max_page_size(&self) -> usize {
        DEFAULT_PAGE_SIZE
    }

    async fn get_address_summary(&self, address: &str) -> Result<AddressSummary, ChainDataError> {
        let response: DashboardResponse<SummaryDashboard> = self
            .client
            .get_json(&self.dashboard_url(address), &[])
            .await?;
        let stats = Self::take_entry(response.data, address)?.address;

        Ok(AddressSummary {
            address: address.to_string(),
            balance_sats: stats.balance,
            transaction_count: stats.transaction_count,
        })
    }

    async fn get_address_transactions(
        &self,
        address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawTransaction>, ChainDataError> {
        let limit = limit.clamp(1, DEFAULT_PAGE_SIZE);
        let query = vec![
            ("limit".to_string(), limit.to_string()),
            ("offset".to_string(), offset.to_string()),
            ("transaction_details".to_string(), "true".to_string()),
        ];

        let response: DashboardResponse<HistoryDashboard> = self
            .client
            .get_json(&self.dashboard_url(address), &query)
            .await?;
        let transactions = Self::take_entry(response.data, address)?.transactions;

        debug!(
            "{}: {} transactions for {} (limit {}, offset {})",
            PROVIDER_ID,
            transactions.len(),
            address,
            limit,
            offset
        );
        Ok(transactions)
    }
}
