//! Paginated history fetcher.
//!
//! Pages through an address history one request at a time. A failing page
//! ends the walk but keeps whatever was already gathered; the failure is
//! handed back next to the records so the caller can decide what a partial
//! history means for it.

use std::time::Duration;

use log::{debug, info, warn};

use crate::errors::ChainDataError;
use crate::models::RawTransaction;
use crate::provider::ChainDataProvider;

/// Records requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Upper bound on records fetched in one walk.
pub const DEFAULT_MAX_RECORDS: usize = 10_000;

/// Pause between consecutive page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    pub page_size: usize,
    pub max_records: usize,
    pub page_delay: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_records: DEFAULT_MAX_RECORDS,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }
}

/// Result of one history walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFetch {
    pub records: Vec<RawTransaction>,
    pub pages_fetched: usize,
    /// Set when a page request failed and the walk stopped early.
    pub interruption: Option<ChainDataError>,
}

impl HistoryFetch {
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFetcher {
    config: HistoryConfig,
}

impl HistoryFetcher {
    pub fn new(config: HistoryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Fetches up to `target` records for `address`, bounded by the
    /// configured safety cap.
    pub async fn fetch(
        &self,
        provider: &dyn ChainDataProvider,
        address: &str,
        target: usize,
    ) -> HistoryFetch {
        let cap = target.min(self.config.max_records);
        let page_size = self.config.page_size.min(provider.max_page_size()).max(1);

        let mut records: Vec<RawTransaction> = Vec::with_capacity(cap);
        let mut pages_fetched = 0usize;
        let mut offset = 0usize;

        while records.len() < cap {
            if pages_fetched > 0 && !self.config.page_delay.is_zero() {
                tokio::time::sleep(self.config.page_delay).await;
            }

            let limit = page_size.min(cap - records.len());
            let page = match provider
                .get_address_transactions(address, limit, offset)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        "{}: history for {} interrupted at offset {} after {} records: {}",
                        provider.id(),
                        address,
                        offset,
                        records.len(),
                        err
                    );
                    return HistoryFetch {
                        records,
                        pages_fetched,
                        interruption: Some(err),
                    };
                }
            };

            pages_fetched += 1;
            let received = page.len();
            offset += received;
            let room = cap - records.len();
            records.extend(page.into_iter().take(room));

            debug!(
                "{}: page {} for {} returned {} records ({} total)",
                provider.id(),
                pages_fetched,
                address,
                received,
                records.len()
            );

            if received < limit {
                break;
            }
        }

        info!(
            "{}: fetched {} records for {} in {} pages",
            provider.id(),
            records.len(),
            address,
            pages_fetched
        );

        HistoryFetch {
            records,
            pages_fetched,
            interruption: None,
        }
    }
}
