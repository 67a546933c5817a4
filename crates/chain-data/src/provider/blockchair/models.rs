//! Blockchair dashboard response shapes.

use std::collections::HashMap;

use serde::Deserialize;

use crate::models::RawTransaction;

/// `GET /dashboards/address/{address}` envelope. `data` is keyed by address.
#[derive(Debug, Deserialize)]
pub(crate) struct DashboardResponse<T> {
    #[serde(default = "HashMap::new")]
    pub data: HashMap<String, T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AddressStats {
    #[serde(default)]
    pub balance: i64,
    #[serde(default)]
    pub transaction_count: u64,
}

/// Dashboard without transaction details; `transactions` is then a list of
/// hashes and is not read.
#[derive(Debug, Deserialize)]
pub(crate) struct SummaryDashboard {
    pub address: AddressStats,
}

/// Dashboard requested with `transaction_details=true`.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryDashboard {
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}
