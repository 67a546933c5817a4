//! Provider-facing data shapes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Satoshis per whole bitcoin.
pub const SATS_PER_BTC: i64 = 100_000_000;

const BTC_SCALE: u32 = 8;

/// Converts an amount in satoshis to whole-coin units without rounding.
pub fn sats_to_btc(sats: i64) -> Decimal {
    Decimal::new(sats, BTC_SCALE).normalize()
}

/// Balance and activity counters for one address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSummary {
    pub address: String,
    pub balance_sats: i64,
    pub transaction_count: u64,
}

impl AddressSummary {
    pub fn balance(&self) -> Decimal {
        sats_to_btc(self.balance_sats)
    }
}

/// One transaction as the provider reports it for a specific address.
///
/// Everything except the balance change is optional so that one bad record
/// does not fail the decoding of the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub block_id: Option<i64>,
    #[serde(default)]
    pub time: Option<String>,
    /// Signed change in satoshis for the tracked address.
    #[serde(default)]
    pub balance_change: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionDirection {
    Received,
    Sent,
}

impl TransactionDirection {
    pub fn from_balance_change(sats: i64) -> Option<Self> {
        match sats.signum() {
            1 => Some(Self::Received),
            -1 => Some(Self::Sent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Sent => "sent",
        }
    }
}

/// Canonical transaction, ready to be persisted against a wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTransaction {
    pub txid: String,
    /// `None` while the transaction is unconfirmed.
    pub block_height: Option<i64>,
    pub timestamp: DateTime<Utc>,
    /// Absolute amount in whole coins.
    pub value: Decimal,
    pub direction: TransactionDirection,
}

impl NormalizedTransaction {
    /// Amount with its sign restored: positive when received.
    pub fn signed_value(&self) -> Decimal {
        match self.direction {
            TransactionDirection::Received => self.value,
            TransactionDirection::Sent => -self.value,
        }
    }
}
