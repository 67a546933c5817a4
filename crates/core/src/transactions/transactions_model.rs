//! Transaction domain models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use cointracker_chain_data::{NormalizedTransaction, TransactionDirection};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_TRANSACTIONS_LIMIT, MAX_TRANSACTIONS_LIMIT};
use crate::{errors::ValidationError, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Received,
    Sent,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Sent => "sent",
        }
    }

    /// Applies the type's sign to an absolute amount.
    pub fn sign(&self, value: Decimal) -> Decimal {
        match self {
            Self::Received => value,
            Self::Sent => -value,
        }
    }
}

impl From<TransactionDirection> for TransactionType {
    fn from(direction: TransactionDirection) -> Self {
        match direction {
            TransactionDirection::Received => Self::Received,
            TransactionDirection::Sent => Self::Sent,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "received" => Ok(Self::Received),
            "sent" => Ok(Self::Sent),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown transaction type '{}'",
                other
            )))),
        }
    }
}

/// A persisted ledger entry. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub wallet_id: i64,
    pub txid: String,
    pub block_height: Option<i64>,
    pub timestamp: NaiveDateTime,
    /// Absolute amount in whole coins; the sign lives in `tx_type`.
    pub value: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub created_at: NaiveDateTime,
}

impl Transaction {
    pub fn signed_value(&self) -> Decimal {
        self.tx_type.sign(self.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub wallet_id: i64,
    pub txid: String,
    pub block_height: Option<i64>,
    pub timestamp: NaiveDateTime,
    pub value: Decimal,
    pub tx_type: TransactionType,
}

impl NewTransaction {
    pub fn from_normalized(wallet_id: i64, tx: &NormalizedTransaction) -> Self {
        Self {
            wallet_id,
            txid: tx.txid.clone(),
            block_height: tx.block_height,
            timestamp: tx.timestamp.naive_utc(),
            value: tx.value,
            tx_type: tx.direction.into(),
        }
    }

    pub fn signed_value(&self) -> Decimal {
        self.tx_type.sign(self.value)
    }
}

/// Paging parameters for transaction listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl TransactionQuery {
    /// Resolves defaults and caps the limit. Returns `(limit, offset)`.
    pub fn resolve(&self) -> Result<(i64, i64)> {
        let limit = self.limit.unwrap_or(DEFAULT_TRANSACTIONS_LIMIT);
        let offset = self.offset.unwrap_or(0);
        if limit < 1 || offset < 0 {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Invalid pagination parameters".to_string(),
            )));
        }
        Ok((limit.min(MAX_TRANSACTIONS_LIMIT), offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(total: i64, limit: i64, offset: i64) -> Self {
        Self {
            total,
            limit,
            offset,
            has_more: offset.saturating_add(limit) < total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub pagination: Pagination,
}
