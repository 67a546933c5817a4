//! Wallet domain models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, Error, Result};

const MIN_ADDRESS_LEN: usize = 14;
const MAX_ADDRESS_LEN: usize = 100;

/// Sync status of a wallet.
///
/// `Pending` is only ever the initial state. A run moves the wallet to
/// `Syncing` and ends it in `Synced` or `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalletSyncStatus {
    #[default]
    Pending,
    Syncing,
    Synced,
    Error,
}

impl WalletSyncStatus {
    pub const ALL: [WalletSyncStatus; 4] = [
        Self::Pending,
        Self::Syncing,
        Self::Synced,
        Self::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Syncing => "syncing",
            Self::Synced => "synced",
            Self::Error => "error",
        }
    }

    /// Legal transitions. `Syncing -> Syncing` is allowed because the job
    /// layer claims the wallet before the engine marks it.
    pub fn can_transition_to(&self, next: WalletSyncStatus) -> bool {
        match next {
            Self::Syncing => true,
            Self::Synced | Self::Error => *self == Self::Syncing,
            Self::Pending => false,
        }
    }

    pub fn is_busy(&self) -> bool {
        *self == Self::Syncing
    }
}

impl fmt::Display for WalletSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletSyncStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "syncing" => Ok(Self::Syncing),
            "synced" => Ok(Self::Synced),
            "error" => Ok(Self::Error),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown wallet sync status '{}'",
                other
            )))),
        }
    }
}

/// Domain model representing a tracked address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: i64,
    pub address: String,
    /// Sum of the signed values of the wallet's persisted transactions.
    pub balance: Decimal,
    pub last_synced: Option<NaiveDateTime>,
    pub sync_status: WalletSyncStatus,
    pub created_at: NaiveDateTime,
}

/// Wallet plus the number of transactions stored for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSummary {
    #[serde(flatten)]
    pub wallet: Wallet,
    pub transaction_count: i64,
}

/// Stored ledger balance of a wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub address: String,
    pub balance: Decimal,
    pub last_synced: Option<NaiveDateTime>,
    pub sync_status: WalletSyncStatus,
}

impl From<&Wallet> for WalletBalance {
    fn from(wallet: &Wallet) -> Self {
        Self {
            address: wallet.address.clone(),
            balance: wallet.balance,
            last_synced: wallet.last_synced,
            sync_status: wallet.sync_status,
        }
    }
}

/// Input model for registering a new wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWallet {
    pub address: String,
}

impl NewWallet {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into().trim().to_string(),
        }
    }

    /// Shape check only. The provider is the authority on whether the
    /// address exists on chain.
    pub fn validate(&self) -> Result<()> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "address".to_string(),
            )));
        }
        if !address.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Address may only contain letters and digits".to_string(),
            )));
        }
        if !(MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&address.len()) {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Address length must be between {} and {} characters",
                MIN_ADDRESS_LEN, MAX_ADDRESS_LEN
            ))));
        }
        Ok(())
    }
}
