//! Database model for wallets.

use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rust_decimal::Decimal;

use cointracker_core::wallets::{Wallet, WalletSyncStatus};

use crate::errors::StorageError;

/// Database model for wallets. Balances are stored as decimal text.
#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletDB {
    pub id: i64,
    pub address: String,
    pub balance: String,
    pub last_synced: Option<NaiveDateTime>,
    pub sync_status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::wallets)]
pub(crate) struct NewWalletDB {
    pub address: String,
    pub balance: String,
    pub sync_status: String,
    pub created_at: NaiveDateTime,
}

impl NewWalletDB {
    pub fn pending(address: String) -> Self {
        Self {
            address,
            balance: Decimal::ZERO.to_string(),
            sync_status: WalletSyncStatus::Pending.as_str().to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

impl TryFrom<WalletDB> for Wallet {
    type Error = StorageError;

    fn try_from(db: WalletDB) -> Result<Self, Self::Error> {
        let balance = Decimal::from_str(&db.balance).map_err(|e| {
            StorageError::CorruptValue(format!(
                "wallet {} balance '{}': {}",
                db.id, db.balance, e
            ))
        })?;
        let sync_status = WalletSyncStatus::from_str(&db.sync_status)?;

        Ok(Self {
            id: db.id,
            address: db.address,
            balance,
            last_synced: db.last_synced,
            sync_status,
            created_at: db.created_at,
        })
    }
}
