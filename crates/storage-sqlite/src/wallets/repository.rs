use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::debug;
use rust_decimal::Decimal;
use std::sync::Arc;

use cointracker_core::errors::{Error, Result};
use cointracker_core::wallets::{NewWallet, Wallet, WalletRepositoryTrait, WalletSyncStatus};

use super::model::{NewWalletDB, WalletDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::wallets;

/// Repository for wallet rows.
pub struct WalletRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl WalletRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

/// Loads a wallet on the writer's connection, failing with `NotFound`.
pub(crate) fn load_wallet(
    conn: &mut SqliteConnection,
    wallet_id: i64,
) -> std::result::Result<Wallet, StorageError> {
    let row = wallets::table
        .find(wallet_id)
        .select(WalletDB::as_select())
        .first::<WalletDB>(conn)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Wallet not found: id {}", wallet_id)))?;
    Wallet::try_from(row)
}

/// Stores a recomputed balance, stamping `last_synced` only when given.
pub(crate) fn write_balance(
    conn: &mut SqliteConnection,
    wallet_id: i64,
    balance: Decimal,
    synced_at: Option<NaiveDateTime>,
) -> std::result::Result<(), StorageError> {
    let target = wallets::table.find(wallet_id);
    let updated = match synced_at {
        Some(at) => diesel::update(target)
            .set((
                wallets::balance.eq(balance.to_string()),
                wallets::last_synced.eq(Some(at)),
            ))
            .execute(conn)?,
        None => diesel::update(target)
            .set(wallets::balance.eq(balance.to_string()))
            .execute(conn)?,
    };
    if updated == 0 {
        return Err(Error::NotFound(format!("Wallet not found: id {}", wallet_id)).into());
    }
    Ok(())
}

/// Moves a wallet to `status`, rejecting transitions the status machine forbids.
pub(crate) fn transition_wallet(
    conn: &mut SqliteConnection,
    wallet_id: i64,
    status: WalletSyncStatus,
) -> std::result::Result<Wallet, StorageError> {
    let current = load_wallet(conn, wallet_id)?;
    if !current.sync_status.can_transition_to(status) {
        return Err(Error::InvalidTransition {
            entity: "wallet",
            from: current.sync_status.to_string(),
            to: status.to_string(),
        }
        .into());
    }

    diesel::update(wallets::table.find(wallet_id))
        .set(wallets::sync_status.eq(status.as_str()))
        .execute(conn)?;

    debug!(
        "Wallet {} status {} -> {}",
        wallet_id, current.sync_status, status
    );
    load_wallet(conn, wallet_id)
}

#[async_trait]
impl WalletRepositoryTrait for WalletRepository {
    async fn create(&self, new_wallet: NewWallet) -> Result<Wallet> {
        self.writer
            .exec(move |conn| {
                let row = diesel::insert_into(wallets::table)
                    .values(NewWalletDB::pending(new_wallet.address))
                    .returning(WalletDB::as_returning())
                    .get_result::<WalletDB>(conn)?;
                Wallet::try_from(row)
            })
            .await
    }

    fn get_by_id(&self, wallet_id: i64) -> Result<Wallet> {
        let mut conn = get_connection(&self.pool)?;
        let row = wallets::table
            .find(wallet_id)
            .select(WalletDB::as_select())
            .first::<WalletDB>(&mut conn)
            .into_core()?;
        Wallet::try_from(row).map_err(Error::from)
    }

    fn find_by_address(&self, address: &str) -> Result<Option<Wallet>> {
        let mut conn = get_connection(&self.pool)?;
        wallets::table
            .filter(wallets::address.eq(address))
            .select(WalletDB::as_select())
            .first::<WalletDB>(&mut conn)
            .optional()
            .into_core()?
            .map(Wallet::try_from)
            .transpose()
            .map_err(Error::from)
    }

    fn list(&self) -> Result<Vec<Wallet>> {
        let mut conn = get_connection(&self.pool)?;
        wallets::table
            .select(WalletDB::as_select())
            .order((wallets::created_at.desc(), wallets::id.desc()))
            .load::<WalletDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| Wallet::try_from(row).map_err(Error::from))
            .collect()
    }

    async fn update_balance(
        &self,
        wallet_id: i64,
        balance: Decimal,
        synced_at: Option<NaiveDateTime>,
    ) -> Result<Wallet> {
        self.writer
            .exec(move |conn| {
                write_balance(conn, wallet_id, balance, synced_at)?;
                load_wallet(conn, wallet_id)
            })
            .await
    }

    async fn update_status(&self, wallet_id: i64, status: WalletSyncStatus) -> Result<Wallet> {
        self.writer
            .exec(move |conn| transition_wallet(conn, wallet_id, status))
            .await
    }

    async fn reset_interrupted(&self) -> Result<usize> {
        self.writer
            .exec(|conn| {
                let reset = diesel::update(
                    wallets::table
                        .filter(wallets::sync_status.eq(WalletSyncStatus::Syncing.as_str())),
                )
                .set(wallets::sync_status.eq(WalletSyncStatus::Error.as_str()))
                .execute(conn)?;
                Ok(reset)
            })
            .await
    }

    async fn delete_by_address(&self, address: &str) -> Result<usize> {
        let address = address.to_string();
        self.writer
            .exec(move |conn| {
                let deleted =
                    diesel::delete(wallets::table.filter(wallets::address.eq(address)))
                        .execute(conn)?;
                Ok(deleted)
            })
            .await
    }
}
