//! Wallet repository and service traits.
//!
//! These traits define the contract for wallet operations without any
//! database-specific types, allowing for different storage implementations.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::wallets_model::{NewWallet, Wallet, WalletBalance, WalletSummary, WalletSyncStatus};
use crate::errors::Result;
use crate::transactions::{TransactionPage, TransactionQuery};

/// Trait defining the contract for Wallet repository operations.
#[async_trait]
pub trait WalletRepositoryTrait: Send + Sync {
    /// Creates a wallet in `pending` status.
    ///
    /// A duplicate address fails with a unique violation.
    async fn create(&self, new_wallet: NewWallet) -> Result<Wallet>;

    fn get_by_id(&self, wallet_id: i64) -> Result<Wallet>;

    fn find_by_address(&self, address: &str) -> Result<Option<Wallet>>;

    /// Lists wallets, newest first.
    fn list(&self) -> Result<Vec<Wallet>>;

    /// Stores a recomputed balance. `synced_at` is only set when the
    /// balance reflects a complete history.
    async fn update_balance(
        &self,
        wallet_id: i64,
        balance: Decimal,
        synced_at: Option<NaiveDateTime>,
    ) -> Result<Wallet>;

    /// Moves the wallet to `status`, rejecting illegal transitions.
    async fn update_status(&self, wallet_id: i64, status: WalletSyncStatus) -> Result<Wallet>;

    /// Moves every `syncing` wallet to `error`. Returns the number reset.
    async fn reset_interrupted(&self) -> Result<usize>;

    /// Deletes a wallet with its transactions and jobs.
    ///
    /// Returns the number of deleted wallets.
    async fn delete_by_address(&self, address: &str) -> Result<usize>;
}

/// Trait defining the contract for Wallet service operations.
#[async_trait]
pub trait WalletServiceTrait: Send + Sync {
    async fn create_wallet(&self, new_wallet: NewWallet) -> Result<Wallet>;

    fn get_wallet(&self, address: &str) -> Result<WalletSummary>;

    fn list_wallets(&self) -> Result<Vec<WalletSummary>>;

    async fn delete_wallet(&self, address: &str) -> Result<()>;

    fn get_transactions(&self, address: &str, query: TransactionQuery) -> Result<TransactionPage>;

    fn get_balance(&self, address: &str) -> Result<WalletBalance>;
}
