use std::collections::HashSet;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::transactions_model::{NewTransaction, Transaction};
use crate::errors::Result;

/// Persistence contract for the transaction ledger.
#[async_trait]
pub trait TransactionRepositoryTrait: Send + Sync {
    /// Inserts the batch, ignoring rows whose `(wallet_id, txid)` already
    /// exists. Returns the number of rows actually written.
    async fn insert_ignore_existing(&self, transactions: Vec<NewTransaction>) -> Result<usize>;

    /// Provider ids already stored for the wallet.
    fn existing_txids(&self, wallet_id: i64) -> Result<HashSet<String>>;

    /// Page of the wallet's transactions, newest first.
    fn list_by_wallet(&self, wallet_id: i64, limit: i64, offset: i64) -> Result<Vec<Transaction>>;

    fn count_by_wallet(&self, wallet_id: i64) -> Result<i64>;

    /// Sum of signed values: received positive, sent negative.
    fn sum_signed_values(&self, wallet_id: i64) -> Result<Decimal>;
}
