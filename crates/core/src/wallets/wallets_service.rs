use log::{debug, info};
use std::sync::Arc;

use super::wallets_model::{NewWallet, Wallet, WalletBalance, WalletSummary};
use super::wallets_traits::{WalletRepositoryTrait, WalletServiceTrait};
use crate::errors::{DatabaseError, Error, Result};
use crate::transactions::{Pagination, TransactionPage, TransactionQuery, TransactionRepositoryTrait};

/// Read and registration side of the wallet ledger.
pub struct WalletService {
    wallets: Arc<dyn WalletRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
}

impl WalletService {
    pub fn new(
        wallets: Arc<dyn WalletRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
    ) -> Self {
        Self {
            wallets,
            transactions,
        }
    }

    fn require(&self, address: &str) -> Result<Wallet> {
        self.wallets
            .find_by_address(address)?
            .ok_or_else(|| Error::NotFound(format!("Wallet not found: {}", address)))
    }

    fn summarize(&self, wallet: Wallet) -> Result<WalletSummary> {
        let transaction_count = self.transactions.count_by_wallet(wallet.id)?;
        Ok(WalletSummary {
            wallet,
            transaction_count,
        })
    }
}

#[async_trait::async_trait]
impl WalletServiceTrait for WalletService {
    async fn create_wallet(&self, new_wallet: NewWallet) -> Result<Wallet> {
        let new_wallet = NewWallet::new(new_wallet.address);
        new_wallet.validate()?;

        if self.wallets.find_by_address(&new_wallet.address)?.is_some() {
            return Err(Error::ConstraintViolation(format!(
                "Wallet already exists: {}",
                new_wallet.address
            )));
        }

        // A concurrent registration can still win the race; the unique index
        // catches it.
        let wallet = self.wallets.create(new_wallet).await.map_err(|e| match e {
            Error::Database(DatabaseError::UniqueViolation(msg)) => {
                Error::ConstraintViolation(format!("Wallet already exists: {}", msg))
            }
            other => other,
        })?;
        info!("Registered wallet {} (id {})", wallet.address, wallet.id);
        Ok(wallet)
    }

    fn get_wallet(&self, address: &str) -> Result<WalletSummary> {
        let wallet = self.require(address)?;
        self.summarize(wallet)
    }

    fn list_wallets(&self) -> Result<Vec<WalletSummary>> {
        self.wallets
            .list()?
            .into_iter()
            .map(|wallet| self.summarize(wallet))
            .collect()
    }

    async fn delete_wallet(&self, address: &str) -> Result<()> {
        let deleted = self.wallets.delete_by_address(address).await?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Wallet not found: {}", address)));
        }
        info!("Deleted wallet {}", address);
        Ok(())
    }

    fn get_transactions(&self, address: &str, query: TransactionQuery) -> Result<TransactionPage> {
        let (limit, offset) = query.resolve()?;
        let wallet = self.require(address)?;

        let transactions = self.transactions.list_by_wallet(wallet.id, limit, offset)?;
        let total = self.transactions.count_by_wallet(wallet.id)?;
        debug!(
            "Listing {} of {} transactions for {} (offset {})",
            transactions.len(),
            total,
            address,
            offset
        );

        Ok(TransactionPage {
            transactions,
            pagination: Pagination::new(total, limit, offset),
        })
    }

    fn get_balance(&self, address: &str) -> Result<WalletBalance> {
        let wallet = self.require(address)?;
        Ok(WalletBalance::from(&wallet))
    }
}
