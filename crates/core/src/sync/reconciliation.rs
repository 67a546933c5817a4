//! Reconciliation engine.
//!
//! One run pulls an address history from the provider, merges it into the
//! ledger and recomputes the wallet balance from what the ledger holds.
//!
//! ```text
//! not-started -> running -> completed   (wallet synced)
//!                        \-> failed     (wallet error)
//! ```
//!
//! Failures never escape [`ReconciliationEngine::run_sync`]. They are
//! written to the wallet and job rows, which is what callers poll.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use cointracker_chain_data::{
    normalize, ChainDataProvider, HistoryFetcher, NormalizeOutcome, RawTransaction,
};
use log::{debug, error, info, warn};
use rust_decimal::Decimal;

use super::sync_model::{SyncJobStatus, SyncRunReport, SyncRunSummary};
use super::sync_traits::SyncJobRepositoryTrait;
use crate::constants::DEFAULT_MAX_SYNC_TRANSACTIONS;
use crate::errors::{Error, Result};
use crate::transactions::{NewTransaction, TransactionRepositoryTrait};
use crate::wallets::{Wallet, WalletRepositoryTrait, WalletSyncStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Safety cap on transactions fetched per run.
    pub max_transactions: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_transactions: DEFAULT_MAX_SYNC_TRANSACTIONS,
        }
    }
}

pub struct ReconciliationEngine {
    provider: Arc<dyn ChainDataProvider>,
    fetcher: HistoryFetcher,
    wallets: Arc<dyn WalletRepositoryTrait>,
    transactions: Arc<dyn TransactionRepositoryTrait>,
    jobs: Arc<dyn SyncJobRepositoryTrait>,
    config: SyncConfig,
}

impl ReconciliationEngine {
    pub fn new(
        provider: Arc<dyn ChainDataProvider>,
        fetcher: HistoryFetcher,
        wallets: Arc<dyn WalletRepositoryTrait>,
        transactions: Arc<dyn TransactionRepositoryTrait>,
        jobs: Arc<dyn SyncJobRepositoryTrait>,
        config: SyncConfig,
    ) -> Self {
        Self {
            provider,
            fetcher,
            wallets,
            transactions,
            jobs,
            config,
        }
    }

    /// Runs a full sync of `address`, recording the outcome on the wallet
    /// and, when given, on job `job_id`.
    ///
    /// The caller must already hold the wallet (see
    /// [`SyncJobRepositoryTrait::claim_wallet`]).
    pub async fn run_sync(&self, address: &str, job_id: Option<i64>) -> SyncRunReport {
        let mut summary = SyncRunSummary::default();

        let wallet = match self.wallets.find_by_address(address) {
            Ok(Some(wallet)) => wallet,
            Ok(None) => {
                let message = format!("Wallet not found: {}", address);
                return self.abort(address, job_id, message, summary).await;
            }
            Err(e) => {
                let message = format!("Failed to load wallet {}: {}", address, e);
                return self.abort(address, job_id, message, summary).await;
            }
        };

        info!("Starting sync for {} (job {:?})", address, job_id);

        match self.execute(&wallet, job_id, &mut summary).await {
            Ok(()) => {
                info!(
                    "Sync for {} completed: {} fetched, {} stored, {} duplicates, {} zero-change, {} malformed",
                    address,
                    summary.fetched,
                    summary.stored,
                    summary.duplicates,
                    summary.skipped_zero_change,
                    summary.malformed
                );
                SyncRunReport {
                    address: address.to_string(),
                    wallet_id: Some(wallet.id),
                    job_id,
                    status: SyncJobStatus::Completed,
                    error: None,
                    summary,
                }
            }
            Err(e) => {
                let message = e.to_string();
                error!("Sync for {} failed: {}", address, message);
                self.record_failure(wallet.id, job_id, &message).await;
                SyncRunReport {
                    address: address.to_string(),
                    wallet_id: Some(wallet.id),
                    job_id,
                    status: SyncJobStatus::Failed,
                    error: Some(message),
                    summary,
                }
            }
        }
    }

    /// Current balance according to the provider, without touching the
    /// ledger. Zero when the provider cannot answer.
    pub async fn quick_balance(&self, address: &str) -> Decimal {
        match self.provider.get_address_summary(address).await {
            Ok(summary) => summary.balance(),
            Err(e) => {
                warn!("Balance probe for {} failed: {}", address, e);
                Decimal::ZERO
            }
        }
    }

    async fn execute(
        &self,
        wallet: &Wallet,
        job_id: Option<i64>,
        summary: &mut SyncRunSummary,
    ) -> Result<()> {
        self.wallets
            .update_status(wallet.id, WalletSyncStatus::Syncing)
            .await?;
        if let Some(job_id) = job_id {
            self.jobs.mark_running(job_id).await?;
        }

        let address_summary = self.provider.get_address_summary(&wallet.address).await?;
        let reported = usize::try_from(address_summary.transaction_count).unwrap_or(usize::MAX);
        summary.provider_transaction_count = address_summary.transaction_count;
        summary.target = reported.min(self.config.max_transactions);
        if reported > self.config.max_transactions {
            summary.truncated = true;
            warn!(
                "{} reports {} transactions; fetching only the first {}",
                wallet.address, reported, self.config.max_transactions
            );
        }
        info!(
            "{} reports {} transactions for {}",
            self.provider.id(),
            reported,
            wallet.address
        );

        let fetch = self
            .fetcher
            .fetch(self.provider.as_ref(), &wallet.address, summary.target)
            .await;
        summary.pages_fetched = fetch.pages_fetched;
        summary.fetched = fetch.records.len();

        self.persist(wallet, &fetch.records, summary).await?;
        let balance = self.transactions.sum_signed_values(wallet.id)?;
        summary.balance = Some(balance);

        if let Some(interruption) = fetch.interruption {
            // Keep the ledger invariant for what did land, but leave
            // last_synced alone: the history is incomplete.
            self.wallets
                .update_balance(wallet.id, balance, None)
                .await?;
            return Err(Error::PartialSync {
                fetched: summary.fetched,
                expected: summary.target,
                source: interruption,
            });
        }

        self.jobs
            .complete_run(wallet.id, job_id, balance, Utc::now().naive_utc())
            .await
    }

    /// Normalizes `records` and writes the ones the ledger does not have yet.
    async fn persist(
        &self,
        wallet: &Wallet,
        records: &[RawTransaction],
        summary: &mut SyncRunSummary,
    ) -> Result<()> {
        let known = self.transactions.existing_txids(wallet.id)?;
        let mut seen: HashSet<String> = HashSet::new();
        let mut batch = Vec::new();

        for raw in records {
            match normalize(&wallet.address, raw) {
                NormalizeOutcome::Transaction(tx) => {
                    if known.contains(&tx.txid) || !seen.insert(tx.txid.clone()) {
                        summary.duplicates += 1;
                        continue;
                    }
                    batch.push(NewTransaction::from_normalized(wallet.id, &tx));
                }
                NormalizeOutcome::ZeroChange => summary.skipped_zero_change += 1,
                NormalizeOutcome::Malformed(_) => summary.malformed += 1,
            }
        }

        if batch.is_empty() {
            debug!("No new transactions for {}", wallet.address);
            return Ok(());
        }

        let attempted = batch.len();
        let inserted = self.transactions.insert_ignore_existing(batch).await?;
        summary.stored = inserted;
        // Rows another writer stored between the lookup and the insert.
        summary.duplicates += attempted.saturating_sub(inserted);
        Ok(())
    }

    /// Failure path: wallet to `error` and job to `failed` in one write.
    /// Errors here are logged only; there is nobody left to report them to.
    async fn record_failure(&self, wallet_id: i64, job_id: Option<i64>, message: &str) {
        let Err(e) = self.jobs.fail_run(wallet_id, job_id, message).await else {
            return;
        };
        error!("Could not record failure for wallet {}: {}", wallet_id, e);
        // The wallet may already have left `syncing`; the job still has to close.
        if let Some(job_id) = job_id {
            self.fail_job(job_id, message).await;
        }
    }

    /// Closes out a run whose task died before it could record an outcome.
    pub async fn record_crash(
        &self,
        wallet_id: i64,
        address: &str,
        job_id: Option<i64>,
        message: String,
    ) -> SyncRunReport {
        error!("Sync for {} crashed: {}", address, message);
        self.record_failure(wallet_id, job_id, &message).await;
        SyncRunReport {
            address: address.to_string(),
            wallet_id: Some(wallet_id),
            job_id,
            status: SyncJobStatus::Failed,
            error: Some(message),
            summary: SyncRunSummary::default(),
        }
    }

    async fn fail_job(&self, job_id: i64, message: &str) {
        if let Err(e) = self
            .jobs
            .finish(job_id, SyncJobStatus::Failed, Some(message.to_string()))
            .await
        {
            error!("Could not mark job {} as failed: {}", job_id, e);
        }
    }

    async fn abort(
        &self,
        address: &str,
        job_id: Option<i64>,
        message: String,
        summary: SyncRunSummary,
    ) -> SyncRunReport {
        error!("Sync for {} aborted: {}", address, message);
        if let Some(job_id) = job_id {
            self.fail_job(job_id, &message).await;
        }
        SyncRunReport {
            address: address.to_string(),
            wallet_id: None,
            job_id,
            status: SyncJobStatus::Failed,
            error: Some(message),
            summary,
        }
    }
}
