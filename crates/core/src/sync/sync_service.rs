use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;

use super::reconciliation::ReconciliationEngine;
use super::sync_model::{SyncJob, SyncRecovery, SyncRunReport};
use super::sync_traits::{SyncJobRepositoryTrait, SyncServiceTrait};
use crate::constants::{DEFAULT_JOBS_LIMIT, INTERRUPTED_SYNC_MESSAGE};
use crate::errors::{Error, Result};
use crate::wallets::{Wallet, WalletRepositoryTrait};

/// A sync that has been accepted and handed to the runtime.
pub struct DispatchedSync {
    pub job: SyncJob,
    pub handle: JoinHandle<SyncRunReport>,
}

/// Job layer over the reconciliation engine: one run per wallet at a time,
/// each run on its own task.
pub struct SyncService {
    engine: Arc<ReconciliationEngine>,
    wallets: Arc<dyn WalletRepositoryTrait>,
    jobs: Arc<dyn SyncJobRepositoryTrait>,
}

impl SyncService {
    pub fn new(
        engine: Arc<ReconciliationEngine>,
        wallets: Arc<dyn WalletRepositoryTrait>,
        jobs: Arc<dyn SyncJobRepositoryTrait>,
    ) -> Self {
        Self {
            engine,
            wallets,
            jobs,
        }
    }

    fn require_wallet(&self, address: &str) -> Result<Wallet> {
        self.wallets
            .find_by_address(address)?
            .ok_or_else(|| Error::NotFound(format!("Wallet not found: {}", address)))
    }

    /// Wallets a periodic sweep may sync right now.
    pub fn idle_wallets(&self) -> Result<Vec<Wallet>> {
        Ok(self
            .wallets
            .list()?
            .into_iter()
            .filter(|wallet| !wallet.sync_status.is_busy())
            .collect())
    }
}

#[async_trait]
impl SyncServiceTrait for SyncService {
    async fn request_sync(&self, address: &str) -> Result<DispatchedSync> {
        let wallet = self.require_wallet(address)?;

        let job = match self.jobs.claim_wallet(wallet.id).await? {
            Some(job) => job,
            None => {
                debug!("Sync for {} refused: already syncing", address);
                return Err(Error::SyncInProgress(wallet.address));
            }
        };
        info!("Queued sync job {} for {}", job.id, wallet.address);

        let engine = Arc::clone(&self.engine);
        let job_id = job.id;
        let wallet_id = wallet.id;
        let address = wallet.address;
        let handle = tokio::spawn(async move {
            let run = {
                let engine = Arc::clone(&engine);
                let address = address.clone();
                tokio::spawn(async move { engine.run_sync(&address, Some(job_id)).await })
            };
            match run.await {
                Ok(report) => report,
                // A panicking run never reaches its own failure path.
                Err(e) => {
                    let message = format!("Sync task ended unexpectedly: {}", e);
                    engine
                        .record_crash(wallet_id, &address, Some(job_id), message)
                        .await
                }
            }
        });

        Ok(DispatchedSync { job, handle })
    }

    fn get_job(&self, job_id: i64) -> Result<SyncJob> {
        self.jobs
            .get_by_id(job_id)?
            .ok_or_else(|| Error::NotFound(format!("Job not found: {}", job_id)))
    }

    fn recent_jobs(&self, address: &str, limit: Option<i64>) -> Result<Vec<SyncJob>> {
        let wallet = self.require_wallet(address)?;
        let limit = limit.unwrap_or(DEFAULT_JOBS_LIMIT).max(1);
        self.jobs.list_for_wallet(wallet.id, limit)
    }

    async fn quick_balance(&self, address: &str) -> Decimal {
        self.engine.quick_balance(address).await
    }

    async fn recover_interrupted(&self) -> Result<SyncRecovery> {
        let wallets_reset = self.wallets.reset_interrupted().await?;
        let jobs_failed = self.jobs.fail_unfinished(INTERRUPTED_SYNC_MESSAGE).await?;
        if wallets_reset > 0 || jobs_failed > 0 {
            warn!(
                "Recovered {} interrupted wallets and {} unfinished jobs",
                wallets_reset, jobs_failed
            );
        }
        Ok(SyncRecovery {
            wallets_reset,
            jobs_failed,
        })
    }
}
