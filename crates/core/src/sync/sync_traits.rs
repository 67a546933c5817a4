use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::sync_model::{SyncJob, SyncJobStatus, SyncRecovery};
use super::sync_service::DispatchedSync;
use crate::errors::Result;

/// Persistence contract for sync jobs.
#[async_trait]
pub trait SyncJobRepositoryTrait: Send + Sync {
    /// Atomically moves the wallet to `syncing` unless it already is, and
    /// creates a `queued` job for it.
    ///
    /// Returns `None` when another run holds the wallet.
    async fn claim_wallet(&self, wallet_id: i64) -> Result<Option<SyncJob>>;

    /// `queued -> running`, stamping `started_at`.
    async fn mark_running(&self, job_id: i64) -> Result<SyncJob>;

    /// Sets a terminal status with `completed_at`. Only succeeds once per job.
    async fn finish(
        &self,
        job_id: i64,
        status: SyncJobStatus,
        error_message: Option<String>,
    ) -> Result<SyncJob>;

    /// Success path of a run as one write: stores `balance` with
    /// `last_synced = synced_at`, moves the wallet to `synced` and, when
    /// given, the job to `completed`. Nothing is written if any step fails.
    async fn complete_run(
        &self,
        wallet_id: i64,
        job_id: Option<i64>,
        balance: Decimal,
        synced_at: NaiveDateTime,
    ) -> Result<()>;

    /// Failure path of a run as one write: wallet to `error`, job to `failed`.
    async fn fail_run(&self, wallet_id: i64, job_id: Option<i64>, message: &str) -> Result<()>;

    fn get_by_id(&self, job_id: i64) -> Result<Option<SyncJob>>;

    /// Jobs for a wallet, newest first.
    fn list_for_wallet(&self, wallet_id: i64, limit: i64) -> Result<Vec<SyncJob>>;

    /// Fails every job still `queued` or `running`. Returns the number failed.
    async fn fail_unfinished(&self, message: &str) -> Result<usize>;
}

/// Entry points the job/API layer uses to run syncs.
#[async_trait]
pub trait SyncServiceTrait: Send + Sync {
    /// Claims the wallet, creates a job and dispatches the run.
    ///
    /// Fails with `NotFound` for an unknown address and `SyncInProgress`
    /// when a run already holds the wallet.
    async fn request_sync(&self, address: &str) -> Result<DispatchedSync>;

    fn get_job(&self, job_id: i64) -> Result<SyncJob>;

    fn recent_jobs(&self, address: &str, limit: Option<i64>) -> Result<Vec<SyncJob>>;

    /// Provider balance probe; zero when the provider cannot be reached.
    async fn quick_balance(&self, address: &str) -> Decimal;

    /// Resets wallets and jobs a previous process left mid-run.
    async fn recover_interrupted(&self) -> Result<SyncRecovery>;
}
