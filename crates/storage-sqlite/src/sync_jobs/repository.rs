use async_trait::async_trait;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::r2d2::{self, Pool};
use diesel::sqlite::SqliteConnection;
use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use cointracker_core::errors::{Error, Result};
use cointracker_core::sync::{SyncJob, SyncJobRepositoryTrait, SyncJobStatus};
use cointracker_core::wallets::WalletSyncStatus;

use super::model::{NewSyncJobDB, SyncJobDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{sync_jobs, wallets};
use crate::wallets::{transition_wallet, write_balance};

pub struct SyncJobRepository {
    pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl SyncJobRepository {
    pub fn new(
        pool: Arc<Pool<r2d2::ConnectionManager<SqliteConnection>>>,
        writer: WriteHandle,
    ) -> Self {
        Self { pool, writer }
    }
}

fn load_job(conn: &mut SqliteConnection, job_id: i64) -> std::result::Result<SyncJob, StorageError> {
    let row = sync_jobs::table
        .find(job_id)
        .select(SyncJobDB::as_select())
        .first::<SyncJobDB>(conn)
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("Sync job not found: {}", job_id)))?;
    SyncJob::try_from(row)
}

/// Explains why a conditional status update matched no row.
fn rejected_transition(
    conn: &mut SqliteConnection,
    job_id: i64,
    target: SyncJobStatus,
) -> StorageError {
    match load_job(conn, job_id) {
        Ok(job) => Error::InvalidTransition {
            entity: "sync job",
            from: job.status.to_string(),
            to: target.to_string(),
        }
        .into(),
        Err(e) => e,
    }
}

fn status_strings(statuses: &[SyncJobStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

/// Moves an unfinished job to the terminal `status`.
fn finish_job(
    conn: &mut SqliteConnection,
    job_id: i64,
    status: SyncJobStatus,
    error_message: Option<String>,
) -> std::result::Result<SyncJob, StorageError> {
    let updated = diesel::update(
        sync_jobs::table
            .find(job_id)
            .filter(sync_jobs::status.eq_any(status_strings(&status.sources()))),
    )
    .set((
        sync_jobs::status.eq(status.as_str()),
        sync_jobs::completed_at.eq(Some(chrono::Utc::now().naive_utc())),
        sync_jobs::error_message.eq(error_message),
    ))
    .execute(conn)?;

    if updated == 0 {
        return Err(rejected_transition(conn, job_id, status));
    }
    load_job(conn, job_id)
}

#[async_trait]
impl SyncJobRepositoryTrait for SyncJobRepository {
    async fn claim_wallet(&self, wallet_id: i64) -> Result<Option<SyncJob>> {
        self.writer
            .exec(move |conn| {
                let claimed = diesel::update(
                    wallets::table
                        .find(wallet_id)
                        .filter(wallets::sync_status.ne(WalletSyncStatus::Syncing.as_str())),
                )
                .set(wallets::sync_status.eq(WalletSyncStatus::Syncing.as_str()))
                .execute(conn)?;

                if claimed == 0 {
                    let exists = wallets::table
                        .find(wallet_id)
                        .count()
                        .get_result::<i64>(conn)?
                        > 0;
                    if !exists {
                        return Err(
                            Error::NotFound(format!("Wallet not found: id {}", wallet_id)).into(),
                        );
                    }
                    debug!("Wallet {} is already syncing", wallet_id);
                    return Ok(None);
                }

                let row = diesel::insert_into(sync_jobs::table)
                    .values(NewSyncJobDB::queued(wallet_id))
                    .returning(SyncJobDB::as_returning())
                    .get_result::<SyncJobDB>(conn)?;
                Ok(Some(SyncJob::try_from(row)?))
            })
            .await
    }

    async fn mark_running(&self, job_id: i64) -> Result<SyncJob> {
        self.writer
            .exec(move |conn| {
                let target = SyncJobStatus::Running;
                let updated = diesel::update(
                    sync_jobs::table
                        .find(job_id)
                        .filter(sync_jobs::status.eq_any(status_strings(&target.sources()))),
                )
                .set((
                    sync_jobs::status.eq(target.as_str()),
                    sync_jobs::started_at.eq(Some(chrono::Utc::now().naive_utc())),
                ))
                .execute(conn)?;

                if updated == 0 {
                    return Err(rejected_transition(conn, job_id, target));
                }
                load_job(conn, job_id)
            })
            .await
    }

    async fn finish(
        &self,
        job_id: i64,
        status: SyncJobStatus,
        error_message: Option<String>,
    ) -> Result<SyncJob> {
        if !status.is_terminal() {
            return Err(Error::InvalidTransition {
                entity: "sync job",
                from: "unfinished".to_string(),
                to: status.to_string(),
            });
        }

        self.writer
            .exec(move |conn| finish_job(conn, job_id, status, error_message))
            .await
    }

    async fn complete_run(
        &self,
        wallet_id: i64,
        job_id: Option<i64>,
        balance: Decimal,
        synced_at: NaiveDateTime,
    ) -> Result<()> {
        self.writer
            .exec(move |conn| {
                write_balance(conn, wallet_id, balance, Some(synced_at))?;
                transition_wallet(conn, wallet_id, WalletSyncStatus::Synced)?;
                if let Some(job_id) = job_id {
                    finish_job(conn, job_id, SyncJobStatus::Completed, None)?;
                }
                Ok(())
            })
            .await
    }

    async fn fail_run(&self, wallet_id: i64, job_id: Option<i64>, message: &str) -> Result<()> {
        let message = message.to_string();
        self.writer
            .exec(move |conn| {
                transition_wallet(conn, wallet_id, WalletSyncStatus::Error)?;
                if let Some(job_id) = job_id {
                    finish_job(conn, job_id, SyncJobStatus::Failed, Some(message))?;
                }
                Ok(())
            })
            .await
    }

    fn get_by_id(&self, job_id: i64) -> Result<Option<SyncJob>> {
        let mut conn = get_connection(&self.pool)?;
        sync_jobs::table
            .find(job_id)
            .select(SyncJobDB::as_select())
            .first::<SyncJobDB>(&mut conn)
            .optional()
            .into_core()?
            .map(SyncJob::try_from)
            .transpose()
            .map_err(Error::from)
    }

    fn list_for_wallet(&self, wallet_id: i64, limit: i64) -> Result<Vec<SyncJob>> {
        let mut conn = get_connection(&self.pool)?;
        sync_jobs::table
            .filter(sync_jobs::wallet_id.eq(wallet_id))
            .select(SyncJobDB::as_select())
            .order((sync_jobs::created_at.desc(), sync_jobs::id.desc()))
            .limit(limit)
            .load::<SyncJobDB>(&mut conn)
            .into_core()?
            .into_iter()
            .map(|row| SyncJob::try_from(row).map_err(Error::from))
            .collect()
    }

    async fn fail_unfinished(&self, message: &str) -> Result<usize> {
        let message = message.to_string();
        self.writer
            .exec(move |conn| {
                let unfinished = status_strings(&SyncJobStatus::Failed.sources());
                let failed = diesel::update(
                    sync_jobs::table.filter(sync_jobs::status.eq_any(unfinished)),
                )
                .set((
                    sync_jobs::status.eq(SyncJobStatus::Failed.as_str()),
                    sync_jobs::completed_at.eq(Some(chrono::Utc::now().naive_utc())),
                    sync_jobs::error_message.eq(Some(message)),
                ))
                .execute(conn)?;
                if failed > 0 {
                    info!("Marked {} unfinished sync jobs as failed", failed);
                }
                Ok(failed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{setup, TestDb};
    use crate::wallets::WalletRepository;
    use cointracker_core::wallets::{NewWallet, WalletRepositoryTrait};
    use rust_decimal_macros::dec;

    struct Fixture {
        db: TestDb,
        wallets: WalletRepository,
        jobs: SyncJobRepository,
        wallet_id: i64,
    }

    async fn fixture() -> Fixture {
        let db = setup();
        let wallets = WalletRepository::new(db.pool.clone(), db.writer.clone());
        let jobs = SyncJobRepository::new(db.pool.clone(), db.writer.clone());
        let wallet_id = wallets
            .create(NewWallet::new("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"))
            .await
            .unwrap()
            .id;
        Fixture {
            db,
            wallets,
            jobs,
            wallet_id,
        }
    }

    #[tokio::test]
    async fn test_claim_marks_wallet_syncing_and_queues_job() {
        let f = fixture().await;

        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();

        assert_eq!(job.status, SyncJobStatus::Queued);
        assert_eq!(job.wallet_id, f.wallet_id);
        assert!(job.started_at.is_none());
        assert_eq!(
            f.wallets.get_by_id(f.wallet_id).unwrap().sync_status,
            WalletSyncStatus::Syncing
        );
    }

    #[tokio::test]
    async fn test_second_claim_is_refused() {
        let f = fixture().await;
        f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();

        assert!(f.jobs.claim_wallet(f.wallet_id).await.unwrap().is_none());
        assert_eq!(f.jobs.list_for_wallet(f.wallet_id, 10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_claims_admit_one() {
        let f = fixture().await;
        let jobs = Arc::new(SyncJobRepository::new(
            f.db.pool.clone(),
            f.db.writer.clone(),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let jobs = jobs.clone();
                let wallet_id = f.wallet_id;
                tokio::spawn(async move { jobs.claim_wallet(wallet_id).await.unwrap() })
            })
            .collect();

        let mut claimed = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }

    #[tokio::test]
    async fn test_claim_unknown_wallet_is_not_found() {
        let f = fixture().await;
        assert!(f.jobs.claim_wallet(999).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_job_lifecycle() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();

        let running = f.jobs.mark_running(job.id).await.unwrap();
        assert_eq!(running.status, SyncJobStatus::Running);
        assert!(running.started_at.is_some());

        let done = f
            .jobs
            .finish(job.id, SyncJobStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(done.status, SyncJobStatus::Completed);
        assert!(done.completed_at.is_some());
        assert_eq!(f.jobs.get_by_id(job.id).unwrap(), Some(done));
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.jobs
            .finish(job.id, SyncJobStatus::Failed, Some("boom".to_string()))
            .await
            .unwrap();

        let err = f
            .jobs
            .finish(job.id, SyncJobStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert!(matches!(
            f.jobs.mark_running(job.id).await.unwrap_err(),
            Error::InvalidTransition { .. }
        ));

        let stored = f.jobs.get_by_id(job.id).unwrap().unwrap();
        assert_eq!(stored.status, SyncJobStatus::Failed);
        assert_eq!(stored.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_queued_job_cannot_complete() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();

        let err = f
            .jobs
            .finish(job.id, SyncJobStatus::Completed, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        let err = f
            .jobs
            .finish(job.id, SyncJobStatus::Running, None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_job() {
        let f = fixture().await;
        assert_eq!(f.jobs.get_by_id(42).unwrap(), None);
        assert!(f.jobs.mark_running(42).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_fail_unfinished() {
        let f = fixture().await;
        let first = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.jobs.mark_running(first.id).await.unwrap();
        f.jobs
            .finish(first.id, SyncJobStatus::Completed, None)
            .await
            .unwrap();
        f.wallets
            .update_status(f.wallet_id, WalletSyncStatus::Synced)
            .await
            .unwrap();
        let second = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.jobs.mark_running(second.id).await.unwrap();

        assert_eq!(
            f.jobs.fail_unfinished("Interrupted by server restart").await.unwrap(),
            1
        );

        let jobs = f.jobs.list_for_wallet(f.wallet_id, 10).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].id, second.id);
        assert_eq!(jobs[0].status, SyncJobStatus::Failed);
        assert_eq!(
            jobs[0].error_message.as_deref(),
            Some("Interrupted by server restart")
        );
        assert_eq!(jobs[1].status, SyncJobStatus::Completed);
        assert_eq!(f.jobs.list_for_wallet(f.wallet_id, 1).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_complete_run_settles_wallet_and_job_together() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.jobs.mark_running(job.id).await.unwrap();
        let synced_at = chrono::Utc::now().naive_utc();

        f.jobs
            .complete_run(f.wallet_id, Some(job.id), dec!(1.5), synced_at)
            .await
            .unwrap();

        let wallet = f.wallets.get_by_id(f.wallet_id).unwrap();
        assert_eq!(wallet.sync_status, WalletSyncStatus::Synced);
        assert_eq!(wallet.balance, dec!(1.5));
        assert!(wallet.last_synced.is_some());
        let job = f.jobs.get_by_id(job.id).unwrap().unwrap();
        assert_eq!(job.status, SyncJobStatus::Completed);
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_complete_run_rolls_back_when_job_is_already_final() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.jobs.mark_running(job.id).await.unwrap();
        f.jobs
            .finish(job.id, SyncJobStatus::Failed, Some("cancelled".to_string()))
            .await
            .unwrap();

        let err = f
            .jobs
            .complete_run(
                f.wallet_id,
                Some(job.id),
                dec!(2),
                chrono::Utc::now().naive_utc(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));

        // The wallet writes made before the job update must not survive.
        let wallet = f.wallets.get_by_id(f.wallet_id).unwrap();
        assert_eq!(wallet.sync_status, WalletSyncStatus::Syncing);
        assert_eq!(wallet.balance, Decimal::ZERO);
        assert!(wallet.last_synced.is_none());
    }

    #[tokio::test]
    async fn test_fail_run_marks_both_rows() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.jobs.mark_running(job.id).await.unwrap();

        f.jobs
            .fail_run(f.wallet_id, Some(job.id), "provider unavailable")
            .await
            .unwrap();

        assert_eq!(
            f.wallets.get_by_id(f.wallet_id).unwrap().sync_status,
            WalletSyncStatus::Error
        );
        let job = f.jobs.get_by_id(job.id).unwrap().unwrap();
        assert_eq!(job.status, SyncJobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("provider unavailable"));
    }

    #[tokio::test]
    async fn test_fail_run_leaves_job_alone_when_wallet_is_not_syncing() {
        let f = fixture().await;
        let job = f.jobs.claim_wallet(f.wallet_id).await.unwrap().unwrap();
        f.wallets.reset_interrupted().await.unwrap();

        let err = f
            .jobs
            .fail_run(f.wallet_id, Some(job.id), "late failure")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { .. }));
        assert_eq!(
            f.jobs.get_by_id(job.id).unwrap().unwrap().status,
            SyncJobStatus::Queued
        );
    }
}
