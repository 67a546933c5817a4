//! Runs the sync service end to end against a temporary SQLite database.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use cointracker_chain_data::{
    AddressSummary, ChainDataError, ChainDataProvider, HistoryConfig, HistoryFetcher,
    RawTransaction,
};
use cointracker_core::sync::{
    ReconciliationEngine, SyncConfig, SyncJobStatus, SyncService, SyncServiceTrait,
};
use cointracker_core::transactions::{TransactionQuery, TransactionType};
use cointracker_core::wallets::{NewWallet, WalletService, WalletServiceTrait, WalletSyncStatus};
use cointracker_core::Error;
use cointracker_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, SyncJobRepository, TransactionRepository,
    WalletRepository,
};
use rust_decimal_macros::dec;
use tempfile::TempDir;

const ADDRESS: &str = "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2";

#[derive(Default)]
struct StubState {
    history: Vec<RawTransaction>,
    fail_from_offset: Option<usize>,
}

#[derive(Clone, Default)]
struct StubProvider {
    state: Arc<Mutex<StubState>>,
}

impl StubProvider {
    fn set_history(&self, history: Vec<RawTransaction>) {
        self.state.lock().unwrap().history = history;
    }

    fn fail_from_offset(&self, offset: Option<usize>) {
        self.state.lock().unwrap().fail_from_offset = offset;
    }
}

#[async_trait]
impl ChainDataProvider for StubProvider {
    fn id(&self) -> &'static str {
        "STUB"
    }

    async fn get_address_summary(&self, address: &str) -> Result<AddressSummary, ChainDataError> {
        let state = self.state.lock().unwrap();
        Ok(AddressSummary {
            address: address.to_string(),
            balance_sats: state.history.iter().map(|tx| tx.balance_change).sum(),
            transaction_count: state.history.len() as u64,
        })
    }

    async fn get_address_transactions(
        &self,
        _address: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<RawTransaction>, ChainDataError> {
        let state = self.state.lock().unwrap();
        if state.fail_from_offset.is_some_and(|from| offset >= from) {
            return Err(ChainDataError::RetriesExhausted {
                attempts: 3,
                last_error: "Server error: HTTP 503".to_string(),
            });
        }
        Ok(state.history.iter().skip(offset).take(limit).cloned().collect())
    }
}

fn raw(hash: &str, balance_change: i64) -> RawTransaction {
    RawTransaction {
        hash: Some(hash.to_string()),
        block_id: Some(830_000),
        time: Some("2024-02-20 09:15:00".to_string()),
        balance_change,
    }
}

struct Harness {
    provider: StubProvider,
    wallets: WalletService,
    sync: SyncService,
    _dir: TempDir,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let db_path = init(dir.path().join("sync.db").to_str().unwrap()).unwrap();
    let pool = create_pool(&db_path).unwrap();
    run_migrations(&pool).unwrap();
    let writer = spawn_writer((*pool).clone());

    let wallet_repo = Arc::new(WalletRepository::new(pool.clone(), writer.clone()));
    let tx_repo = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let job_repo = Arc::new(SyncJobRepository::new(pool.clone(), writer.clone()));

    let provider = StubProvider::default();
    let fetcher = HistoryFetcher::new(HistoryConfig {
        page_size: 2,
        page_delay: Duration::ZERO,
        ..HistoryConfig::default()
    });
    let engine = Arc::new(ReconciliationEngine::new(
        Arc::new(provider.clone()),
        fetcher,
        wallet_repo.clone(),
        tx_repo.clone(),
        job_repo.clone(),
        SyncConfig::default(),
    ));

    Harness {
        provider,
        wallets: WalletService::new(wallet_repo.clone(), tx_repo),
        sync: SyncService::new(engine, wallet_repo, job_repo),
        _dir: dir,
    }
}

#[tokio::test]
async fn sync_persists_history_and_balance() {
    let h = harness();
    h.wallets
        .create_wallet(NewWallet::new(ADDRESS))
        .await
        .unwrap();
    h.provider.set_history(vec![
        raw("a", 150_000_000),
        raw("b", -50_000_000),
        raw("c", 0),
    ]);

    let dispatched = h.sync.request_sync(ADDRESS).await.unwrap();
    let report = dispatched.handle.await.unwrap();

    assert!(report.is_success(), "{:?}", report.error);
    assert_eq!(report.summary.stored, 2);
    assert_eq!(report.summary.skipped_zero_change, 1);

    let balance = h.wallets.get_balance(ADDRESS).unwrap();
    assert_eq!(balance.balance, dec!(1.0));
    assert_eq!(balance.sync_status, WalletSyncStatus::Synced);
    assert!(balance.last_synced.is_some());

    let page = h
        .wallets
        .get_transactions(ADDRESS, TransactionQuery::default())
        .unwrap();
    assert_eq!(page.pagination.total, 2);
    let sent = page
        .transactions
        .iter()
        .find(|tx| tx.txid == "b")
        .unwrap();
    assert_eq!(sent.tx_type, TransactionType::Sent);
    assert_eq!(sent.value, dec!(0.5));

    let job = h.sync.get_job(dispatched.job.id).unwrap();
    assert_eq!(job.status, SyncJobStatus::Completed);
    assert!(job.completed_at.is_some());
}

#[tokio::test]
async fn resync_is_idempotent() {
    let h = harness();
    h.wallets
        .create_wallet(NewWallet::new(ADDRESS))
        .await
        .unwrap();
    h.provider
        .set_history(vec![raw("a", 10_000), raw("b", 20_000), raw("c", -5_000)]);

    let first = h.sync.request_sync(ADDRESS).await.unwrap();
    first.handle.await.unwrap();
    let second = h.sync.request_sync(ADDRESS).await.unwrap();
    let report = second.handle.await.unwrap();

    assert!(report.is_success());
    assert_eq!(report.summary.stored, 0);
    assert_eq!(report.summary.duplicates, 3);
    assert_eq!(h.wallets.get_wallet(ADDRESS).unwrap().transaction_count, 3);
    assert_eq!(h.wallets.get_balance(ADDRESS).unwrap().balance, dec!(0.00025));
    assert_eq!(h.sync.recent_jobs(ADDRESS, None).unwrap().len(), 2);
}

#[tokio::test]
async fn partial_failure_keeps_fetched_records() {
    let h = harness();
    h.wallets
        .create_wallet(NewWallet::new(ADDRESS))
        .await
        .unwrap();
    h.provider.set_history(vec![
        raw("a", 100),
        raw("b", 200),
        raw("c", 300),
        raw("d", 400),
        raw("e", 500),
    ]);
    h.provider.fail_from_offset(Some(4));

    let dispatched = h.sync.request_sync(ADDRESS).await.unwrap();
    let report = dispatched.handle.await.unwrap();

    assert_eq!(report.status, SyncJobStatus::Failed);
    let wallet = h.wallets.get_wallet(ADDRESS).unwrap();
    assert_eq!(wallet.transaction_count, 4);
    assert_eq!(wallet.wallet.balance, dec!(0.00001));
    assert_eq!(wallet.wallet.sync_status, WalletSyncStatus::Error);
    assert!(wallet.wallet.last_synced.is_none());

    let job = h.sync.get_job(dispatched.job.id).unwrap();
    assert_eq!(job.status, SyncJobStatus::Failed);
    assert!(job
        .error_message
        .unwrap()
        .starts_with("Partial sync (4 of 5 transactions fetched)"));

    // The retry picks up the rest without duplicating what is stored.
    h.provider.fail_from_offset(None);
    let retry = h.sync.request_sync(ADDRESS).await.unwrap();
    let report = retry.handle.await.unwrap();
    assert!(report.is_success());
    assert_eq!(report.summary.stored, 1);
    assert_eq!(h.wallets.get_balance(ADDRESS).unwrap().balance, dec!(0.000015));
}

#[tokio::test]
async fn second_request_while_syncing_conflicts() {
    let h = harness();
    h.wallets
        .create_wallet(NewWallet::new(ADDRESS))
        .await
        .unwrap();
    h.provider.set_history(vec![raw("a", 1_000)]);

    let first = h.sync.request_sync(ADDRESS).await.unwrap();
    let second = h.sync.request_sync(ADDRESS).await;
    first.handle.await.unwrap();

    assert!(matches!(second.err(), Some(Error::SyncInProgress(_))));
}

#[tokio::test]
async fn recovery_fails_interrupted_runs() {
    let h = harness();
    h.wallets
        .create_wallet(NewWallet::new(ADDRESS))
        .await
        .unwrap();
    h.provider.set_history(vec![raw("a", 1_000)]);
    let dispatched = h.sync.request_sync(ADDRESS).await.unwrap();
    // Simulate a crash before the run gets to start.
    dispatched.handle.abort();
    let _ = dispatched.handle.await;

    let recovery = h.sync.recover_interrupted().await.unwrap();

    assert_eq!(recovery.wallets_reset, 1);
    assert_eq!(recovery.jobs_failed, 1);
    let wallet = h.wallets.get_wallet(ADDRESS).unwrap();
    assert_eq!(wallet.wallet.sync_status, WalletSyncStatus::Error);
    let job = h.sync.get_job(dispatched.job.id).unwrap();
    assert_eq!(job.status, SyncJobStatus::Failed);
    assert_eq!(
        job.error_message.as_deref(),
        Some("Interrupted by server restart")
    );
}
