use std::sync::Arc;

use crate::config::Config;
use cointracker_chain_data::{
    BlockchairProvider, ChainDataProvider, HistoryConfig, HistoryFetcher, RetryConfig,
};
use cointracker_core::{
    sync::{ReconciliationEngine, SyncConfig, SyncService, SyncServiceTrait},
    wallets::{WalletService, WalletServiceTrait},
};
use cointracker_storage_sqlite::{
    db::{self, write_actor},
    SyncJobRepository, TransactionRepository, WalletRepository,
};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub struct AppState {
    pub wallet_service: Arc<dyn WalletServiceTrait + Send + Sync>,
    pub sync_service: Arc<SyncService>,
}

pub fn init_tracing() {
    let log_format = std::env::var("CT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

/// Builds the application state against the Blockchair API.
pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let provider: Arc<dyn ChainDataProvider> = Arc::new(BlockchairProvider::new(
        config.provider_base_url.clone(),
        RetryConfig::default(),
    )?);
    build_state_with_provider(config, provider).await
}

pub async fn build_state_with_provider(
    config: &Config,
    provider: Arc<dyn ChainDataProvider>,
) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = write_actor::spawn_writer((*pool).clone());

    let wallet_repository = Arc::new(WalletRepository::new(pool.clone(), writer.clone()));
    let transaction_repository = Arc::new(TransactionRepository::new(pool.clone(), writer.clone()));
    let job_repository = Arc::new(SyncJobRepository::new(pool.clone(), writer.clone()));

    tracing::info!("Chain data provider: {}", provider.id());
    let engine = Arc::new(ReconciliationEngine::new(
        provider,
        HistoryFetcher::new(HistoryConfig::default()),
        wallet_repository.clone(),
        transaction_repository.clone(),
        job_repository.clone(),
        SyncConfig::default(),
    ));

    let wallet_service = Arc::new(WalletService::new(
        wallet_repository.clone(),
        transaction_repository,
    ));
    let sync_service = Arc::new(SyncService::new(engine, wallet_repository, job_repository));

    let recovery = sync_service.recover_interrupted().await?;
    if recovery.wallets_reset > 0 || recovery.jobs_failed > 0 {
        tracing::warn!(
            "Startup recovery: {} wallets reset, {} jobs failed",
            recovery.wallets_reset,
            recovery.jobs_failed
        );
    }

    Ok(Arc::new(AppState {
        wallet_service,
        sync_service,
    }))
}
