//! Background scheduler for periodic wallet reconciliation.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};

use cointracker_core::sync::SyncServiceTrait;
use cointracker_core::Error;

use crate::main_lib::AppState;

/// Initial delay before the first sweep (60 seconds to let server fully start)
const INITIAL_DELAY_SECS: u64 = 60;

/// Starts the periodic sync sweep. `None` leaves it disabled.
pub fn start_sync_scheduler(state: Arc<AppState>, every: Option<Duration>) {
    let Some(every) = every else {
        info!("Periodic wallet sync disabled");
        return;
    };

    tokio::spawn(async move {
        info!("Wallet sync scheduler started ({}s interval)", every.as_secs());

        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        // First tick is immediate
        let mut sync_interval = interval(every);
        loop {
            sync_interval.tick().await;
            run_scheduled_sync(&state).await;
        }
    });
}

/// Requests a sync for every wallet not already syncing. Returns how many
/// runs were dispatched.
pub async fn run_scheduled_sync(state: &AppState) -> usize {
    let wallets = match state.sync_service.idle_wallets() {
        Ok(wallets) => wallets,
        Err(e) => {
            warn!("Scheduled sync skipped: could not list wallets: {}", e);
            return 0;
        }
    };

    let mut dispatched = 0;
    for wallet in wallets {
        match state.sync_service.request_sync(&wallet.address).await {
            Ok(run) => {
                debug!("Scheduled sync job {} for {}", run.job.id, wallet.address);
                dispatched += 1;
            }
            Err(Error::SyncInProgress(_)) => {
                debug!("Scheduled sync skipped for {}: already syncing", wallet.address);
            }
            Err(e) => warn!("Scheduled sync for {} failed: {}", wallet.address, e),
        }
    }

    info!("Scheduled sync dispatched {} runs", dispatched);
    dispatched
}
