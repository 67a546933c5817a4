//! Sync domain models and services.

mod reconciliation;
mod sync_model;
mod sync_service;
mod sync_traits;

pub use reconciliation::{ReconciliationEngine, SyncConfig};
pub use sync_model::{SyncJob, SyncJobStatus, SyncRecovery, SyncRunReport, SyncRunSummary};
pub use sync_service::{DispatchedSync, SyncService};
pub use sync_traits::{SyncJobRepositoryTrait, SyncServiceTrait};
