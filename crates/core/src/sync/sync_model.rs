//! Sync job domain models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::ValidationError, Error, Result};

/// Status of a sync job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncJobStatus {
    /// Created, waiting for the engine to pick it up
    #[default]
    Queued,
    /// Engine is working on it
    Running,
    /// Finished; the wallet is `synced`
    Completed,
    /// Finished with an error; the wallet is `error`
    Failed,
}

impl SyncJobStatus {
    pub const ALL: [SyncJobStatus; 4] = [
        Self::Queued,
        Self::Running,
        Self::Completed,
        Self::Failed,
    ];

    /// Statuses from which `self` may be entered.
    pub fn sources(self) -> Vec<SyncJobStatus> {
        Self::ALL
            .into_iter()
            .filter(|from| from.can_transition_to(self))
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn can_transition_to(&self, next: SyncJobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl fmt::Display for SyncJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncJobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown sync job status '{}'",
                other
            )))),
        }
    }
}

/// One requested sync of one wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncJob {
    pub id: i64,
    pub wallet_id: i64,
    pub status: SyncJobStatus,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Counters collected during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunSummary {
    /// Transaction count reported by the provider summary
    pub provider_transaction_count: u64,
    /// Records the run set out to fetch (count bounded by the safety cap)
    pub target: usize,
    /// True when the provider count exceeded the safety cap
    pub truncated: bool,
    pub pages_fetched: usize,
    pub fetched: usize,
    /// New rows written to the ledger
    pub stored: usize,
    pub duplicates: usize,
    pub skipped_zero_change: usize,
    pub malformed: usize,
    /// Ledger balance after the run, when it got that far
    pub balance: Option<Decimal>,
}

/// What happened to one run. Returned to whoever awaited the task; the
/// durable record is the wallet and job rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunReport {
    pub address: String,
    pub wallet_id: Option<i64>,
    pub job_id: Option<i64>,
    pub status: SyncJobStatus,
    pub error: Option<String>,
    pub summary: SyncRunSummary,
}

impl SyncRunReport {
    pub fn is_success(&self) -> bool {
        self.status == SyncJobStatus::Completed
    }
}

/// Result of cleaning up runs a previous process left behind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecovery {
    pub wallets_reset: usize,
    pub jobs_failed: usize,
}
