//! Database model for sync jobs.

use std::str::FromStr;

use chrono::NaiveDateTime;
use diesel::prelude::*;

use cointracker_core::sync::{SyncJob, SyncJobStatus};

use crate::errors::StorageError;

#[derive(Queryable, Identifiable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::sync_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncJobDB {
    pub id: i64,
    pub wallet_id: i64,
    pub status: String,
    pub started_at: Option<NaiveDateTime>,
    pub completed_at: Option<NaiveDateTime>,
    pub error_message: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sync_jobs)]
pub(crate) struct NewSyncJobDB {
    pub wallet_id: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
}

impl NewSyncJobDB {
    pub fn queued(wallet_id: i64) -> Self {
        Self {
            wallet_id,
            status: SyncJobStatus::Queued.as_str().to_string(),
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

impl TryFrom<SyncJobDB> for SyncJob {
    type Error = StorageError;

    fn try_from(db: SyncJobDB) -> Result<Self, Self::Error> {
        Ok(Self {
            status: SyncJobStatus::from_str(&db.status)?,
            id: db.id,
            wallet_id: db.wallet_id,
            started_at: db.started_at,
            completed_at: db.completed_at,
            error_message: db.error_message,
            created_at: db.created_at,
        })
    }
}
