use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use cointracker_core::sync::{SyncJob, SyncJobStatus, SyncServiceTrait};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncAccepted {
    job_id: i64,
    address: String,
    status: SyncJobStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LiveBalance {
    address: String,
    balance: Decimal,
}

#[derive(Deserialize)]
struct JobsQuery {
    limit: Option<i64>,
}

/// Queues a sync and returns immediately; poll `/jobs/{id}` for the outcome.
async fn request_sync(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<SyncAccepted>)> {
    let dispatched = state.sync_service.request_sync(&address).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SyncAccepted {
            job_id: dispatched.job.id,
            address,
            status: dispatched.job.status,
        }),
    ))
}

async fn list_jobs(
    Path(address): Path<String>,
    query: Result<Query<JobsQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<SyncJob>>> {
    let Query(query) = query?;
    Ok(Json(state.sync_service.recent_jobs(&address, query.limit)?))
}

async fn get_job(
    id: Result<Path<i64>, PathRejection>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<SyncJob>> {
    let Path(id) = id?;
    Ok(Json(state.sync_service.get_job(id)?))
}

/// Provider-side balance for a registered wallet, without touching the ledger.
async fn live_balance(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<LiveBalance>> {
    let wallet = state.wallet_service.get_wallet(&address)?;
    let balance = state.sync_service.quick_balance(&wallet.wallet.address).await;
    Ok(Json(LiveBalance { address, balance }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallets/{address}/sync", post(request_sync))
        .route("/wallets/{address}/jobs", get(list_jobs))
        .route("/wallets/{address}/balance/live", get(live_balance))
        .route("/jobs/{id}", get(get_job))
}
