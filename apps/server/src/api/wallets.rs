use std::sync::Arc;

use crate::{error::ApiResult, main_lib::AppState};
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use cointracker_core::{
    transactions::{TransactionPage, TransactionQuery},
    wallets::{NewWallet, Wallet, WalletBalance, WalletSummary},
};

async fn create_wallet(
    State(state): State<Arc<AppState>>,
    Json(new_wallet): Json<NewWallet>,
) -> ApiResult<(StatusCode, Json<Wallet>)> {
    let wallet = state.wallet_service.create_wallet(new_wallet).await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

async fn list_wallets(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<WalletSummary>>> {
    Ok(Json(state.wallet_service.list_wallets()?))
}

async fn get_wallet(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<WalletSummary>> {
    Ok(Json(state.wallet_service.get_wallet(&address)?))
}

async fn delete_wallet(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.wallet_service.delete_wallet(&address).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_transactions(
    Path(address): Path<String>,
    query: Result<Query<TransactionQuery>, QueryRejection>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<TransactionPage>> {
    let Query(query) = query?;
    Ok(Json(state.wallet_service.get_transactions(&address, query)?))
}

async fn get_balance(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<WalletBalance>> {
    Ok(Json(state.wallet_service.get_balance(&address)?))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/wallets", get(list_wallets).post(create_wallet))
        .route("/wallets/{address}", get(get_wallet).delete(delete_wallet))
        .route("/wallets/{address}/transactions", get(get_transactions))
        .route("/wallets/{address}/balance", get(get_balance))
}
