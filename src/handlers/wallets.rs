use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    response::Json,
};
use serde::Deserialize;

use super::require_uuid;
use crate::error::{ApiError, ApiResult};
use crate::models::{CreditReceipt, CreditTransaction, Wallet};
use crate::services::wallet_service;
use crate::AppState;

const DEFAULT_TRANSACTION_LIMIT: i64 = 50;
const MAX_TRANSACTION_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct TransactionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SpendRequest {
    pub amount: i64,
    pub description: Option<String>,
}

/// GET /api/users/:user_id/wallet
pub async fn get_wallet(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Wallet>> {
    let user_id = require_uuid(&user_id, "user_id")?;
    let wallet = state
        .store
        .find_wallet(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;
    Ok(Json(wallet))
}

/// GET /api/users/:user_id/wallet/transactions, newest first.
pub async fn list_wallet_transactions(
    Path(user_id): Path<String>,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CreditTransaction>>> {
    let Query(query) = query?;
    let user_id = require_uuid(&user_id, "user_id")?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_TRANSACTION_LIMIT)
        .clamp(1, MAX_TRANSACTION_LIMIT);

    let wallet = state
        .store
        .find_wallet(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;
    let transactions = state.store.list_transactions(wallet.id, limit).await?;
    Ok(Json(transactions))
}

/// POST /api/users/:user_id/wallet/spend
pub async fn spend_credits(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<SpendRequest>, JsonRejection>,
) -> ApiResult<Json<CreditReceipt>> {
    let Json(payload) = payload?;
    let user_id = require_uuid(&user_id, "user_id")?;
    let description = payload
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| "AI usage".to_string());

    let receipt = wallet_service::spend_credits(&*state.store, user_id, payload.amount, &description).await?;
    Ok(Json(receipt))
}
