use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::database::NewUser;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub user_id: String,
    pub wallet_id: String,
    pub email: String,
}

/// Public registration: create the account and its empty credit wallet.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SignupResponse>)> {
    let Json(payload) = payload?;
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(ApiError::BadRequest("Email is invalid".to_string()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest("Password must be at least 8 characters".to_string()));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict("An account with this email already exists".to_string()));
    }

    let cost = state.config.bcrypt_cost;
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!("signup: hash: {:?}", e);
            ApiError::Internal("Failed to create account".to_string())
        })?;

    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());
    let (user, wallet) = state
        .store
        .create_user_with_wallet(NewUser {
            email,
            name,
            password_hash,
        })
        .await?;

    tracing::info!(user_id = %user.id, wallet_id = %wallet.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            user_id: user.id.to_string(),
            wallet_id: wallet.id.to_string(),
            email: user.email,
        }),
    ))
}
