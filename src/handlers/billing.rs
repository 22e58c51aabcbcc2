use axum::{
    extract::{Path, State},
    response::Json,
};

use super::require_uuid;
use crate::error::ApiResult;
use crate::models::{Subscription, SubscriptionPlan};
use crate::AppState;

/// GET /api/plans
pub async fn list_plans(State(state): State<AppState>) -> ApiResult<Json<Vec<SubscriptionPlan>>> {
    Ok(Json(state.store.list_plans().await?))
}

/// GET /api/users/:user_id/subscriptions
pub async fn list_subscriptions(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Subscription>>> {
    let user_id = require_uuid(&user_id, "user_id")?;
    Ok(Json(state.store.list_subscriptions(user_id).await?))
}
