use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use super::require_uuid;
use crate::error::{ApiError, ApiResult};
use crate::models::Notification;
use crate::AppState;

pub async fn list_notifications(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<Notification>>> {
    let user_id = require_uuid(&user_id, "user_id")?;
    Ok(Json(state.store.list_notifications(user_id).await?))
}

pub async fn mark_notification_read(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> ApiResult<StatusCode> {
    let id = require_uuid(&id, "notification id")?;
    if state.store.mark_notification_read(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Notification not found".to_string()))
    }
}
