use axum::{body::Bytes, extract::State, response::Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::require_uuid;
use crate::error::{ApiError, ApiResult};
use crate::services::onboarding_service::{self, OnboardingInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOnboardingRequest {
    pub user_id: Option<String>,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    /// Plan slug.
    pub selected_plan: Option<String>,
    pub selected_services: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct CompleteOnboardingResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/onboarding/complete
///
/// The body is read as JSON whatever its `Content-Type`. A body that does not parse is
/// reported as a 500, same as any other failure after the request was accepted.
pub async fn complete_onboarding(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<CompleteOnboardingResponse>> {
    let payload: CompleteOnboardingRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::error!("Error reading onboarding body: {}", e);
        ApiError::Internal(e.to_string())
    })?;

    let user_id = match payload.user_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => require_uuid(raw, "userId")?,
        _ => return Err(ApiError::BadRequest("User ID is required".to_string())),
    };

    let input = OnboardingInput {
        user_id,
        company_name: payload.company_name,
        industry: payload.industry,
        selected_plan: payload.selected_plan,
        selected_services: payload.selected_services.unwrap_or_default(),
    };

    onboarding_service::complete_onboarding(&*state.store, input, Utc::now(), state.config.trial_days)
        .await
        .map_err(|e| {
            tracing::error!(%user_id, "Error completing onboarding: {}", e);
            ApiError::Internal(e.to_string())
        })?;

    Ok(Json(CompleteOnboardingResponse {
        success: true,
        message: "Onboarding completed successfully".to_string(),
    }))
}
