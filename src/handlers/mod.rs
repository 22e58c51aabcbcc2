pub mod auth;
pub mod billing;
pub mod notifications;
pub mod onboarding;
pub mod wallets;

pub use auth::{signup, SignupRequest, SignupResponse};
pub use billing::{list_plans, list_subscriptions};
pub use notifications::{list_notifications, mark_notification_read};
pub use onboarding::{complete_onboarding, CompleteOnboardingRequest, CompleteOnboardingResponse};
pub use wallets::{get_wallet, list_wallet_transactions, spend_credits, SpendRequest, TransactionsQuery};

use crate::error::ApiError;
use crate::models::ids::parse_uuid;
use uuid::Uuid;

/// Parse a path/body id, turning failure into a 400.
pub(crate) fn require_uuid(raw: &str, name: &str) -> Result<Uuid, ApiError> {
    parse_uuid(raw, name).map_err(ApiError::BadRequest)
}
