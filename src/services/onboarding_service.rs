use chrono::{DateTime, Utc};

use super::subscription_service::{self, ActivationOutcome};
use crate::database::{LedgerStore, NewNotification, ProfileUpdate};
use crate::error::ServiceError;
use crate::models::{Notification, NotificationType, UserId, UserProfile};

pub const WELCOME_TITLE: &str = "Welcome aboard!";
pub const TRIAL_STARTED_MESSAGE: &str = "Your onboarding is complete. Your trial period has started.";
pub const CHOOSE_PLAN_MESSAGE: &str =
    "Your onboarding is complete. Choose a plan to get started with AI credits.";

#[derive(Clone, Debug, Default)]
pub struct OnboardingInput {
    pub user_id: UserId,
    pub company_name: Option<String>,
    pub industry: Option<String>,
    pub selected_plan: Option<String>,
    pub selected_services: Vec<serde_json::Value>,
}

#[derive(Clone, Debug)]
pub struct OnboardingReport {
    pub profile: UserProfile,
    /// `None` when no plan was selected.
    pub activation: Option<ActivationOutcome>,
    pub notification: Notification,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Profile update, optional plan activation, welcome notification. In that order.
///
/// The first failing step aborts the call and earlier writes stay in place. Calling this
/// twice with the same plan starts two subscriptions and grants the credits twice.
pub async fn complete_onboarding(
    store: &dyn LedgerStore,
    input: OnboardingInput,
    now: DateTime<Utc>,
    trial_days: u32,
) -> Result<OnboardingReport, ServiceError> {
    let user_id = input.user_id;
    let selected_plan = non_empty(input.selected_plan);

    if !input.selected_services.is_empty() {
        tracing::debug!(%user_id, services = input.selected_services.len(), "Selected services received");
    }

    let profile = store
        .upsert_profile(
            user_id,
            ProfileUpdate {
                company_name: non_empty(input.company_name),
                industry: non_empty(input.industry),
                completed_at: Some(now),
            },
        )
        .await?;

    let activation = match selected_plan.as_deref() {
        Some(slug) => {
            let outcome = subscription_service::activate_subscription(store, user_id, slug, now, trial_days).await?;
            tracing::info!(%user_id, plan = slug, outcome = outcome.label(), "Plan activation finished");
            Some(outcome)
        }
        None => None,
    };

    let message = if selected_plan.is_some() {
        TRIAL_STARTED_MESSAGE
    } else {
        CHOOSE_PLAN_MESSAGE
    };
    let notification = store
        .create_notification(NewNotification {
            user_id,
            kind: NotificationType::System,
            title: WELCOME_TITLE.to_string(),
            message: message.to_string(),
        })
        .await?;

    tracing::info!(%user_id, "Onboarding completed");
    Ok(OnboardingReport {
        profile,
        activation,
        notification,
    })
}
