use chrono::{DateTime, Utc};

use super::wallet_service::{self, CreditOutcome};
use crate::database::{LedgerStore, NewSubscription};
use crate::error::ServiceError;
use crate::models::{CreditReceipt, CreditTransactionType, Subscription, SubscriptionStatus, UserId};
use crate::utils::date::{add_calendar_months, add_days};

pub const DEFAULT_TRIAL_DAYS: u32 = 14;

/// Which path an activation attempt took. Only `SkippedNoPlan` leaves no rows behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// `credit` is `None` when the plan grants no credits.
    Activated {
        subscription: Subscription,
        credit: Option<CreditReceipt>,
    },
    SkippedNoPlan,
    /// Subscription created, but the user had no wallet to receive the trial credits.
    SkippedNoWallet { subscription: Subscription },
}

impl ActivationOutcome {
    pub fn subscription(&self) -> Option<&Subscription> {
        match self {
            ActivationOutcome::Activated { subscription, .. }
            | ActivationOutcome::SkippedNoWallet { subscription } => Some(subscription),
            ActivationOutcome::SkippedNoPlan => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivationOutcome::Activated { .. } => "activated",
            ActivationOutcome::SkippedNoPlan => "skipped_no_plan",
            ActivationOutcome::SkippedNoWallet { .. } => "skipped_no_wallet",
        }
    }
}

/// Trial end and first period end for an activation at `now`.
pub fn trial_window(now: DateTime<Utc>, trial_days: u32) -> (DateTime<Utc>, DateTime<Utc>) {
    (add_days(now, trial_days), add_calendar_months(now, 1))
}

/// Start a trial on the plan with `plan_slug` and grant its included credits.
///
/// An unknown slug is not an error. When the credit step fails the subscription stays
/// created and the error is returned.
pub async fn activate_subscription(
    store: &dyn LedgerStore,
    user_id: UserId,
    plan_slug: &str,
    now: DateTime<Utc>,
    trial_days: u32,
) -> Result<ActivationOutcome, ServiceError> {
    let Some(plan) = store.find_plan_by_slug(plan_slug).await? else {
        tracing::warn!(%user_id, plan_slug, "Plan not found; skipping subscription activation");
        return Ok(ActivationOutcome::SkippedNoPlan);
    };

    let (trial_ends_at, current_period_end) = trial_window(now, trial_days);
    let subscription = store
        .create_subscription(NewSubscription {
            user_id,
            plan_id: plan.id,
            status: SubscriptionStatus::Trialing,
            trial_ends_at,
            current_period_end,
        })
        .await?;
    tracing::info!(
        %user_id,
        plan = %plan.slug,
        subscription_id = %subscription.id,
        %trial_ends_at,
        "Subscription trial started"
    );

    if plan.included_ai_credits <= 0 {
        return Ok(ActivationOutcome::Activated {
            subscription,
            credit: None,
        });
    }

    let description = format!("Trial credits from {} plan", plan.name);
    let outcome = wallet_service::credit_wallet(
        store,
        user_id,
        plan.included_ai_credits,
        CreditTransactionType::Subscription,
        &description,
    )
    .await?;

    Ok(match outcome {
        CreditOutcome::Credited(receipt) => ActivationOutcome::Activated {
            subscription,
            credit: Some(receipt),
        },
        CreditOutcome::NoWallet => ActivationOutcome::SkippedNoWallet { subscription },
    })
}

/// Move every trial that ended by `now` to ACTIVE. Returns how many changed.
pub async fn end_expired_trials(store: &dyn LedgerStore, now: DateTime<Utc>) -> Result<u64, ServiceError> {
    let ended = store.end_expired_trials(now).await?;
    if ended > 0 {
        tracing::info!(ended, "Expired trials moved to active");
    }
    Ok(ended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{DbError, MockLedgerStore};
    use crate::models::SubscriptionPlan;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn plan(credits: i64) -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            slug: "pro".to_string(),
            name: "Pro".to_string(),
            description: None,
            price_cents: 2900,
            included_ai_credits: credits,
            is_active: true,
        }
    }

    fn echo_subscription(new: NewSubscription) -> Subscription {
        let now = Utc::now();
        Subscription {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            plan_id: new.plan_id,
            status: new.status,
            trial_ends_at: new.trial_ends_at,
            current_period_end: new.current_period_end,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn trial_window_uses_days_then_calendar_month() {
        let now = Utc.with_ymd_and_hms(2026, 1, 31, 12, 0, 0).unwrap();
        let (trial_ends_at, period_end) = trial_window(now, DEFAULT_TRIAL_DAYS);
        assert_eq!(trial_ends_at, Utc.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).unwrap());
        assert_eq!(period_end, Utc.with_ymd_and_hms(2026, 2, 28, 12, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn credit_failure_keeps_subscription_and_propagates() {
        let mut store = MockLedgerStore::new();
        let pro = plan(50);
        store
            .expect_find_plan_by_slug()
            .returning(move |_| Ok(Some(pro.clone())));
        store
            .expect_create_subscription()
            .times(1)
            .returning(|new| Ok(echo_subscription(new)));
        store
            .expect_credit_wallet()
            .times(1)
            .returning(|_, _, _, _| Err(DbError::Sqlx(sqlx::Error::PoolTimedOut)));

        let err = activate_subscription(&store, Uuid::new_v4(), "pro", Utc::now(), DEFAULT_TRIAL_DAYS)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Db(DbError::Sqlx(sqlx::Error::PoolTimedOut))));
    }

    #[tokio::test]
    async fn zero_credit_plan_never_touches_the_wallet() {
        let mut store = MockLedgerStore::new();
        let free = plan(0);
        store
            .expect_find_plan_by_slug()
            .returning(move |_| Ok(Some(free.clone())));
        store
            .expect_create_subscription()
            .returning(|new| Ok(echo_subscription(new)));
        store.expect_credit_wallet().never();

        let outcome = activate_subscription(&store, Uuid::new_v4(), "pro", Utc::now(), DEFAULT_TRIAL_DAYS)
            .await
            .unwrap();
        assert!(matches!(outcome, ActivationOutcome::Activated { credit: None, .. }));
        assert_eq!(outcome.label(), "activated");
    }

    #[tokio::test]
    async fn credit_description_names_the_plan() {
        let mut store = MockLedgerStore::new();
        let pro = plan(50);
        store
            .expect_find_plan_by_slug()
            .returning(move |_| Ok(Some(pro.clone())));
        store
            .expect_create_subscription()
            .returning(|new| Ok(echo_subscription(new)));
        store
            .expect_credit_wallet()
            .withf(|_, amount, kind, description| {
                *amount == 50
                    && *kind == CreditTransactionType::Subscription
                    && description == "Trial credits from Pro plan"
            })
            .returning(|_, amount, _, _| {
                Ok(Some(CreditReceipt {
                    wallet_id: Uuid::new_v4(),
                    transaction_id: Uuid::new_v4(),
                    new_balance: amount,
                }))
            });

        let outcome = activate_subscription(&store, Uuid::new_v4(), "pro", Utc::now(), DEFAULT_TRIAL_DAYS)
            .await
            .unwrap();
        match outcome {
            ActivationOutcome::Activated { credit: Some(receipt), .. } => assert_eq!(receipt.new_balance, 50),
            other => panic!("unexpected outcome {:?}", other),
        }
    }
}
