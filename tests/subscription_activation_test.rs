// Subscription Activator tests:
// 1. Unknown plan slugs are a silent no-op
// 2. Trial window: 14 days, then one calendar month for the period end
// 3. Trial credits land in the wallet as a SUBSCRIPTION entry
// 4. A user without a wallet still gets the subscription
// 5. The trial sweep only touches trials that have ended

use chrono::{Duration, TimeZone, Utc};

use credit_ledger_api::database::LedgerStore;
use credit_ledger_api::models::{CreditTransactionType, SubscriptionId, SubscriptionStatus};
use credit_ledger_api::services::subscription_service::{
    activate_subscription, end_expired_trials, ActivationOutcome, DEFAULT_TRIAL_DAYS,
};

mod test_helpers;
use test_helpers::*;

#[tokio::test]
async fn test_unknown_plan_is_skipped_without_error() {
    let app = setup_test_app();
    let (user_id, _) = create_test_user(&app.store, "noplan@example.com").await;
    create_test_plan(&app.store, "pro", "Pro", 50).await;

    let outcome = activate_subscription(app.store.as_ref(), user_id, "nonexistent-slug", Utc::now(), DEFAULT_TRIAL_DAYS)
        .await
        .unwrap();

    assert_eq!(outcome, ActivationOutcome::SkippedNoPlan);
    assert!(outcome.subscription().is_none());
    assert!(app.store.all_subscriptions().await.is_empty());
    assert!(app.store.all_transactions().await.is_empty());
    assert_eq!(wallet_of(&app.store, user_id).await.balance, 0);
}

#[tokio::test]
async fn test_activation_starts_trial_and_grants_credits() {
    let app = setup_test_app();
    let (user_id, wallet) = create_test_user(&app.store, "trial@example.com").await;
    let plan = create_test_plan(&app.store, "pro", "Pro", 50).await;
    let now = Utc.with_ymd_and_hms(2026, 3, 10, 8, 0, 0).unwrap();

    let outcome = activate_subscription(app.store.as_ref(), user_id, "pro", now, DEFAULT_TRIAL_DAYS)
        .await
        .unwrap();

    let (subscription, receipt) = match outcome {
        ActivationOutcome::Activated {
            subscription,
            credit: Some(receipt),
        } => (subscription, receipt),
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(subscription.plan_id, plan.id);
    assert_eq!(subscription.user_id, user_id);
    assert_eq!(subscription.status, SubscriptionStatus::Trialing);
    assert_eq!(subscription.trial_ends_at, now + Duration::days(14));
    assert_eq!(subscription.current_period_end, Utc.with_ymd_and_hms(2026, 4, 10, 8, 0, 0).unwrap());

    assert_eq!(receipt.wallet_id, wallet.id);
    assert_eq!(receipt.new_balance, 50);
    let transactions = app.store.all_transactions().await;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, CreditTransactionType::Subscription);
    assert_eq!(transactions[0].description, "Trial credits from Pro plan");
}

#[tokio::test]
async fn test_period_end_clamps_at_month_end() {
    let app = setup_test_app();
    let (user_id, _) = create_test_user(&app.store, "jan31@example.com").await;
    create_test_plan(&app.store, "pro", "Pro", 50).await;
    let now = Utc.with_ymd_and_hms(2026, 1, 31, 23, 15, 0).unwrap();

    let outcome = activate_subscription(app.store.as_ref(), user_id, "pro", now, DEFAULT_TRIAL_DAYS)
        .await
        .unwrap();

    let subscription = outcome.subscription().unwrap();
    assert_eq!(subscription.current_period_end, Utc.with_ymd_and_hms(2026, 2, 28, 23, 15, 0).unwrap());
    assert_eq!(subscription.trial_ends_at, Utc.with_ymd_and_hms(2026, 2, 14, 23, 15, 0).unwrap());
}

#[tokio::test]
async fn test_missing_wallet_keeps_subscription() {
    let app = setup_test_app();
    let user = app.store.insert_user_without_wallet("orphan@example.com").await;
    create_test_plan(&app.store, "pro", "Pro", 50).await;

    let outcome = activate_subscription(app.store.as_ref(), user.id, "pro", Utc::now(), DEFAULT_TRIAL_DAYS)
        .await
        .unwrap();

    assert!(matches!(outcome, ActivationOutcome::SkippedNoWallet { .. }));
    assert_eq!(outcome.label(), "skipped_no_wallet");
    assert_eq!(app.store.all_subscriptions().await.len(), 1);
    assert!(app.store.all_transactions().await.is_empty());
}

#[tokio::test]
async fn test_custom_trial_length() {
    let app = setup_test_app();
    let (user_id, _) = create_test_user(&app.store, "short@example.com").await;
    create_test_plan(&app.store, "pro", "Pro", 50).await;
    let now = Utc::now();

    let outcome = activate_subscription(app.store.as_ref(), user_id, "pro", now, 7).await.unwrap();

    assert_eq!(outcome.subscription().unwrap().trial_ends_at, now + Duration::days(7));
}

#[tokio::test]
async fn test_trial_sweep_only_activates_ended_trials() {
    let app = setup_test_app();
    let (user_id, _) = create_test_user(&app.store, "sweep@example.com").await;
    create_test_plan(&app.store, "pro", "Pro", 0).await;
    let started = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();

    let early = activate_subscription(app.store.as_ref(), user_id, "pro", started, DEFAULT_TRIAL_DAYS)
        .await
        .unwrap();
    let late = activate_subscription(
        app.store.as_ref(),
        user_id,
        "pro",
        started + Duration::days(10),
        DEFAULT_TRIAL_DAYS,
    )
    .await
    .unwrap();

    let sweep_at = started + Duration::days(14);
    assert_eq!(end_expired_trials(app.store.as_ref(), sweep_at).await.unwrap(), 1);
    assert_eq!(end_expired_trials(app.store.as_ref(), sweep_at).await.unwrap(), 0);

    let subscriptions = app.store.list_subscriptions(user_id).await.unwrap();
    let status_of = |id: SubscriptionId| {
        subscriptions
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.status)
            .unwrap()
    };
    assert_eq!(status_of(early.subscription().unwrap().id), SubscriptionStatus::Active);
    assert_eq!(status_of(late.subscription().unwrap().id), SubscriptionStatus::Trialing);
}
