// Postgres-backed ledger store tests. They need a scratch database:
//   TEST_DATABASE_URL=postgresql://... cargo test --test pg_ledger_store_test -- --ignored

use chrono::Utc;
use std::sync::Arc;

use credit_ledger_api::database::{self, DebitResult, LedgerStore, NewPlan, NewUser, PgLedgerStore};
use credit_ledger_api::models::{CreditTransactionType, SubscriptionStatus};
use credit_ledger_api::services::onboarding_service::{self, OnboardingInput};
use credit_ledger_api::services::wallet_service::{self, CreditOutcome};

async fn setup_store() -> Arc<PgLedgerStore> {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = database::create_pool(&url, 10).await.expect("Failed to connect");
    database::run_migrations(&pool).await.expect("Failed to migrate");
    Arc::new(PgLedgerStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

async fn signup(store: &PgLedgerStore) -> uuid::Uuid {
    let (user, _) = store
        .create_user_with_wallet(NewUser {
            email: format!("{}@example.com", unique("pg")),
            name: None,
            password_hash: "hashed_password".to_string(),
        })
        .await
        .expect("Failed to create user");
    user.id
}

#[tokio::test]
#[ignore]
async fn test_concurrent_credits_are_not_lost() {
    let store = setup_store().await;
    let user_id = signup(&store).await;

    let mut handles = Vec::new();
    for _ in 0..25 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            wallet_service::credit_wallet(&*store, user_id, 4, CreditTransactionType::Bonus, "Race").await
        }));
    }
    for handle in handles {
        assert!(matches!(handle.await.unwrap().unwrap(), CreditOutcome::Credited(_)));
    }

    let wallet = store.find_wallet(user_id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 100);
    assert_eq!(wallet.lifetime_added, 100);

    let transactions = store.list_transactions(wallet.id, 100).await.unwrap();
    assert_eq!(transactions.len(), 25);
    assert_eq!(transactions[0].balance_after, 100);
}

#[tokio::test]
#[ignore]
async fn test_debit_never_goes_negative() {
    let store = setup_store().await;
    let user_id = signup(&store).await;
    wallet_service::credit_wallet(&*store, user_id, 10, CreditTransactionType::Purchase, "Top-up")
        .await
        .unwrap();

    let result = store
        .debit_wallet(user_id, 11, CreditTransactionType::Usage, "Too much".to_string())
        .await
        .unwrap();
    assert!(matches!(result, DebitResult::Insufficient { balance: 10 }));

    let result = store
        .debit_wallet(user_id, 10, CreditTransactionType::Usage, "Exact".to_string())
        .await
        .unwrap();
    assert!(matches!(result, DebitResult::Applied(receipt) if receipt.new_balance == 0));

    let wallet = store.find_wallet(user_id).await.unwrap().unwrap();
    assert_eq!(wallet.lifetime_spent, 10);
}

#[tokio::test]
#[ignore]
async fn test_onboarding_against_postgres() {
    let store = setup_store().await;
    let user_id = signup(&store).await;
    let slug = unique("plan");
    store
        .insert_plan(NewPlan {
            slug: slug.clone(),
            name: "Pro".to_string(),
            description: None,
            price_cents: 2900,
            included_ai_credits: 50,
        })
        .await
        .unwrap();

    let report = onboarding_service::complete_onboarding(
        &*store,
        OnboardingInput {
            user_id,
            company_name: Some("Acme".to_string()),
            selected_plan: Some(slug),
            ..OnboardingInput::default()
        },
        Utc::now(),
        14,
    )
    .await
    .unwrap();

    assert_eq!(report.profile.company_name.as_deref(), Some("Acme"));
    let subscriptions = store.list_subscriptions(user_id).await.unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].status, SubscriptionStatus::Trialing);

    let wallet = store.find_wallet(user_id).await.unwrap().unwrap();
    assert_eq!(wallet.balance, 50);
    let transactions = store.list_transactions(wallet.id, 10).await.unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].kind, CreditTransactionType::Subscription);
    assert_eq!(transactions[0].description, "Trial credits from Pro plan");

    assert_eq!(store.list_notifications(user_id).await.unwrap().len(), 1);
}
