// Test helpers: an in-memory ledger store wired into the real router.

#![allow(dead_code)]

use axum_test::TestServer;
use std::sync::Arc;

use credit_ledger_api::config::{Config, StoreBackend};
use credit_ledger_api::database::{LedgerStore, MemoryLedgerStore, NewPlan, NewUser, StoreHandle};
use credit_ledger_api::models::{SubscriptionPlan, UserId, Wallet};
use credit_ledger_api::{build_router, AppState};

pub fn test_config() -> Config {
    Config {
        store_backend: StoreBackend::Memory,
        seed_plans: false,
        bcrypt_cost: 4,
        ..Config::default()
    }
}

pub struct TestApp {
    pub store: Arc<MemoryLedgerStore>,
    pub state: AppState,
}

pub fn setup_test_app() -> TestApp {
    let store = Arc::new(MemoryLedgerStore::new());
    let handle: StoreHandle = store.clone();
    TestApp {
        store,
        state: AppState::new(handle, test_config()),
    }
}

impl TestApp {
    pub fn server(&self) -> TestServer {
        TestServer::new(build_router(self.state.clone()).into_make_service())
            .expect("Failed to start test server")
    }
}

pub async fn create_test_user(store: &MemoryLedgerStore, email: &str) -> (UserId, Wallet) {
    let (user, wallet) = store
        .create_user_with_wallet(NewUser {
            email: email.to_string(),
            name: Some("Test User".to_string()),
            password_hash: "hashed_password".to_string(),
        })
        .await
        .expect("Failed to create test user");
    (user.id, wallet)
}

pub async fn create_test_plan(store: &MemoryLedgerStore, slug: &str, name: &str, credits: i64) -> SubscriptionPlan {
    store
        .insert_plan(NewPlan {
            slug: slug.to_string(),
            name: name.to_string(),
            description: None,
            price_cents: 2900,
            included_ai_credits: credits,
        })
        .await
        .expect("Failed to create test plan")
}

pub async fn wallet_of(store: &MemoryLedgerStore, user_id: UserId) -> Wallet {
    store
        .find_wallet(user_id)
        .await
        .expect("Failed to read wallet")
        .expect("Wallet should exist")
}
