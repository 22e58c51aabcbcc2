// Library root - the server binary, the operator CLI and the tests all build on this.

pub mod background;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use config::Config;
use database::StoreHandle;

#[derive(Clone)]
pub struct AppState {
    pub store: StoreHandle,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: StoreHandle, config: Config) -> Self {
        Self {
            store,
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/onboarding/complete", post(handlers::complete_onboarding))
        .route("/api/plans", get(handlers::list_plans))
        .route("/api/users/:user_id/wallet", get(handlers::get_wallet))
        .route("/api/users/:user_id/wallet/transactions", get(handlers::list_wallet_transactions))
        .route("/api/users/:user_id/wallet/spend", post(handlers::spend_credits))
        .route("/api/users/:user_id/subscriptions", get(handlers::list_subscriptions))
        .route("/api/users/:user_id/notifications", get(handlers::list_notifications))
        .route("/api/notifications/:id/read", post(handlers::mark_notification_read))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
