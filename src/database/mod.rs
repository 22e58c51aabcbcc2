pub mod memory;
pub mod postgres;
pub mod store;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::{Config, StoreBackend};

pub use memory::MemoryLedgerStore;
pub use postgres::PgLedgerStore;
pub use store::{
    DbError, DbResult, DebitResult, LedgerStore, NewNotification, NewPlan, NewSubscription,
    NewUser, ProfileUpdate,
};

#[cfg(test)]
pub use store::MockLedgerStore;

/// Shared handle to whichever backend was opened at startup.
pub type StoreHandle = Arc<dyn LedgerStore>;

pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    // sqlx negotiates TLS from the URL (sslmode=require etc.).
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    if database_url.contains("sslmode=require") || database_url.contains("sslmode=prefer") {
        tracing::info!("Database connection configured to use TLS");
    } else if !database_url.contains("localhost") && !database_url.contains("127.0.0.1") {
        tracing::warn!("Connecting to remote database without explicit sslmode. Consider adding sslmode=require");
    }

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Open the configured backend. Postgres pools are migrated before use.
pub async fn open_store(config: &Config) -> anyhow::Result<StoreHandle> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.database_max_connections).await?;
            run_migrations(&pool).await?;
            tracing::info!("Postgres ledger store ready");
            Ok(Arc::new(PgLedgerStore::new(pool)))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory ledger store; data is lost on shutdown");
            Ok(Arc::new(MemoryLedgerStore::new()))
        }
    }
}
