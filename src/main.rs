use tokio::signal;
use tracing::{error, info};

use credit_ledger_api::background::scheduler::BackgroundScheduler;
use credit_ledger_api::config::{Config, LogFormat};
use credit_ledger_api::{build_router, database, services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "credit_ledger_api=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    info!("Starting credit ledger API server...");
    info!(backend = ?config.store_backend, port = config.port, "Configuration loaded");

    // The one data-access handle for the whole process; closed on shutdown below.
    let store = database::open_store(&config).await?;

    if config.seed_plans {
        services::seed_data::seed_default_plans(&*store).await?;
    }

    let scheduler = BackgroundScheduler::new(store.clone(), &config.trial_sweep_cron).await?;

    let addr = format!("0.0.0.0:{}", config.port);
    let app = build_router(AppState::new(store.clone(), config));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }

    info!("Shutting down gracefully...");
    scheduler.shutdown().await;
    store.close().await;
    info!("Ledger store closed");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
