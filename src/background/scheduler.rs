use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::database::StoreHandle;
use crate::services::subscription_service;

pub struct BackgroundScheduler {
    scheduler: JobScheduler,
}

impl BackgroundScheduler {
    /// Register the trial sweep on `trial_sweep_cron` and start ticking.
    pub async fn new(store: StoreHandle, trial_sweep_cron: &str) -> anyhow::Result<Self> {
        let scheduler = JobScheduler::new().await?;

        scheduler
            .add(Job::new_async(trial_sweep_cron, move |_uuid, _l| {
                let store = store.clone();
                Box::pin(async move {
                    match subscription_service::end_expired_trials(&*store, Utc::now()).await {
                        Ok(ended) => info!(ended, "Trial sweep finished"),
                        Err(e) => error!("Trial sweep failed: {}", e),
                    }
                })
            })?)
            .await?;

        scheduler.start().await?;
        info!(cron = trial_sweep_cron, "Background scheduler started");

        Ok(Self { scheduler })
    }

    pub async fn shutdown(&self) {
        let mut scheduler = self.scheduler.clone();
        if let Err(e) = scheduler.shutdown().await {
            error!("Error stopping background scheduler: {:?}", e);
        }
        info!("Background scheduler stopped");
    }
}
