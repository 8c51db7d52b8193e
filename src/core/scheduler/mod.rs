//! Recurring dispatch heartbeat.
//!
//! When enabled, one cron job per worker identity triggers a dispatcher pass
//! so pending tasks get picked up even when nothing calls the poll endpoint.
//! Off by default; dispatch stays purely call-driven without it.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::core::workflow::Worker;
use crate::core::workflow::dispatcher::{DEFAULT_BATCH_LIMIT, TaskDispatcher};

pub struct DispatchScheduler {
    scheduler: JobScheduler,
}

impl DispatchScheduler {
    pub async fn start(dispatcher: Arc<TaskDispatcher>, cron: &str) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| anyhow!("failed to create dispatch scheduler: {e}"))?;

        for worker in Worker::ALL {
            let dispatcher = dispatcher.clone();
            info!(
                "Scheduling dispatch heartbeat for {} worker: {}",
                worker.as_str(),
                cron
            );
            let job = Job::new_async(cron, move |_uuid, mut _l| {
                let dispatcher = dispatcher.clone();
                Box::pin(async move {
                    match dispatcher.dispatch(worker, DEFAULT_BATCH_LIMIT).await {
                        Ok(results) if !results.is_empty() => {
                            info!(
                                "Heartbeat processed {} task(s) for {} worker",
                                results.len(),
                                worker.as_str()
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(
                                "Heartbeat dispatch for {} worker failed: {}",
                                worker.as_str(),
                                e
                            );
                        }
                    }
                })
            })
            .map_err(|e| anyhow!("failed to build heartbeat job: {e}"))?;
            scheduler
                .add(job)
                .await
                .map_err(|e| anyhow!("failed to register heartbeat job: {e}"))?;
        }

        scheduler
            .start()
            .await
            .map_err(|e| anyhow!("failed to start dispatch scheduler: {e}"))?;
        Ok(Self { scheduler })
    }

    pub async fn shutdown(mut self) -> Result<()> {
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| anyhow!("failed to stop dispatch scheduler: {e}"))?;
        Ok(())
    }
}
