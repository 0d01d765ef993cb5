// src/services/scheduler.rs
use anyhow::{anyhow, Result};
use log::{error, info, warn};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::services::cpi_parser::{CpiParser, RefreshOutcome};

/// Runs a single CPI refresh and logs how it went. A failed refresh keeps
/// the last good table; the next scheduled run tries again.
pub async fn run_refresh(parser: &CpiParser) -> Option<RefreshOutcome> {
    info!("Refreshing CPI data from {}", parser.url());
    match parser.refresh().await {
        Ok(outcome @ RefreshOutcome::Updated { parsed, total }) => {
            info!("CPI refresh parsed {} values, {} periods available", parsed, total);
            Some(outcome)
        }
        Ok(RefreshOutcome::TableMissing) => {
            warn!("CPI refresh found no table, keeping {} cached periods", parser.store().len());
            Some(RefreshOutcome::TableMissing)
        }
        Err(e) => {
            error!("CPI refresh failed: {}", e);
            None
        }
    }
}

/// Starts a scheduler that refreshes the CPI table on `cron` (UTC, with seconds).
pub async fn start_refresh_scheduler(parser: Arc<CpiParser>, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| anyhow!("failed to create scheduler: {:?}", e))?;

    let job = Job::new_async(cron, move |_uuid, _scheduler| {
        let parser = parser.clone();
        Box::pin(async move {
            run_refresh(&parser).await;
        })
    })
    .map_err(|e| anyhow!("invalid CPI refresh schedule {:?}: {:?}", cron, e))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| anyhow!("failed to add CPI refresh job: {:?}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| anyhow!("failed to start scheduler: {:?}", e))?;

    info!("CPI refresh scheduled with cron '{}'", cron);
    Ok(scheduler)
}
