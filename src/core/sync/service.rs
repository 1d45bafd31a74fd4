use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::SyncOrchestrator;
use crate::core::lifecycle::{LifecycleComponent, LifecycleManager};

/// Delay before the first sync after boot, so the API is already listening.
const BOOT_SYNC_DELAY: Duration = Duration::from_secs(5);

/// Lifecycle hook around the periodic sync. Shutdown cancels future cycles
/// and then waits for a running one to finish.
pub struct SyncService {
    orchestrator: Arc<SyncOrchestrator>,
    cancel: CancellationToken,
}

impl SyncService {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, cancel: CancellationToken) -> Self {
        Self {
            orchestrator,
            cancel,
        }
    }
}

#[async_trait::async_trait]
impl LifecycleComponent for SyncService {
    async fn on_start(&mut self) -> Result<()> {
        info!("Lead sync service started");
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        self.cancel.cancel();
        info!("Waiting for in-flight lead sync to finish");
        self.orchestrator.wait_idle().await;
        Ok(())
    }
}

async fn timer_cycle(orchestrator: Arc<SyncOrchestrator>, cancel: CancellationToken) {
    if cancel.is_cancelled() {
        return;
    }
    match orchestrator.sync_if_idle().await {
        Ok(Some(report)) => info!(
            "Scheduled sync: {} imported, {} duplicate(s), {} failure(s)",
            report.imported, report.duplicates_skipped, report.failures
        ),
        Ok(None) => {}
        Err(e) => error!("Scheduled lead sync failed: {}", e),
    }
}

/// Register the repeating sync job on the lifecycle scheduler and kick off
/// one run shortly after boot.
pub async fn attach_sync_job(
    lifecycle: &mut LifecycleManager,
    orchestrator: Arc<SyncOrchestrator>,
    interval: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(BOOT_SYNC_DELAY) => timer_cycle(orchestrator, cancel).await,
            }
        });
    }

    lifecycle.attach(Arc::new(tokio::sync::Mutex::new(SyncService::new(
        orchestrator.clone(),
        cancel.clone(),
    ))));

    let job = tokio_cron_scheduler::Job::new_repeated_async(interval, move |_uuid, _l| {
        let orchestrator = orchestrator.clone();
        let cancel = cancel.clone();
        Box::pin(async move {
            timer_cycle(orchestrator, cancel).await;
        })
    })?;
    lifecycle.scheduler.add(job).await?;
    info!("Lead sync scheduled every {}s", interval.as_secs());
    Ok(())
}
