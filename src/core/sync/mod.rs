mod fields;
mod meta;
mod service;
mod source;

use anyhow::{Result, anyhow};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::core::distribution::{DistributionReport, LeadDistributor};
use crate::core::store::{LeadRecord, LeadStore, LogStatus};
use crate::core::vault::{META_API_TOKEN, META_APP_SECRET, SecretsVault};

pub use fields::{ParsedFields, parse_fields, to_new_lead};
pub use meta::MetaGraphSource;
pub use service::{SyncService, attach_sync_job};
pub use source::{
    ExternalLead, LeadContainer, LeadField, LeadSource, Page, SourceError, SourceSettings,
};

const SYNC_ACTION: &str = "sync_leads";
const TEST_ACTION: &str = "test_connection";

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// False when no active source configuration was found.
    pub configured: bool,
    pub containers_seen: usize,
    pub items_seen: usize,
    pub duplicates_skipped: usize,
    pub imported: usize,
    pub failures: usize,
    pub distribution: DistributionReport,
}

/// Pulls new leads from the configured source, stores the ones never seen
/// before and hands them to the distributor.
///
/// `sync_lock` keeps runs from overlapping: the timer uses
/// [`sync_if_idle`](Self::sync_if_idle) and skips a busy cycle, manual
/// callers wait their turn through [`sync_once`](Self::sync_once).
pub struct SyncOrchestrator {
    store: Arc<LeadStore>,
    vault: Arc<SecretsVault>,
    distributor: Arc<LeadDistributor>,
    source: Arc<dyn LeadSource>,
    max_pages: usize,
    sync_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<LeadStore>,
        vault: Arc<SecretsVault>,
        distributor: Arc<LeadDistributor>,
        source: Arc<dyn LeadSource>,
        max_pages: usize,
    ) -> Self {
        Self {
            store,
            vault,
            distributor,
            source,
            max_pages: max_pages.max(1),
            sync_lock: Mutex::new(()),
        }
    }

    pub async fn sync_once(&self) -> Result<SyncReport> {
        let _guard = self.sync_lock.lock().await;
        self.run().await
    }

    /// Run a sync unless one is already in progress, in which case `None`.
    pub async fn sync_if_idle(&self) -> Result<Option<SyncReport>> {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            info!("Previous lead sync still running; skipping this cycle");
            return Ok(None);
        };
        self.run().await.map(Some)
    }

    /// Resolve once no sync is running.
    pub async fn wait_idle(&self) {
        let _guard = self.sync_lock.lock().await;
    }

    /// Source settings for a sync, or `None` when the source is inactive,
    /// has no page bound or has no access token stored.
    pub async fn active_settings(&self) -> Result<Option<SourceSettings>> {
        let config = self.store.get_source_config().await?;
        if !config.active {
            return Ok(None);
        }
        let Some(page_id) = config.page_id else {
            return Ok(None);
        };
        let Some(access_token) = self.vault.get_non_empty(META_API_TOKEN).await? else {
            return Ok(None);
        };
        let app_secret = self.vault.get_non_empty(META_APP_SECRET).await?;
        Ok(Some(SourceSettings {
            page_id,
            access_token,
            app_secret,
        }))
    }

    /// Fetch the page name with the short connection-test timeout.
    pub async fn test_connection(&self) -> Result<String> {
        let settings = self
            .active_settings()
            .await?
            .ok_or_else(|| anyhow!("Lead source is not configured or inactive"))?;
        match self.source.describe_page(&settings).await {
            Ok(name) => {
                info!("Connection test succeeded for page '{}'", name);
                self.store
                    .log_integration(
                        TEST_ACTION,
                        LogStatus::Success,
                        &format!("Connected to page {}", name),
                        None,
                    )
                    .await;
                Ok(name)
            }
            Err(e) => {
                warn!("Connection test failed: {}", e);
                self.store
                    .log_integration(
                        TEST_ACTION,
                        LogStatus::Error,
                        &format!("Connection test failed: {}", e),
                        Some(e.details()),
                    )
                    .await;
                Err(anyhow!("Connection test failed: {}", e))
            }
        }
    }

    async fn run(&self) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        let Some(settings) = self.active_settings().await? else {
            info!("Lead source not configured; nothing to sync");
            self.store
                .log_integration(
                    SYNC_ACTION,
                    LogStatus::Info,
                    "Lead source is not configured or inactive; nothing to sync",
                    None,
                )
                .await;
            return Ok(report);
        };
        report.configured = true;

        let containers = self.collect_containers(&settings, &mut report).await;
        report.containers_seen = containers.len();

        let mut batch: Vec<LeadRecord> = Vec::new();
        for container in &containers {
            self.import_container(container, &settings, &mut report, &mut batch)
                .await;
        }

        if batch.is_empty() {
            info!(
                "Lead sync finished: {} item(s) seen, nothing new",
                report.items_seen
            );
            return Ok(report);
        }

        if let Err(e) = self.store.touch_last_sync().await {
            warn!("Could not record last sync time: {}", e);
        }
        let message = format!("Imported {} new leads", batch.len());
        info!("{}", message);
        self.store
            .log_integration(SYNC_ACTION, LogStatus::Success, &message, None)
            .await;

        match self.distributor.distribute(&batch).await {
            Ok(distribution) => report.distribution = distribution,
            Err(e) => {
                error!("Distribution of imported leads failed: {}", e);
                self.store
                    .log_integration(
                        SYNC_ACTION,
                        LogStatus::Error,
                        &format!("Distribution of imported leads failed: {}", e),
                        None,
                    )
                    .await;
            }
        }
        Ok(report)
    }

    async fn collect_containers(
        &self,
        settings: &SourceSettings,
        report: &mut SyncReport,
    ) -> Vec<LeadContainer> {
        let mut containers = Vec::new();
        let mut after: Option<String> = None;
        for page_no in 0..self.max_pages {
            match self.source.list_containers(settings, after.as_deref()).await {
                Ok(page) => {
                    containers.extend(page.items);
                    match page.next {
                        Some(next) if page_no + 1 < self.max_pages => after = Some(next),
                        Some(_) => {
                            warn!("Lead form listing truncated at {} page(s)", self.max_pages)
                        }
                        None => break,
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    self.record_source_error(
                        &format!("Failed to list lead forms for page {}", settings.page_id),
                        &e,
                    )
                    .await;
                    break;
                }
            }
        }
        containers
    }

    async fn import_container(
        &self,
        container: &LeadContainer,
        settings: &SourceSettings,
        report: &mut SyncReport,
        batch: &mut Vec<LeadRecord>,
    ) {
        let mut after: Option<String> = None;
        for page_no in 0..self.max_pages {
            let page = match self
                .source
                .list_lead_items(&container.id, settings, after.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    report.failures += 1;
                    self.record_source_error(
                        &format!("Failed to fetch leads for form {}", container.id),
                        &e,
                    )
                    .await;
                    return;
                }
            };

            for rejected in &page.rejected {
                report.items_seen += 1;
                report.failures += 1;
                self.record_source_error(
                    &format!("Skipped unreadable lead in form {}", container.id),
                    rejected,
                )
                .await;
            }
            for item in &page.items {
                report.items_seen += 1;
                self.import_item(item, report, batch).await;
            }

            match page.next {
                Some(next) if page_no + 1 < self.max_pages => after = Some(next),
                Some(_) => warn!(
                    "Lead listing for form {} truncated at {} page(s)",
                    container.id, self.max_pages
                ),
                None => return,
            }
        }
    }

    async fn import_item(
        &self,
        item: &ExternalLead,
        report: &mut SyncReport,
        batch: &mut Vec<LeadRecord>,
    ) {
        if let Some(external_id) = &item.external_id {
            match self.store.lead_exists_with_external_id(external_id).await {
                Ok(true) => {
                    report.duplicates_skipped += 1;
                    return;
                }
                Ok(false) => {}
                Err(e) => {
                    report.failures += 1;
                    error!("Duplicate check for lead {} failed: {}", external_id, e);
                    self.store
                        .log_integration(
                            SYNC_ACTION,
                            LogStatus::Error,
                            &format!("Duplicate check for lead {} failed: {}", external_id, e),
                            Some(serde_json::json!({ "external_id": external_id })),
                        )
                        .await;
                    return;
                }
            }
        }

        let new_lead = to_new_lead(item);
        match self.store.insert_lead(&new_lead).await {
            Ok(Some(lead)) => {
                report.imported += 1;
                batch.push(lead);
            }
            // Lost the race against another import of the same lead.
            Ok(None) => report.duplicates_skipped += 1,
            Err(e) => {
                report.failures += 1;
                error!("Storing imported lead failed: {}", e);
                self.store
                    .log_integration(
                        SYNC_ACTION,
                        LogStatus::Error,
                        &format!("Failed to store imported lead: {}", e),
                        item.external_id
                            .as_ref()
                            .map(|id| serde_json::json!({ "external_id": id })),
                    )
                    .await;
            }
        }
    }

    async fn record_source_error(&self, context: &str, e: &SourceError) {
        error!("{}: {}", context, e);
        self.store
            .log_integration(
                SYNC_ACTION,
                LogStatus::Error,
                &format!("{}: {}", context, e),
                Some(e.details()),
            )
            .await;
    }
}

#[cfg(test)]
mod tests;
