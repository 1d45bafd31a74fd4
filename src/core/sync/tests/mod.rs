mod orchestrator;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

use super::{
    ExternalLead, LeadContainer, LeadField, LeadSource, Page, SourceError, SourceSettings,
    SyncOrchestrator,
};
use crate::core::distribution::LeadDistributor;
use crate::core::store::{LeadStore, NewBroker, test_lead_store};
use crate::core::vault::{META_API_TOKEN, SecretsVault};

pub(super) fn item(id: Option<&str>, fields: &[(&str, &str)]) -> ExternalLead {
    ExternalLead {
        external_id: id.map(str::to_string),
        created_time: None,
        fields: fields
            .iter()
            .map(|(name, value)| LeadField {
                name: name.to_string(),
                values: vec![value.to_string()],
            })
            .collect(),
    }
}

/// In-memory lead source. Page cursors are page indexes rendered as strings.
#[derive(Default)]
pub(super) struct MockSource {
    pub forms: Vec<Vec<LeadContainer>>,
    pub leads: HashMap<String, Vec<Vec<ExternalLead>>>,
    pub failing_forms: Vec<String>,
    pub page_name: Option<String>,
    /// When set, `list_containers` signals `entered` and parks until `release`.
    pub gate: Option<(Arc<Notify>, Arc<Notify>)>,
    pub container_calls: Arc<AtomicUsize>,
    /// Entries reported as undecodable on the first page of a form.
    pub rejected: HashMap<String, Vec<SourceError>>,
}

fn paged<T: Clone>(pages: &[Vec<T>], after: Option<&str>) -> Page<T> {
    let index: usize = after.and_then(|a| a.parse().ok()).unwrap_or(0);
    let items = pages.get(index).cloned().unwrap_or_default();
    let next = (index + 1 < pages.len()).then(|| (index + 1).to_string());
    Page {
        items,
        next,
        rejected: Vec::new(),
    }
}

#[async_trait]
impl LeadSource for MockSource {
    async fn list_containers(
        &self,
        _settings: &SourceSettings,
        after: Option<&str>,
    ) -> Result<Page<LeadContainer>, SourceError> {
        self.container_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        Ok(paged(&self.forms, after))
    }

    async fn list_lead_items(
        &self,
        container_id: &str,
        _settings: &SourceSettings,
        after: Option<&str>,
    ) -> Result<Page<ExternalLead>, SourceError> {
        if self.failing_forms.iter().any(|f| f == container_id) {
            return Err(SourceError::Status {
                status: 500,
                body: "upstream exploded".to_string(),
            });
        }
        let pages = self.leads.get(container_id).cloned().unwrap_or_default();
        let mut page = paged(&pages, after);
        if after.is_none() {
            page.rejected = self.rejected.get(container_id).cloned().unwrap_or_default();
        }
        Ok(page)
    }

    async fn describe_page(&self, _settings: &SourceSettings) -> Result<String, SourceError> {
        self.page_name.clone().ok_or(SourceError::Timeout)
    }
}

pub(super) fn form(id: &str) -> LeadContainer {
    LeadContainer {
        id: id.to_string(),
        name: format!("Form {id}"),
    }
}

pub(super) struct Harness {
    pub store: Arc<LeadStore>,
    pub vault: Arc<SecretsVault>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

pub(super) async fn harness(source: MockSource, max_pages: usize) -> Harness {
    let store = Arc::new(test_lead_store().await);
    let vault = Arc::new(SecretsVault::new(store.get_db()).unwrap());
    vault.initialize().await.unwrap();
    let distributor = Arc::new(LeadDistributor::new(store.clone()));
    let orchestrator = Arc::new(SyncOrchestrator::new(
        store.clone(),
        vault.clone(),
        distributor,
        Arc::new(source),
        max_pages,
    ));
    Harness {
        store,
        vault,
        orchestrator,
    }
}

impl Harness {
    pub async fn configure(&self) {
        self.store
            .save_source_config(Some("page-1"), true)
            .await
            .unwrap();
        self.vault.set_secret(META_API_TOKEN, "tok").await.unwrap();
    }

    pub async fn add_broker(&self, username: &str) -> i64 {
        self.store
            .create_broker(&NewBroker {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                accepts_leads: true,
                can_access_reports: false,
            })
            .await
            .unwrap()
            .id
    }
}
