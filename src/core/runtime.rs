use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::config::AppConfig;
use crate::core::distribution::LeadDistributor;
use crate::core::store::LeadStore;
use crate::core::sync::{LeadSource, MetaGraphSource, SyncOrchestrator};
use crate::core::vault::SecretsVault;

/// Everything a command or the server needs, wired once per process.
pub struct Runtime {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub store: Arc<LeadStore>,
    pub vault: Arc<SecretsVault>,
    pub distributor: Arc<LeadDistributor>,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl Runtime {
    /// Open the store and build the engine with the Meta Graph lead source.
    pub async fn open(data_dir: &Path, config: AppConfig) -> Result<Self> {
        let source = MetaGraphSource::new(
            &config.sync.graph_base_url,
            config.sync.request_timeout(),
            config.sync.test_timeout(),
        )?;
        Self::open_with_source(data_dir, config, Arc::new(source)).await
    }

    pub async fn open_with_source(
        data_dir: &Path,
        config: AppConfig,
        source: Arc<dyn LeadSource>,
    ) -> Result<Self> {
        let store = Arc::new(LeadStore::new(data_dir).await?);
        let vault = Arc::new(SecretsVault::new(store.get_db())?);
        vault.initialize().await?;

        let distributor = Arc::new(LeadDistributor::new(store.clone()));
        let orchestrator = Arc::new(SyncOrchestrator::new(
            store.clone(),
            vault.clone(),
            distributor.clone(),
            source,
            config.sync.max_pages,
        ));

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            config,
            store,
            vault,
            distributor,
            orchestrator,
        })
    }
}
