pub(crate) mod auth;
mod handlers;
mod router;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::core::distribution::LeadDistributor;
use crate::core::lifecycle::LifecycleComponent;
use crate::core::runtime::Runtime;
use crate::core::store::LeadStore;
use crate::core::sync::SyncOrchestrator;
use crate::core::vault::SecretsVault;

pub use router::build_api_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<LeadStore>,
    pub(crate) vault: Arc<SecretsVault>,
    pub(crate) distributor: Arc<LeadDistributor>,
    pub(crate) orchestrator: Arc<SyncOrchestrator>,
    pub(crate) log_tx: tokio::sync::broadcast::Sender<String>,
    pub(crate) api_host: String,
    pub(crate) api_port: u16,
}

impl AppState {
    pub(crate) fn from_runtime(
        runtime: &Runtime,
        log_tx: tokio::sync::broadcast::Sender<String>,
        api_host: String,
        api_port: u16,
    ) -> Self {
        Self {
            store: runtime.store.clone(),
            vault: runtime.vault.clone(),
            distributor: runtime.distributor.clone(),
            orchestrator: runtime.orchestrator.clone(),
            log_tx,
            api_host,
            api_port,
        }
    }
}

/// JSON API served by `leadflow serve`.
pub struct ApiServer {
    state: AppState,
    cancel: CancellationToken,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl ApiServer {
    pub(crate) fn new(state: AppState, cancel: CancellationToken) -> Self {
        Self {
            state,
            cancel,
            handle: None,
        }
    }
}

// --- SSE Logs (used by router) ---

async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(line) => Ok(Event::default().data(line.trim_end())),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });
    Sse::new(stream)
}

#[async_trait]
impl LifecycleComponent for ApiServer {
    async fn on_start(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.state.api_host, self.state.api_port);
        // Bind here so a taken port fails startup instead of a background task.
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind API server to {}", addr))?;
        let app = router::build_api_router(self.state.clone());
        let cancel = self.cancel.clone();

        info!("API server listening on http://{}", addr);
        self.handle = Some(tokio::spawn(async move {
            let shutdown = async move { cancel.cancelled().await };
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("API server stopped with error: {}", e);
            }
        }));
        Ok(())
    }

    async fn on_shutdown(&mut self) -> Result<()> {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("API server stopped");
        Ok(())
    }
}
