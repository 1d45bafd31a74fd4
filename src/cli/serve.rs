use anyhow::Result;
use console::style;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::{CommandArgs, parse_api_server_flags};
use crate::core::config::AppConfig;
use crate::core::lifecycle::LifecycleManager;
use crate::core::runtime::Runtime;
use crate::core::sync::attach_sync_job;
use crate::core::terminal::{self, GuideSection};
use crate::interfaces::web::{ApiServer, AppState};
use crate::logging;

/// Run the API server and the periodic sync until Ctrl+C.
pub async fn run_serve(data_dir: &Path, config: AppConfig, args: &CommandArgs) -> Result<()> {
    let (api_host, api_port) =
        parse_api_server_flags(args, config.api.host.clone(), config.api.port)?;

    let (log_tx, _) = tokio::sync::broadcast::channel(256);
    logging::init_server_tracing(&config.log.level, log_tx.clone())?;

    let interval = config.sync.interval();
    let runtime = Runtime::open(data_dir, config).await?;

    let mut lifecycle = LifecycleManager::new().await?;
    let cancel = lifecycle.cancel_token();
    attach_sync_job(
        &mut lifecycle,
        runtime.orchestrator.clone(),
        interval,
        cancel.clone(),
    )
    .await?;

    let state = AppState::from_runtime(&runtime, log_tx, api_host.clone(), api_port);
    lifecycle.attach(Arc::new(tokio::sync::Mutex::new(ApiServer::new(
        state, cancel,
    ))));
    lifecycle.start().await?;

    terminal::print_banner();
    GuideSection::new("Server")
        .status(
            "API",
            &format!(
                "{}",
                style(format!("http://{}:{}/api", api_host, api_port))
                    .underlined()
                    .cyan()
            ),
        )
        .status("Data", &runtime.data_dir.display().to_string())
        .status("Sync interval", &format!("{}s", interval.as_secs()))
        .blank()
        .status(
            "Press Ctrl+C to stop.",
            &format!("{}", style("Ctrl+C").bold().yellow()),
        )
        .print();
    println!();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");
    lifecycle.shutdown().await?;
    terminal::print_success("leadflow stopped.");
    Ok(())
}
