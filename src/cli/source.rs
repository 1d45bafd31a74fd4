use anyhow::Result;
use console::style;

use super::{CommandArgs, open_runtime};
use crate::core::terminal::{GuideSection, print_success};
use crate::core::vault::{META_API_TOKEN, META_APP_SECRET};

fn print_usage() {
    println!("{}", style("Usage: leadflow source <command> [options]").bold());
    println!("  • show");
    println!("  • set [--page-id <id>] [--token <token>] [--app-secret <secret>] [--active true|false]");
    println!("  • test");
}

pub async fn run_source_command(sub_cmd: &str, args: &CommandArgs) -> Result<()> {
    match sub_cmd {
        "show" | "" => {
            let runtime = open_runtime().await?;
            let config = runtime.store.get_source_config().await?;
            let token_set = runtime.vault.get_non_empty(META_API_TOKEN).await?.is_some();
            GuideSection::new("Meta Lead Source")
                .status("Page", config.page_id.as_deref().unwrap_or("(not set)"))
                .status("Active", &config.active.to_string())
                .status("Access token", if token_set { "stored" } else { "missing" })
                .status("Last sync", config.last_sync.as_deref().unwrap_or("never"))
                .print();
            println!();
        }
        "set" => {
            let runtime = open_runtime().await?;
            let current = runtime.store.get_source_config().await?;
            if let Some(token) = args.flag("token") {
                runtime.vault.set_secret(META_API_TOKEN, token.trim()).await?;
            }
            if let Some(secret) = args.flag("app-secret") {
                runtime
                    .vault
                    .set_secret(META_APP_SECRET, secret.trim())
                    .await?;
            }
            let page_id = args.flag("page-id").or(current.page_id.as_deref());
            let active = args.bool_flag("active")?.unwrap_or(current.active);
            runtime.store.save_source_config(page_id, active).await?;
            print_success("Source configuration saved.");
        }
        "test" => {
            let runtime = open_runtime().await?;
            let page_name = runtime.orchestrator.test_connection().await?;
            print_success(&format!("Connected to page '{}'.", page_name));
        }
        _ => print_usage(),
    }
    Ok(())
}
