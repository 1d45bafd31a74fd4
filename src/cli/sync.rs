use anyhow::Result;
use console::style;

use super::{CommandArgs, open_runtime};
use crate::core::terminal::{GuideSection, print_info, print_success, print_warn};

const DEFAULT_LOG_LIMIT: usize = 20;

pub async fn run_sync() -> Result<()> {
    let runtime = open_runtime().await?;
    let report = runtime.orchestrator.sync_once().await?;
    if !report.configured {
        print_info("Lead source is not configured or inactive; nothing to sync.");
        return Ok(());
    }

    GuideSection::new("Lead Sync")
        .status("Forms", &report.containers_seen.to_string())
        .status("Leads seen", &report.items_seen.to_string())
        .status("Imported", &report.imported.to_string())
        .status("Duplicates", &report.duplicates_skipped.to_string())
        .status("Assigned", &report.distribution.assigned.len().to_string())
        .print();
    println!();

    if report.failures > 0 {
        print_warn(&format!(
            "{} source request(s) failed; see 'leadflow logs'.",
            report.failures
        ));
    } else {
        print_success("Sync finished.");
    }
    Ok(())
}

pub async fn run_logs(args: &CommandArgs) -> Result<()> {
    let limit = args.number_flag("limit")?.unwrap_or(DEFAULT_LOG_LIMIT);
    let runtime = open_runtime().await?;
    let entries = runtime.store.list_integration_logs(limit).await?;
    if args.has("json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        print_info("The integration log is empty.");
        return Ok(());
    }
    println!();
    for entry in &entries {
        let status = match entry.status.as_str() {
            "success" => style(&entry.status).green(),
            "error" => style(&entry.status).red(),
            "warning" => style(&entry.status).yellow(),
            _ => style(&entry.status).blue(),
        };
        println!(
            "  {} {:<8} {:<18} {}",
            style(&entry.created_at).dim(),
            status,
            entry.action,
            entry.message
        );
    }
    println!();
    Ok(())
}
