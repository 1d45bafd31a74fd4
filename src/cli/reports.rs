use anyhow::Result;
use console::style;

use super::{CommandArgs, open_runtime};
use crate::core::terminal::GuideSection;

const DEFAULT_REPORT_DAYS: u32 = 30;
const RECENT_ASSIGNMENTS: usize = 10;

pub async fn run_report(args: &CommandArgs) -> Result<()> {
    let days = args.number_flag("days")?.unwrap_or(DEFAULT_REPORT_DAYS);
    let runtime = open_runtime().await?;

    let stats = runtime.store.dashboard_stats().await?;
    let performance = runtime.store.broker_performance(days).await?;
    let recent = runtime.store.recent_assignments(RECENT_ASSIGNMENTS).await?;

    if args.has("json") {
        let body = serde_json::json!({
            "dashboard": stats,
            "brokers": performance,
            "recent_assignments": recent,
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    let mut overview = GuideSection::new("Overview")
        .status("Leads", &stats.total_leads.to_string())
        .status(
            "Brokers",
            &format!("{} ({} active)", stats.total_brokers, stats.active_brokers),
        )
        .status("Last sync", stats.last_sync.as_deref().unwrap_or("never"));
    for (status, count) in &stats.status_counts {
        overview = overview.status(status, &count.to_string());
    }
    overview.print();

    println!(
        "\n {}",
        style(format!("Brokers, last {} days", days)).bold().underlined()
    );
    for row in &performance {
        println!(
            "   {:<20} {:>4} lead(s)  {:>4} converted  {:>4} lost  {:>5.1}%",
            row.username, row.total_leads, row.converted, row.lost, row.conversion_rate
        );
    }

    println!("\n {}", style("Recent assignments").bold().underlined());
    for item in &recent {
        println!(
            "   {} {} → {}",
            style(&item.assigned_at).dim(),
            item.lead_name,
            item.broker_username
        );
    }
    println!();
    Ok(())
}
