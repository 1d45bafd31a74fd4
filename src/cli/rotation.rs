use anyhow::{Result, anyhow};
use console::style;

use super::{CommandArgs, open_runtime};
use crate::core::distribution::{RotationConfig, RotationPolicy, RotationState};
use crate::core::terminal::{GuideSection, print_info, print_success, print_warn};

fn print_usage() {
    println!("{}", style("Usage: leadflow rotation <command> [options]").bold());
    println!("  • show [--json]");
    println!("  • set <round_robin|manual> [--order 3,1,2] [--skip-inactive true|false]");
}

/// Parse a comma separated broker id list. An empty string clears the order.
pub(crate) fn parse_order(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse()
                .map_err(|_| anyhow!("Invalid broker id '{}' in --order", part))
        })
        .collect()
}

fn print_state(state: &RotationState) {
    let order = if state.broker_order.is_empty() {
        "(none)".to_string()
    } else {
        state
            .broker_order
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    GuideSection::new("Rotation")
        .status("Policy", state.policy.as_str())
        .status("Order", &order)
        .status("Cursor", &state.cursor.to_string())
        .status("Skip inactive", &state.skip_inactive.to_string())
        .print();
    println!();
}

pub async fn run_rotation_command(sub_cmd: &str, args: &CommandArgs) -> Result<()> {
    match sub_cmd {
        "show" | "" => {
            let runtime = open_runtime().await?;
            let state = runtime.distributor.rotation_state().await?;
            if args.has("json") {
                println!("{}", serde_json::to_string_pretty(&state)?);
            } else {
                print_state(&state);
            }
        }
        "set" => {
            let Some(raw_policy) = args.positional(0) else {
                print_usage();
                return Err(anyhow!("rotation set needs a policy"));
            };
            let policy = RotationPolicy::from_policy(raw_policy)
                .ok_or_else(|| anyhow!("Unknown rotation policy '{}'", raw_policy))?;
            let config = RotationConfig {
                policy,
                broker_order: args.flag("order").map(parse_order).transpose()?,
                skip_inactive: args.bool_flag("skip-inactive")?.unwrap_or(true),
            };
            let runtime = open_runtime().await?;
            let state = runtime.distributor.update_rotation_config(&config).await?;
            print_success("Rotation updated. The cursor starts over.");
            print_state(&state);
        }
        _ => print_usage(),
    }
    Ok(())
}

pub async fn run_distribute() -> Result<()> {
    let runtime = open_runtime().await?;
    let report = runtime.distributor.distribute_pending().await?;
    if report.assigned.is_empty() && report.unassigned.is_empty() {
        print_info("No leads are waiting for a broker.");
        return Ok(());
    }
    for (lead_id, broker_id) in &report.assigned {
        println!(
            "  {} lead #{} → broker #{}",
            style("→").cyan(),
            lead_id,
            broker_id
        );
    }
    if report.unassigned.is_empty() {
        print_success(&format!("{} lead(s) assigned.", report.assigned.len()));
    } else {
        print_warn(&format!(
            "{} lead(s) assigned, {} still waiting for an eligible broker.",
            report.assigned.len(),
            report.unassigned.len()
        ));
    }
    Ok(())
}
