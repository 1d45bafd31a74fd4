use anyhow::{Result, anyhow};
use console::style;

use super::{CommandArgs, open_runtime, parse_id};
use crate::core::store::{LeadFilter, LeadRecord, LeadStatus, LeadUpdate, NewLead};
use crate::core::terminal::{print_info, print_success, print_warn};

fn print_usage() {
    println!("{}", style("Usage: leadflow lead <command> [options]").bold());
    println!("  • add <name> [--email <email>] [--phone <phone>] [--message <text>]");
    println!("  • list [--broker <id>] [--status <status>] [--limit <n>] [--json]");
    println!("  • show <id>");
    println!(
        "  • update <id> --status <new|contacted|converted|lost> [--broker <id>] [--notes <text>] [--follow-up <date>]"
    );
}

fn parse_status(raw: &str) -> Result<LeadStatus> {
    LeadStatus::from_status(raw).ok_or_else(|| anyhow!("Unknown lead status '{}'", raw))
}

fn print_lead(lead: &LeadRecord) {
    let owner = match lead.broker_id {
        Some(id) => format!("broker #{}", id),
        None => style("unassigned").yellow().to_string(),
    };
    println!(
        "  {} {} {}  [{}]  {}  {}",
        style("→").cyan(),
        style(format!("#{}", lead.id)).dim(),
        style(&lead.name).white().bold(),
        lead.status.as_str(),
        owner,
        style(&lead.created_at).dim()
    );
}

pub async fn run_lead_command(sub_cmd: &str, args: &CommandArgs) -> Result<()> {
    match sub_cmd {
        "add" => {
            let Some(name) = args.positional(0) else {
                print_usage();
                return Err(anyhow!("lead add needs a name"));
            };
            let runtime = open_runtime().await?;
            let new_lead = NewLead {
                external_id: None,
                name: name.to_string(),
                email: args.flag("email").map(str::to_string),
                phone: args.flag("phone").map(str::to_string),
                message: args.flag("message").unwrap_or_default().to_string(),
            };
            let lead = runtime
                .store
                .insert_lead(&new_lead)
                .await?
                .ok_or_else(|| anyhow!("Lead already exists"))?;
            runtime
                .distributor
                .distribute(std::slice::from_ref(&lead))
                .await?;

            match runtime.store.get_lead(lead.id).await?.and_then(|l| l.broker_id) {
                Some(broker_id) => print_success(&format!(
                    "Lead #{} created and assigned to broker #{}.",
                    lead.id, broker_id
                )),
                None => print_warn(&format!(
                    "Lead #{} created but no eligible broker was available.",
                    lead.id
                )),
            }
        }
        "list" | "ls" => {
            let filter = LeadFilter {
                broker_id: match args.flag("broker") {
                    Some(raw) => Some(parse_id(Some(raw), "broker")?),
                    None => None,
                },
                status: args.flag("status").map(parse_status).transpose()?,
                limit: args.number_flag("limit")?,
            };
            let runtime = open_runtime().await?;
            let leads = runtime.store.list_leads(&filter).await?;
            if args.has("json") {
                println!("{}", serde_json::to_string_pretty(&leads)?);
                return Ok(());
            }
            if leads.is_empty() {
                print_info("No leads match.");
                return Ok(());
            }
            println!();
            for lead in &leads {
                print_lead(lead);
            }
            println!();
        }
        "show" => {
            let id = parse_id(args.positional(0), "lead")?;
            let runtime = open_runtime().await?;
            let lead = runtime
                .store
                .get_lead(id)
                .await?
                .ok_or_else(|| anyhow!("Lead {} not found", id))?;
            let assignments = runtime.store.list_assignments_for_lead(id).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "lead": lead,
                    "assignments": assignments,
                }))?
            );
        }
        "update" => {
            let id = parse_id(args.positional(0), "lead")?;
            let broker_scope = match args.flag("broker") {
                Some(raw) => Some(parse_id(Some(raw), "broker")?),
                None => None,
            };
            let status = args
                .flag("status")
                .ok_or_else(|| anyhow!("--status is required"))
                .and_then(parse_status)?;
            let update = LeadUpdate {
                status,
                notes: args.flag("notes").unwrap_or_default().to_string(),
                follow_up_date: args.flag("follow-up").map(str::to_string),
            };
            let runtime = open_runtime().await?;
            match runtime.store.update_lead(id, broker_scope, &update).await? {
                Some(lead) => {
                    print_success("Lead updated.");
                    print_lead(&lead);
                }
                None => match broker_scope {
                    Some(broker_id) => {
                        return Err(anyhow!(
                            "Lead {} is not assigned to broker {}",
                            id,
                            broker_id
                        ));
                    }
                    None => return Err(anyhow!("Lead {} not found", id)),
                },
            }
        }
        _ => print_usage(),
    }
    Ok(())
}
