use anyhow::{Result, anyhow};
use console::style;

use super::{CommandArgs, open_runtime, parse_id};
use crate::core::store::{BrokerFlags, BrokerRecord, NewBroker};
use crate::core::terminal::{print_info, print_success};

fn print_usage() {
    println!("{}", style("Usage: leadflow broker <command> [options]").bold());
    println!("  • add <username> <email> [--accepts-leads false] [--reports]");
    println!("  • list");
    println!("  • set <id> [--active true|false] [--accepts-leads true|false] [--reports true|false]");
    println!("  • remove <id>");
    println!("  • notifications <id>");
}

fn yes_no(flag: bool) -> String {
    if flag {
        style("yes").green().to_string()
    } else {
        style("no").dim().to_string()
    }
}

fn print_broker(broker: &BrokerRecord) {
    println!(
        "  {} {} {} <{}>  active: {}  leads: {}  reports: {}",
        style("→").cyan(),
        style(format!("#{}", broker.id)).dim(),
        style(&broker.username).white().bold(),
        broker.email,
        yes_no(broker.active),
        yes_no(broker.accepts_leads),
        yes_no(broker.can_access_reports)
    );
}

pub async fn run_broker_command(sub_cmd: &str, args: &CommandArgs) -> Result<()> {
    match sub_cmd {
        "add" => {
            let (Some(username), Some(email)) = (args.positional(0), args.positional(1)) else {
                print_usage();
                return Err(anyhow!("broker add needs a username and an email"));
            };
            let runtime = open_runtime().await?;
            let broker = runtime
                .store
                .create_broker(&NewBroker {
                    username: username.to_string(),
                    email: email.to_string(),
                    accepts_leads: args.bool_flag("accepts-leads")?.unwrap_or(true),
                    can_access_reports: args.bool_flag("reports")?.unwrap_or(false),
                })
                .await?;
            print_success(&format!(
                "Broker '{}' added with id {}.",
                broker.username, broker.id
            ));
        }
        "list" | "ls" => {
            let runtime = open_runtime().await?;
            let brokers = runtime.store.list_brokers().await?;
            if brokers.is_empty() {
                print_info("No brokers yet. Add one with 'leadflow broker add <username> <email>'.");
                return Ok(());
            }
            println!();
            for broker in &brokers {
                print_broker(broker);
            }
            println!();
        }
        "set" | "update" => {
            let id = parse_id(args.positional(0), "broker")?;
            let flags = BrokerFlags {
                active: args.bool_flag("active")?,
                accepts_leads: args.bool_flag("accepts-leads")?,
                can_access_reports: args.bool_flag("reports")?,
            };
            let runtime = open_runtime().await?;
            if !runtime.store.update_broker_flags(id, &flags).await? {
                return Err(anyhow!("Broker {} not found", id));
            }
            if let Some(broker) = runtime.store.resolve_broker(id).await? {
                print_success("Broker updated.");
                print_broker(&broker);
            }
        }
        "remove" | "rm" | "delete" => {
            let id = parse_id(args.positional(0), "broker")?;
            let runtime = open_runtime().await?;
            if !runtime.store.delete_broker(id).await? {
                return Err(anyhow!("Broker {} not found", id));
            }
            print_success(&format!("Broker {} removed.", id));
        }
        "notifications" => {
            let id = parse_id(args.positional(0), "broker")?;
            let runtime = open_runtime().await?;
            let notes = runtime.store.broker_notifications(id).await?;
            println!(
                "  {} new lead(s), {} follow-up(s) due within the hour",
                style(notes.new_leads).bold(),
                style(notes.follow_ups_due).bold()
            );
        }
        _ => print_usage(),
    }
    Ok(())
}
