use anyhow::{Result, anyhow};
use console::style;

use super::{CommandArgs, open_runtime};
use crate::core::terminal::{print_info, print_success};

fn print_usage() {
    println!("{}", style("Usage: leadflow token <command> [options]").bold());
    println!("  • create <name>    Create a new API token");
    println!("  • list             List all API tokens");
    println!("  • revoke <id>      Revoke an API token");
}

pub async fn run_token_command(sub_cmd: &str, args: &CommandArgs) -> Result<()> {
    match sub_cmd {
        "create" => {
            let Some(name) = args.positional(0).or(args.flag("name")) else {
                print_usage();
                return Err(anyhow!("token create needs a name"));
            };
            let runtime = open_runtime().await?;
            let (raw, record) = runtime.store.create_api_token(name).await?;
            println!();
            print_success(&format!("API token '{}' created.", record.name));
            println!(
                "\n  {} {}\n",
                style("Token:").bold(),
                style(&raw).green().bold()
            );
            println!(
                "  {} Save this token now, it will not be shown again.",
                style("⚠").yellow()
            );
            println!(
                "  {} Use it with: Authorization: Bearer {}\n",
                style("→").cyan(),
                raw
            );
        }
        "list" | "ls" => {
            let runtime = open_runtime().await?;
            let tokens = runtime.store.list_api_tokens().await?;
            if tokens.is_empty() {
                print_info("No API tokens. The API only answers on loopback until one exists.");
                return Ok(());
            }
            println!("\n  {} API tokens:\n", style("●").cyan());
            for token in &tokens {
                println!(
                    "  {} {} (id: {})  created: {}",
                    style("→").cyan(),
                    style(&token.name).white().bold(),
                    style(&token.id).dim(),
                    style(&token.created_at).dim()
                );
            }
            println!();
        }
        "revoke" | "delete" | "rm" => {
            let Some(id) = args.positional(0).or(args.flag("id")) else {
                print_usage();
                return Err(anyhow!("token revoke needs a token id"));
            };
            let runtime = open_runtime().await?;
            if runtime.store.revoke_api_token(id).await? {
                print_success("Token revoked.");
            } else {
                return Err(anyhow!("No token with id '{}'", id));
            }
        }
        _ => print_usage(),
    }
    Ok(())
}
