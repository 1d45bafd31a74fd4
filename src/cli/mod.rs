mod brokers;
mod leads;
mod reports;
mod rotation;
mod serve;
mod source;
mod sync;
mod tokens;

use anyhow::{Result, anyhow};
use console::style;
use std::collections::HashMap;

use crate::core::config::AppConfig;
use crate::core::runtime::Runtime;
use crate::core::terminal::{self, GuideSection, print_error};
use crate::logging;
use crate::platform::{NativePlatform, Platform};

fn print_help() {
    terminal::print_banner();

    GuideSection::new("Server")
        .command("serve", "Run the API server and the scheduled lead sync")
        .print();

    GuideSection::new("Leads")
        .command("broker", "Add, list, update or remove brokers")
        .command("lead", "Add, list or update leads")
        .command("rotation", "Show or change the distribution policy")
        .command("distribute", "Assign every lead still waiting for a broker")
        .print();

    GuideSection::new("Lead Source")
        .command("source", "Show, configure or test the Meta page connection")
        .command("sync", "Pull new leads from the source right now")
        .command("logs", "Show recent integration log entries")
        .print();

    GuideSection::new("Access")
        .command("token", "Manage API bearer tokens")
        .command("report", "Broker performance and recent assignments")
        .print();

    println!(
        "\n {} {} <command> [subcommand]\n",
        style("Usage:").bold(),
        style("leadflow").green()
    );
}

/// Positional arguments and `--flag value` pairs following a subcommand.
/// A flag with no value (or followed by another flag) is stored as `"true"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CommandArgs {
    pub positionals: Vec<String>,
    pub flags: HashMap<String, String>,
}

impl CommandArgs {
    pub(crate) fn parse(args: &[String], start: usize) -> Self {
        let mut parsed = CommandArgs::default();
        let mut i = start;
        while i < args.len() {
            let arg = &args[i];
            if let Some(name) = arg.strip_prefix("--") {
                if i + 1 < args.len() && !args[i + 1].starts_with("--") {
                    parsed.flags.insert(name.to_string(), args[i + 1].clone());
                    i += 2;
                } else {
                    parsed.flags.insert(name.to_string(), "true".to_string());
                    i += 1;
                }
            } else {
                parsed.positionals.push(arg.clone());
                i += 1;
            }
        }
        parsed
    }

    pub(crate) fn positional(&self, index: usize) -> Option<&str> {
        self.positionals.get(index).map(String::as_str)
    }

    pub(crate) fn flag(&self, name: &str) -> Option<&str> {
        self.flags.get(name).map(String::as_str)
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.flags.contains_key(name)
    }

    pub(crate) fn bool_flag(&self, name: &str) -> Result<Option<bool>> {
        match self.flag(name) {
            None => Ok(None),
            Some(raw) => parse_bool(raw)
                .map(Some)
                .ok_or_else(|| anyhow!("--{} expects true or false, got '{}'", name, raw)),
        }
    }

    pub(crate) fn number_flag<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.flag(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| anyhow!("--{} expects a number, got '{}'", name, raw)),
        }
    }
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_id(raw: Option<&str>, what: &str) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow!("Missing {} id", what))?;
    raw.parse()
        .map_err(|_| anyhow!("Invalid {} id '{}'", what, raw))
}

pub(crate) fn parse_api_server_flags(
    args: &CommandArgs,
    mut api_host: String,
    mut api_port: u16,
) -> Result<(String, u16)> {
    if let Some(host) = args.flag("api-host") {
        api_host = host.to_string();
    }
    if let Some(port) = args.number_flag("api-port")? {
        api_port = port;
    }
    Ok((api_host, api_port))
}

async fn load_config() -> Result<(std::path::PathBuf, AppConfig)> {
    let data_dir = NativePlatform::data_dir();
    let config = AppConfig::load(&data_dir).await?;
    Ok((data_dir, config))
}

/// Open the store for a one-shot command, logging to stderr.
pub(crate) async fn open_runtime() -> Result<Runtime> {
    let (data_dir, config) = load_config().await?;
    logging::init_cli_tracing(&config.log.level)?;
    Runtime::open(&data_dir, config).await
}

pub async fn run_main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cmd = args.get(1).map(String::as_str).unwrap_or("");
    let sub_cmd = args.get(2).map(String::as_str).unwrap_or("");

    match cmd {
        "serve" => {
            let (data_dir, config) = load_config().await?;
            let parsed = CommandArgs::parse(&args, 2);
            serve::run_serve(&data_dir, config, &parsed).await
        }
        "broker" | "brokers" => {
            brokers::run_broker_command(sub_cmd, &CommandArgs::parse(&args, 3)).await
        }
        "lead" | "leads" => leads::run_lead_command(sub_cmd, &CommandArgs::parse(&args, 3)).await,
        "rotation" => rotation::run_rotation_command(sub_cmd, &CommandArgs::parse(&args, 3)).await,
        "distribute" => rotation::run_distribute().await,
        "source" => source::run_source_command(sub_cmd, &CommandArgs::parse(&args, 3)).await,
        "sync" => sync::run_sync().await,
        "logs" => sync::run_logs(&CommandArgs::parse(&args, 2)).await,
        "report" | "reports" => reports::run_report(&CommandArgs::parse(&args, 2)).await,
        "token" | "tokens" => tokens::run_token_command(sub_cmd, &CommandArgs::parse(&args, 3)).await,
        "" | "help" | "--help" | "-h" => {
            print_help();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("leadflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_error(&format!("Unknown command '{}'", other));
            print_help();
            Err(anyhow!("Unknown command '{}'", other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_positionals_and_flags() {
        let args = argv(&[
            "leadflow", "broker", "add", "ana", "ana@example.com", "--reports", "--accepts-leads",
            "false",
        ]);
        let parsed = CommandArgs::parse(&args, 3);
        assert_eq!(parsed.positional(0), Some("ana"));
        assert_eq!(parsed.positional(1), Some("ana@example.com"));
        assert_eq!(parsed.positional(2), None);
        assert_eq!(parsed.bool_flag("reports").unwrap(), Some(true));
        assert_eq!(parsed.bool_flag("accepts-leads").unwrap(), Some(false));
        assert_eq!(parsed.bool_flag("active").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_values() {
        let parsed = CommandArgs::parse(&argv(&["x", "--active", "maybe", "--limit", "ten"]), 1);
        assert!(parsed.bool_flag("active").is_err());
        assert!(parsed.number_flag::<usize>("limit").is_err());
    }

    #[test]
    fn api_server_flags_override_config() {
        let parsed = CommandArgs::parse(&argv(&["serve", "--api-port", "9001"]), 1);
        let (host, port) = parse_api_server_flags(&parsed, "127.0.0.1".into(), 17900).unwrap();
        assert_eq!(host, "127.0.0.1");
        assert_eq!(port, 9001);

        let parsed = CommandArgs::parse(&argv(&["serve", "--api-host", "0.0.0.0"]), 1);
        let (host, port) = parse_api_server_flags(&parsed, "127.0.0.1".into(), 17900).unwrap();
        assert_eq!(host, "0.0.0.0");
        assert_eq!(port, 17900);
    }

    #[test]
    fn ids_must_be_numeric() {
        assert_eq!(parse_id(Some("12"), "broker").unwrap(), 12);
        assert!(parse_id(Some("abc"), "broker").is_err());
        assert!(parse_id(None, "lead").is_err());
    }
}
