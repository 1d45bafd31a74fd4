use anyhow::{Result, anyhow};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Writer factory that fans every formatted log line out to the live log
/// stream (`/api/logs/stream`) and, unless suppressed, to stdout.
#[derive(Clone)]
pub(crate) struct BroadcastMakeWriter {
    pub sender: tokio::sync::broadcast::Sender<String>,
    pub suppress_stdout: bool,
}

impl<'a> MakeWriter<'a> for BroadcastMakeWriter {
    type Writer = BroadcastWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BroadcastWriter {
            sender: self.sender.clone(),
            suppress_stdout: self.suppress_stdout,
        }
    }
}

pub(crate) struct BroadcastWriter {
    sender: tokio::sync::broadcast::Sender<String>,
    suppress_stdout: bool,
}

impl std::io::Write for BroadcastWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let msg = String::from_utf8_lossy(buf).to_string();
        let _ = self.sender.send(msg); // Ignored if no receivers
        if !self.suppress_stdout {
            std::io::stdout().write(buf)?;
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        if !self.suppress_stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}

pub(crate) fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim()).map_err(|_| anyhow!("Unknown log level '{}'", level))
}

/// Install the global subscriber for the long-running server.
pub(crate) fn init_server_tracing(
    level: &str,
    sender: tokio::sync::broadcast::Sender<String>,
) -> Result<()> {
    let writer = BroadcastMakeWriter {
        sender,
        suppress_stdout: false,
    };
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level)?)
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// One-shot CLI commands log to stderr so stdout stays clean for command output.
pub(crate) fn init_cli_tracing(level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(level)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
