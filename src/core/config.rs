use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "leadflow.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_host")]
    pub host: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Seconds between two scheduled lead syncs.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Timeout applied to every form/lead listing request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Timeout applied to the connection test request.
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,

    /// Upper bound on pages followed per listing.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}
fn default_api_port() -> u16 {
    17900
}
fn default_interval_secs() -> u64 {
    300
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_test_timeout_secs() -> u64 {
    10
}
fn default_max_pages() -> usize {
    20
}
fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            test_timeout_secs: default_test_timeout_secs(),
            max_pages: default_max_pages(),
            graph_base_url: default_graph_base_url(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        // A zero interval would make the scheduler spin.
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs.max(1))
    }
}

impl AppConfig {
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let config_path = data_dir.as_ref().join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(&config_path).await?;
        let config: AppConfig = toml::from_str(&content)?;

        info!(
            "Loaded {}: api={}:{}, sync every {}s, max_pages={}",
            CONFIG_FILE_NAME,
            config.api.host,
            config.api.port,
            config.sync.interval_secs,
            config.sync.max_pages
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load(dir.path()).await.unwrap();
        assert_eq!(cfg.sync.interval_secs, 300);
        assert_eq!(cfg.api.port, 17900);
        assert_eq!(cfg.log.level, "info");
    }

    #[tokio::test]
    async fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[sync]\ninterval_secs = 60\n\n[api]\nport = 9000\n",
        )
        .unwrap();
        let cfg = AppConfig::load(dir.path()).await.unwrap();
        assert_eq!(cfg.sync.interval_secs, 60);
        assert_eq!(cfg.sync.request_timeout_secs, 30);
        assert_eq!(cfg.api.port, 9000);
        assert_eq!(cfg.api.host, "127.0.0.1");
    }

    #[test]
    fn zero_interval_is_clamped() {
        let sync = SyncConfig {
            interval_secs: 0,
            ..SyncConfig::default()
        };
        assert_eq!(sync.interval(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[sync\n").unwrap();
        assert!(AppConfig::load(dir.path()).await.is_err());
    }
}
