mod assignments;
mod brokers;
mod integration_log;
mod leads;
mod reports;
mod rotation;
mod source;
mod tokens;
pub mod types;

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::info;

use crate::platform::{NativePlatform, Platform};

pub use assignments::CursorConflict;
pub use types::{
    ApiTokenRecord, AssignmentRecord, BrokerFlags, BrokerNotifications, BrokerPerformance,
    BrokerRecord, DashboardStats, IntegrationLogRecord, LeadFilter, LeadRecord, LeadStatus,
    LeadUpdate, LogStatus, NewBroker, NewLead, RecentAssignment, SourceConfigRecord,
};

pub const DATABASE_FILE_NAME: &str = "leadflow.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS brokers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    accepts_leads INTEGER NOT NULL DEFAULT 1,
    can_access_reports INTEGER NOT NULL DEFAULT 0,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS leads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    external_id TEXT UNIQUE,
    name TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    message TEXT NOT NULL DEFAULT '',
    status TEXT NOT NULL DEFAULT 'new',
    broker_id INTEGER REFERENCES brokers(id),
    notes TEXT,
    follow_up_date DATETIME,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS lead_assignments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    lead_id INTEGER NOT NULL REFERENCES leads(id),
    broker_id INTEGER NOT NULL REFERENCES brokers(id),
    assignment_order INTEGER,
    assigned_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS rotation_state (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    policy TEXT NOT NULL,
    broker_order TEXT NOT NULL DEFAULT '[]',
    cursor INTEGER NOT NULL DEFAULT 0 CHECK (cursor >= 0),
    skip_inactive INTEGER NOT NULL DEFAULT 1,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS source_config (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    page_id TEXT,
    active INTEGER NOT NULL DEFAULT 0,
    last_sync DATETIME,
    updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS integration_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    action TEXT NOT NULL,
    status TEXT NOT NULL,
    message TEXT NOT NULL,
    details TEXT,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS api_tokens (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    token_hash TEXT NOT NULL UNIQUE,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_leads_broker_status ON leads(broker_id, status);
CREATE INDEX IF NOT EXISTS idx_assignments_broker ON lead_assignments(broker_id);
CREATE INDEX IF NOT EXISTS idx_integration_logs_created ON integration_logs(created_at, id);
";

/// SQLite-backed persistence for brokers, leads, assignments, rotation state,
/// source configuration, the integration log and API tokens.
///
/// Every method takes the connection lock for the duration of the call, so a
/// single `LeadStore` can be shared behind an `Arc` by the scheduler, the API
/// server and the CLI.
pub struct LeadStore {
    db: Arc<Mutex<Connection>>,
    data_dir: PathBuf,
}

impl LeadStore {
    pub async fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).await?;
        }
        NativePlatform::restrict_dir_permissions(&data_dir);

        let db_path = data_dir.join(DATABASE_FILE_NAME);
        let db = Connection::open(&db_path)?;
        NativePlatform::restrict_file_permissions(&db_path);

        Self::initialize(&db)?;
        info!("Lead store opened at {}", db_path.display());

        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            data_dir,
        })
    }

    /// Create the schema and the singleton rows. Runs once per process start so
    /// later reads never have to create defaults on the fly.
    fn initialize(db: &Connection) -> Result<()> {
        db.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        db.execute_batch(SCHEMA)?;
        rotation::ensure_default_row(db)?;
        source::ensure_default_row(db)?;
        Ok(())
    }

    pub fn get_db(&self) -> Arc<Mutex<Connection>> {
        self.db.clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Create a store in a fresh temp directory for testing.
#[cfg(test)]
pub async fn test_lead_store() -> LeadStore {
    let tmpdir = std::env::temp_dir().join(format!("leadflow-test-{}", uuid::Uuid::new_v4()));
    LeadStore::new(&tmpdir).await.expect("open test store")
}
