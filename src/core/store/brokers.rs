use anyhow::{Result, bail};
use rusqlite::{OptionalExtension, Row, params};

use super::LeadStore;
use super::types::{BrokerFlags, BrokerRecord, NewBroker};

const BROKER_COLUMNS: &str =
    "id, username, email, active, accepts_leads, can_access_reports, created_at";

fn broker_from_row(row: &Row<'_>) -> rusqlite::Result<BrokerRecord> {
    Ok(BrokerRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        active: row.get::<_, i32>(3)? != 0,
        accepts_leads: row.get::<_, i32>(4)? != 0,
        can_access_reports: row.get::<_, i32>(5)? != 0,
        created_at: row.get(6)?,
    })
}

impl LeadStore {
    pub async fn create_broker(&self, broker: &NewBroker) -> Result<BrokerRecord> {
        let username = broker.username.trim();
        if username.is_empty() {
            bail!("Broker username must not be empty");
        }
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO brokers (username, email, accepts_leads, can_access_reports) VALUES (?1, ?2, ?3, ?4)",
            params![
                username,
                broker.email.trim(),
                broker.accepts_leads as i32,
                broker.can_access_reports as i32
            ],
        )?;
        let id = db.last_insert_rowid();
        let record = db.query_row(
            &format!("SELECT {BROKER_COLUMNS} FROM brokers WHERE id = ?1"),
            params![id],
            broker_from_row,
        )?;
        Ok(record)
    }

    pub async fn list_brokers(&self) -> Result<Vec<BrokerRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!("SELECT {BROKER_COLUMNS} FROM brokers ORDER BY id ASC"))?;
        let rows = stmt.query_map([], broker_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Brokers that may receive leads, ordered by ascending id. The order is
    /// what the round-robin cursor indexes into, so it must stay stable.
    pub async fn list_eligible_brokers(&self) -> Result<Vec<BrokerRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {BROKER_COLUMNS} FROM brokers WHERE active = 1 AND accepts_leads = 1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], broker_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn resolve_broker(&self, id: i64) -> Result<Option<BrokerRecord>> {
        let db = self.db.lock().await;
        let record = db
            .query_row(
                &format!("SELECT {BROKER_COLUMNS} FROM brokers WHERE id = ?1"),
                params![id],
                broker_from_row,
            )
            .optional()?;
        Ok(record)
    }

    pub async fn update_broker_flags(&self, id: i64, flags: &BrokerFlags) -> Result<bool> {
        let db = self.db.lock().await;
        let rows_updated = db.execute(
            "UPDATE brokers SET
                active = COALESCE(?1, active),
                accepts_leads = COALESCE(?2, accepts_leads),
                can_access_reports = COALESCE(?3, can_access_reports)
             WHERE id = ?4",
            params![
                flags.active.map(|v| v as i32),
                flags.accepts_leads.map(|v| v as i32),
                flags.can_access_reports.map(|v| v as i32),
                id
            ],
        )?;
        Ok(rows_updated > 0)
    }

    /// Remove a broker that never received a lead. Brokers referenced by the
    /// assignment audit trail can only be deactivated.
    pub async fn delete_broker(&self, id: i64) -> Result<bool> {
        let db = self.db.lock().await;
        let referenced: i64 = db.query_row(
            "SELECT COUNT(*) FROM lead_assignments WHERE broker_id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        if referenced > 0 {
            bail!(
                "Broker {} has {} recorded assignment(s); deactivate it instead",
                id,
                referenced
            );
        }
        let rows_deleted = db.execute("DELETE FROM brokers WHERE id = ?1", params![id])?;
        Ok(rows_deleted > 0)
    }
}
