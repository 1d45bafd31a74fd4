use anyhow::{Result, anyhow, bail};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{OptionalExtension, Row, params};

use super::LeadStore;
use super::types::{BrokerNotifications, LeadFilter, LeadRecord, LeadStatus, LeadUpdate, NewLead};

const LEAD_COLUMNS: &str = "id, external_id, name, email, phone, message, status, broker_id, notes, follow_up_date, created_at, updated_at";

const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

fn lead_from_row(row: &Row<'_>) -> rusqlite::Result<LeadRecord> {
    let status: String = row.get(6)?;
    let status = LeadStatus::from_status(&status).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(6, "status".to_string(), rusqlite::types::Type::Text)
    })?;
    Ok(LeadRecord {
        id: row.get(0)?,
        external_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        message: row.get(5)?,
        status,
        broker_id: row.get(7)?,
        notes: row.get(8)?,
        follow_up_date: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` or `YYYY-MM-DD HH:MM:SS` and
/// returns the SQLite datetime form so it compares against `datetime('now')`.
pub(crate) fn normalize_follow_up(raw: &str) -> Result<String> {
    let raw = raw.trim();
    for fmt in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt.format(SQLITE_DATETIME).to_string());
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("Invalid follow-up date '{}'", raw))?;
    let dt = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow!("Invalid follow-up date '{}'", raw))?;
    Ok(dt.format(SQLITE_DATETIME).to_string())
}

impl LeadStore {
    /// Insert a lead. Returns `None` when another lead already carries the same
    /// external identifier; the UNIQUE column is what makes concurrent imports
    /// of the same external lead collapse into one row.
    pub async fn insert_lead(&self, lead: &NewLead) -> Result<Option<LeadRecord>> {
        if lead.name.trim().is_empty() {
            bail!("Lead name must not be empty");
        }
        let db = self.db.lock().await;
        let inserted = db.execute(
            "INSERT INTO leads (external_id, name, email, phone, message) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(external_id) DO NOTHING",
            params![
                lead.external_id,
                lead.name,
                lead.email,
                lead.phone,
                lead.message
            ],
        )?;
        if inserted == 0 {
            return Ok(None);
        }
        let id = db.last_insert_rowid();
        let record = db.query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            params![id],
            lead_from_row,
        )?;
        Ok(Some(record))
    }

    pub async fn lead_exists_with_external_id(&self, external_id: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM leads WHERE external_id = ?1",
            params![external_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub async fn get_lead(&self, id: i64) -> Result<Option<LeadRecord>> {
        let db = self.db.lock().await;
        let record = db
            .query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id],
                lead_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Newest first.
    pub async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<LeadRecord>> {
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads
             WHERE (?1 IS NULL OR broker_id = ?1) AND (?2 IS NULL OR status = ?2)
             ORDER BY id DESC LIMIT ?3"
        ))?;
        let rows = stmt.query_map(
            params![filter.broker_id, filter.status.map(|s| s.as_str()), limit],
            lead_from_row,
        )?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Leads still waiting for a broker, oldest first.
    pub async fn list_unassigned_leads(&self) -> Result<Vec<LeadRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(&format!(
            "SELECT {LEAD_COLUMNS} FROM leads WHERE broker_id IS NULL ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map([], lead_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Apply a broker's edit. When `broker_scope` is set the lead must be
    /// assigned to that broker, otherwise nothing is updated and `None` is
    /// returned.
    pub async fn update_lead(
        &self,
        id: i64,
        broker_scope: Option<i64>,
        update: &LeadUpdate,
    ) -> Result<Option<LeadRecord>> {
        let follow_up = match update.follow_up_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(normalize_follow_up(raw)?),
            _ => None,
        };
        let db = self.db.lock().await;
        let rows_updated = db.execute(
            "UPDATE leads SET status = ?1, notes = ?2, follow_up_date = ?3, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?4 AND (?5 IS NULL OR broker_id = ?5)",
            params![
                update.status.as_str(),
                update.notes,
                follow_up,
                id,
                broker_scope
            ],
        )?;
        if rows_updated == 0 {
            return Ok(None);
        }
        let record = db.query_row(
            &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
            params![id],
            lead_from_row,
        )?;
        Ok(Some(record))
    }

    pub async fn broker_notifications(&self, broker_id: i64) -> Result<BrokerNotifications> {
        let db = self.db.lock().await;
        let new_leads: i64 = db.query_row(
            "SELECT COUNT(*) FROM leads WHERE broker_id = ?1 AND status = 'new'",
            params![broker_id],
            |row| row.get(0),
        )?;
        let follow_ups_due: i64 = db.query_row(
            "SELECT COUNT(*) FROM leads WHERE broker_id = ?1
               AND follow_up_date >= datetime('now')
               AND follow_up_date <= datetime('now', '+1 hour')",
            params![broker_id],
            |row| row.get(0),
        )?;
        Ok(BrokerNotifications {
            new_leads,
            follow_ups_due,
        })
    }
}
