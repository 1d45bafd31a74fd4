use anyhow::Result;
use rusqlite::{Connection, params};

use super::LeadStore;
use super::types::SourceConfigRecord;

pub(super) fn ensure_default_row(db: &Connection) -> Result<()> {
    db.execute(
        "INSERT OR IGNORE INTO source_config (id, page_id, active) VALUES (1, NULL, 0)",
        [],
    )?;
    Ok(())
}

impl LeadStore {
    pub async fn get_source_config(&self) -> Result<SourceConfigRecord> {
        let db = self.db.lock().await;
        ensure_default_row(&db)?;
        let record = db.query_row(
            "SELECT page_id, active, last_sync, updated_at FROM source_config WHERE id = 1",
            [],
            |row| {
                Ok(SourceConfigRecord {
                    page_id: row.get(0)?,
                    active: row.get::<_, i32>(1)? != 0,
                    last_sync: row.get(2)?,
                    updated_at: row.get(3)?,
                })
            },
        )?;
        Ok(record)
    }

    /// Replace the page binding. A blank page id is stored as missing.
    pub async fn save_source_config(&self, page_id: Option<&str>, active: bool) -> Result<()> {
        let page_id = page_id.map(str::trim).filter(|p| !p.is_empty());
        let db = self.db.lock().await;
        ensure_default_row(&db)?;
        db.execute(
            "UPDATE source_config SET page_id = ?1, active = ?2, updated_at = CURRENT_TIMESTAMP WHERE id = 1",
            params![page_id, active as i32],
        )?;
        Ok(())
    }

    pub async fn touch_last_sync(&self) -> Result<()> {
        let db = self.db.lock().await;
        db.execute(
            "UPDATE source_config SET last_sync = CURRENT_TIMESTAMP WHERE id = 1",
            [],
        )?;
        Ok(())
    }
}
