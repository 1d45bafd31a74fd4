use anyhow::{Result, bail};
use rusqlite::{Row, params};
use thiserror::Error;

use super::LeadStore;
use super::types::AssignmentRecord;

/// The stored rotation cursor no longer matches the one the selection was
/// made from. Another writer (possibly another process) assigned a lead in
/// between; reload the rotation state and select again.
#[derive(Debug, Error)]
#[error("rotation cursor is no longer {expected}")]
pub struct CursorConflict {
    pub expected: usize,
}

fn assignment_from_row(row: &Row<'_>) -> rusqlite::Result<AssignmentRecord> {
    Ok(AssignmentRecord {
        id: row.get(0)?,
        lead_id: row.get(1)?,
        broker_id: row.get(2)?,
        assignment_order: row.get(3)?,
        assigned_at: row.get(4)?,
    })
}

impl LeadStore {
    /// Assign `lead_id` to `broker_id` and move the rotation cursor from
    /// `expected_cursor` to `next_cursor` in one transaction.
    ///
    /// The cursor write is a compare-and-set: if the stored cursor is no
    /// longer `expected_cursor` the call fails with [`CursorConflict`]. The
    /// lead must still be unassigned. If any statement fails the whole
    /// transaction is dropped, leaving the lead, the audit trail and the cursor
    /// exactly as they were.
    pub async fn assign_lead(
        &self,
        lead_id: i64,
        broker_id: i64,
        position: usize,
        expected_cursor: usize,
        next_cursor: usize,
    ) -> Result<AssignmentRecord> {
        let mut db = self.db.lock().await;
        let tx = db.transaction()?;

        // Readers clamp negative cursors to 0, so compare the same way.
        let advanced = tx.execute(
            "UPDATE rotation_state SET cursor = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE id = 1 AND MAX(cursor, 0) = ?2",
            params![next_cursor as i64, expected_cursor as i64],
        )?;
        if advanced == 0 {
            return Err(CursorConflict {
                expected: expected_cursor,
            }
            .into());
        }

        let claimed = tx.execute(
            "UPDATE leads SET broker_id = ?1, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?2 AND broker_id IS NULL",
            params![broker_id, lead_id],
        )?;
        if claimed == 0 {
            bail!("Lead {} does not exist or is already assigned", lead_id);
        }

        tx.execute(
            "INSERT INTO lead_assignments (lead_id, broker_id, assignment_order) VALUES (?1, ?2, ?3)",
            params![lead_id, broker_id, position as i64],
        )?;
        let id = tx.last_insert_rowid();

        let record = tx.query_row(
            "SELECT id, lead_id, broker_id, assignment_order, assigned_at FROM lead_assignments WHERE id = ?1",
            params![id],
            assignment_from_row,
        )?;
        tx.commit()?;
        Ok(record)
    }

    pub async fn list_assignments_for_lead(&self, lead_id: i64) -> Result<Vec<AssignmentRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, lead_id, broker_id, assignment_order, assigned_at
             FROM lead_assignments WHERE lead_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![lead_id], assignment_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn list_assignments(&self) -> Result<Vec<AssignmentRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, lead_id, broker_id, assignment_order, assigned_at
             FROM lead_assignments ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], assignment_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
