use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, params};

use super::LeadStore;
use crate::core::distribution::{RotationPolicy, RotationState};

pub(super) fn ensure_default_row(db: &Connection) -> Result<()> {
    db.execute(
        "INSERT OR IGNORE INTO rotation_state (id, policy, broker_order, cursor, skip_inactive)
         VALUES (1, ?1, '[]', 0, 1)",
        params![RotationPolicy::RoundRobin.as_str()],
    )?;
    Ok(())
}

fn read_state(db: &Connection) -> Result<RotationState> {
    let (policy, order, cursor, skip_inactive): (String, String, i64, i32) = db.query_row(
        "SELECT policy, broker_order, cursor, skip_inactive FROM rotation_state WHERE id = 1",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;
    let policy = RotationPolicy::from_policy(&policy)
        .ok_or_else(|| anyhow!("Unknown rotation policy '{}' in store", policy))?;
    let broker_order: Vec<i64> =
        serde_json::from_str(&order).context("Corrupt broker order in rotation state")?;
    Ok(RotationState {
        policy,
        broker_order,
        cursor: cursor.max(0) as usize,
        skip_inactive: skip_inactive != 0,
    })
}

impl LeadStore {
    /// Read the single rotation record, recreating the default one if it was
    /// removed out from under us.
    pub async fn load_rotation_state(&self) -> Result<RotationState> {
        let db = self.db.lock().await;
        ensure_default_row(&db)?;
        read_state(&db)
    }

    pub async fn save_rotation_state(&self, state: &RotationState) -> Result<()> {
        let order = serde_json::to_string(&state.broker_order)?;
        let db = self.db.lock().await;
        ensure_default_row(&db)?;
        db.execute(
            "UPDATE rotation_state
             SET policy = ?1, broker_order = ?2, cursor = ?3, skip_inactive = ?4, updated_at = CURRENT_TIMESTAMP
             WHERE id = 1",
            params![
                state.policy.as_str(),
                order,
                state.cursor as i64,
                state.skip_inactive as i32
            ],
        )?;
        Ok(())
    }
}
