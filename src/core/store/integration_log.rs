use anyhow::Result;
use rusqlite::params;
use serde_json::Value;
use tracing::warn;

use super::LeadStore;
use super::types::{IntegrationLogRecord, LogStatus};

impl LeadStore {
    pub async fn append_integration_log(
        &self,
        action: &str,
        status: LogStatus,
        message: &str,
        details: Option<&Value>,
    ) -> Result<()> {
        let details = details.map(serde_json::to_string).transpose()?;
        let db = self.db.lock().await;
        db.execute(
            "INSERT INTO integration_logs (action, status, message, details) VALUES (?1, ?2, ?3, ?4)",
            params![action, status.as_str(), message, details],
        )?;
        Ok(())
    }

    /// Best-effort variant used on the sync path: a failure to write the
    /// audit entry is reported through tracing and never aborts the caller.
    pub async fn log_integration(
        &self,
        action: &str,
        status: LogStatus,
        message: &str,
        details: Option<Value>,
    ) {
        if let Err(e) = self
            .append_integration_log(action, status, message, details.as_ref())
            .await
        {
            warn!("Failed to record integration log entry '{}': {}", action, e);
        }
    }

    /// Most recent entries first.
    pub async fn list_integration_logs(&self, limit: usize) -> Result<Vec<IntegrationLogRecord>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT id, action, status, message, details, created_at FROM integration_logs
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            let details: Option<String> = row.get(4)?;
            Ok(IntegrationLogRecord {
                id: row.get(0)?,
                action: row.get(1)?,
                status: row.get(2)?,
                message: row.get(3)?,
                details: details.and_then(|d| serde_json::from_str(&d).ok()),
                created_at: row.get(5)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::test_lead_store;
    use serde_json::json;

    #[tokio::test]
    async fn newest_entries_come_first() {
        let store = test_lead_store().await;
        store
            .log_integration("sync_leads", LogStatus::Info, "first", None)
            .await;
        store
            .log_integration(
                "sync_leads",
                LogStatus::Error,
                "second",
                Some(json!({"status": 400})),
            )
            .await;

        let logs = store.list_integration_logs(10).await.unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].message, "second");
        assert_eq!(logs[0].status, "error");
        assert_eq!(logs[0].details, Some(json!({"status": 400})));
        assert!(logs[1].details.is_none());

        assert_eq!(store.list_integration_logs(1).await.unwrap().len(), 1);
    }
}
