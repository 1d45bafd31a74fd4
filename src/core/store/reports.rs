use anyhow::Result;
use rusqlite::params;

use super::LeadStore;
use super::types::{BrokerPerformance, DashboardStats, RecentAssignment};

impl LeadStore {
    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let db = self.db.lock().await;
        let total_leads: i64 = db.query_row("SELECT COUNT(*) FROM leads", [], |row| row.get(0))?;
        let (total_brokers, active_brokers): (i64, i64) = db.query_row(
            "SELECT COUNT(*), COALESCE(SUM(active), 0) FROM brokers",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt =
            db.prepare("SELECT status, COUNT(*) FROM leads GROUP BY status ORDER BY status")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut status_counts = Vec::new();
        for row in rows {
            status_counts.push(row?);
        }

        let last_sync: Option<String> = db.query_row(
            "SELECT last_sync FROM source_config WHERE id = 1",
            [],
            |row| row.get(0),
        )?;

        Ok(DashboardStats {
            total_leads,
            total_brokers,
            active_brokers,
            status_counts,
            last_sync,
        })
    }

    /// Per-broker outcome counts for leads created within the last `days` days.
    pub async fn broker_performance(&self, days: u32) -> Result<Vec<BrokerPerformance>> {
        let window = format!("-{} days", days);
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT b.id, b.username, b.email,
                    COUNT(l.id),
                    COALESCE(SUM(CASE WHEN l.status = 'converted' THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN l.status = 'lost' THEN 1 ELSE 0 END), 0)
             FROM brokers b
             LEFT JOIN leads l ON l.broker_id = b.id AND l.created_at >= datetime('now', ?1)
             GROUP BY b.id
             ORDER BY b.id ASC",
        )?;
        let rows = stmt.query_map(params![window], |row| {
            let total_leads: i64 = row.get(3)?;
            let converted: i64 = row.get(4)?;
            Ok(BrokerPerformance {
                broker_id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                total_leads,
                converted,
                lost: row.get(5)?,
                conversion_rate: if total_leads > 0 {
                    converted as f64 * 100.0 / total_leads as f64
                } else {
                    0.0
                },
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub async fn recent_assignments(&self, limit: usize) -> Result<Vec<RecentAssignment>> {
        let db = self.db.lock().await;
        let mut stmt = db.prepare(
            "SELECT a.lead_id, l.name, a.broker_id, b.username, a.assigned_at
             FROM lead_assignments a
             JOIN leads l ON l.id = a.lead_id
             JOIN brokers b ON b.id = a.broker_id
             ORDER BY a.assigned_at DESC, a.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(RecentAssignment {
                lead_id: row.get(0)?,
                lead_name: row.get(1)?,
                broker_id: row.get(2)?,
                broker_username: row.get(3)?,
                assigned_at: row.get(4)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
