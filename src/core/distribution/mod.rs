mod select;
pub mod types;

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::store::{CursorConflict, LeadRecord, LeadStore, LogStatus};

pub use select::{select_manual, select_round_robin};
pub use types::{DistributionReport, RotationConfig, RotationPolicy, RotationState, Selection};

const DISTRIBUTION_ACTION: &str = "lead_distribution";
const MAX_CURSOR_CONFLICTS: usize = 32;

/// Assigns unassigned leads to brokers according to the stored rotation.
///
/// Callers in this process (the sync timer, a manual resync, the API) are
/// serialized through `rotation_lock`. Other processes sharing the database
/// are kept apart by the compare-and-set cursor write in
/// [`LeadStore::assign_lead`], so no two leads ever take the same slot.
pub struct LeadDistributor {
    store: Arc<LeadStore>,
    rotation_lock: Mutex<()>,
}

impl LeadDistributor {
    pub fn new(store: Arc<LeadStore>) -> Self {
        Self {
            store,
            rotation_lock: Mutex::new(()),
        }
    }

    pub async fn rotation_state(&self) -> Result<RotationState> {
        self.store.load_rotation_state().await
    }

    /// Distribute `leads` in the given order. Leads that already have a broker
    /// are counted and skipped.
    pub async fn distribute(&self, leads: &[LeadRecord]) -> Result<DistributionReport> {
        if leads.is_empty() {
            return Ok(DistributionReport::default());
        }
        let _guard = self.rotation_lock.lock().await;
        self.distribute_locked(leads).await
    }

    /// Retry every lead still waiting for a broker, oldest first.
    pub async fn distribute_pending(&self) -> Result<DistributionReport> {
        let _guard = self.rotation_lock.lock().await;
        let pending = self.store.list_unassigned_leads().await?;
        if pending.is_empty() {
            info!("No unassigned leads to distribute");
            return Ok(DistributionReport::default());
        }
        info!("Distributing {} pending lead(s)", pending.len());
        self.distribute_locked(&pending).await
    }

    /// Replace the rotation settings. The cursor always restarts at 0.
    pub async fn update_rotation_config(&self, config: &RotationConfig) -> Result<RotationState> {
        let _guard = self.rotation_lock.lock().await;
        let mut state = self.store.load_rotation_state().await?;
        state.policy = config.policy;
        if let Some(order) = &config.broker_order {
            state.broker_order = order.clone();
        }
        state.skip_inactive = config.skip_inactive;
        state.cursor = 0;
        self.store.save_rotation_state(&state).await?;
        info!(
            "Rotation set to {} with order {:?}",
            state.policy.as_str(),
            state.broker_order
        );
        Ok(state)
    }

    async fn distribute_locked(&self, leads: &[LeadRecord]) -> Result<DistributionReport> {
        let mut report = DistributionReport::default();
        for lead in leads {
            self.distribute_one(lead.id, &mut report).await?;
        }
        Ok(report)
    }

    /// Select and assign a broker for one lead. The rotation state is read
    /// fresh for every attempt; a [`CursorConflict`] means another process
    /// moved the cursor first, so the lead is reselected from the new state.
    async fn distribute_one(&self, lead_id: i64, report: &mut DistributionReport) -> Result<()> {
        let mut conflicts = 0;
        loop {
            // The caller's copy may be stale; trust the row.
            let Some(current) = self.store.get_lead(lead_id).await? else {
                warn!("Lead {} vanished before distribution", lead_id);
                report.unassigned.push(lead_id);
                return Ok(());
            };
            if current.is_assigned() {
                report.already_assigned += 1;
                return Ok(());
            }

            let state = self.store.load_rotation_state().await?;
            let eligible = self.store.list_eligible_brokers().await?;
            let selection = match state.policy {
                RotationPolicy::Manual if !state.broker_order.is_empty() => {
                    select_manual(&state.broker_order, state.cursor, &eligible)
                }
                _ => select_round_robin(&eligible, state.cursor),
            };

            let Some(selection) = selection else {
                warn!("No eligible broker available for lead {}", lead_id);
                self.store
                    .log_integration(
                        DISTRIBUTION_ACTION,
                        LogStatus::Warning,
                        &format!("No eligible broker available for lead {}", lead_id),
                        Some(json!({ "lead_id": lead_id, "policy": state.policy.as_str() })),
                    )
                    .await;
                report.unassigned.push(lead_id);
                return Ok(());
            };

            let err = match self
                .store
                .assign_lead(
                    lead_id,
                    selection.broker.id,
                    selection.position,
                    state.cursor,
                    selection.next_cursor,
                )
                .await
            {
                Ok(_) => {
                    info!(
                        "Lead {} assigned to broker {} ({})",
                        lead_id, selection.broker.id, selection.broker.username
                    );
                    report.assigned.push((lead_id, selection.broker.id));
                    return Ok(());
                }
                Err(e) => e,
            };

            if err.downcast_ref::<CursorConflict>().is_some() && conflicts < MAX_CURSOR_CONFLICTS {
                conflicts += 1;
                debug!(
                    "Rotation cursor moved while assigning lead {}; reselecting",
                    lead_id
                );
                continue;
            }

            error!(
                "Assigning lead {} to broker {} failed: {}",
                lead_id, selection.broker.id, err
            );
            self.store
                .log_integration(
                    DISTRIBUTION_ACTION,
                    LogStatus::Error,
                    &format!("Failed to assign lead {}", lead_id),
                    Some(json!({
                        "lead_id": lead_id,
                        "broker_id": selection.broker.id,
                        "error": err.to_string(),
                    })),
                )
                .await;
            report.unassigned.push(lead_id);
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests;
