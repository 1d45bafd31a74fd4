use serde::{Deserialize, Serialize};

use crate::core::store::BrokerRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPolicy {
    #[default]
    RoundRobin,
    Manual,
}

impl RotationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RotationPolicy::RoundRobin => "round_robin",
            RotationPolicy::Manual => "manual",
        }
    }

    /// Accepts the stored form as well as the upper-case and dashed
    /// spellings operators tend to type.
    pub fn from_policy(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "round_robin" | "roundrobin" => Some(RotationPolicy::RoundRobin),
            "manual" => Some(RotationPolicy::Manual),
            _ => None,
        }
    }
}

/// The persisted rotation record. `cursor` indexes the eligible broker list
/// (round robin) or `broker_order` (manual).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationState {
    pub policy: RotationPolicy,
    pub broker_order: Vec<i64>,
    pub cursor: usize,
    /// Stored and reported only. Selection always skips brokers that are not
    /// both `active` and `accepts_leads`, whatever this is set to.
    pub skip_inactive: bool,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            policy: RotationPolicy::RoundRobin,
            broker_order: Vec::new(),
            cursor: 0,
            skip_inactive: true,
        }
    }
}

/// Operator-supplied replacement for the rotation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RotationConfig {
    pub policy: RotationPolicy,
    /// `None` keeps the stored order; `Some(vec![])` clears it.
    #[serde(default)]
    pub broker_order: Option<Vec<i64>>,
    /// Has no effect on selection; see [`RotationState::skip_inactive`].
    #[serde(default = "default_skip_inactive")]
    pub skip_inactive: bool,
}

fn default_skip_inactive() -> bool {
    true
}

/// Outcome of one selection step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub broker: BrokerRecord,
    /// Index into the list the cursor walks, recorded on the assignment.
    pub position: usize,
    pub next_cursor: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    /// `(lead_id, broker_id)` in processing order.
    pub assigned: Vec<(i64, i64)>,
    pub already_assigned: usize,
    pub unassigned: Vec<i64>,
}

impl DistributionReport {
    pub fn merge(&mut self, other: DistributionReport) {
        self.assigned.extend(other.assigned);
        self.already_assigned += other.already_assigned;
        self.unassigned.extend(other.unassigned);
    }
}
