use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub active: bool,
    pub accepts_leads: bool,
    pub can_access_reports: bool,
    pub created_at: String,
}

impl BrokerRecord {
    /// Only active brokers that opted in to receiving leads take part in a rotation.
    pub fn is_eligible(&self) -> bool {
        self.active && self.accepts_leads
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBroker {
    pub username: String,
    pub email: String,
    #[serde(default = "default_true")]
    pub accepts_leads: bool,
    #[serde(default)]
    pub can_access_reports: bool,
}

/// Partial update of a broker's flags; `None` leaves the flag unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrokerFlags {
    pub active: Option<bool>,
    pub accepts_leads: Option<bool>,
    pub can_access_reports: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    pub fn from_status(value: &str) -> Option<Self> {
        match value {
            "new" => Some(LeadStatus::New),
            "contacted" => Some(LeadStatus::Contacted),
            "converted" => Some(LeadStatus::Converted),
            "lost" => Some(LeadStatus::Lost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadRecord {
    pub id: i64,
    pub external_id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub message: String,
    pub status: LeadStatus,
    pub broker_id: Option<i64>,
    pub notes: Option<String>,
    pub follow_up_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl LeadRecord {
    pub fn is_assigned(&self) -> bool {
        self.broker_id.is_some()
    }
}

/// Lead as it is about to be inserted. `external_id` is `None` for leads
/// created by hand rather than imported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewLead {
    #[serde(default)]
    pub external_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// Broker-side edit of a lead. Mirrors a full form submission: notes and the
/// follow-up date are overwritten, an absent follow-up date clears it.
#[derive(Debug, Clone, Deserialize)]
pub struct LeadUpdate {
    pub status: LeadStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub follow_up_date: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub broker_id: Option<i64>,
    pub status: Option<LeadStatus>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentRecord {
    pub id: i64,
    pub lead_id: i64,
    pub broker_id: i64,
    pub assignment_order: Option<i64>,
    pub assigned_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStatus {
    Success,
    Error,
    Warning,
    Info,
}

impl LogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
            LogStatus::Warning => "warning",
            LogStatus::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IntegrationLogRecord {
    pub id: i64,
    pub action: String,
    pub status: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceConfigRecord {
    pub page_id: Option<String>,
    pub active: bool,
    pub last_sync: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiTokenRecord {
    pub id: String,
    pub name: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokerNotifications {
    pub new_leads: i64,
    pub follow_ups_due: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_leads: i64,
    pub total_brokers: i64,
    pub active_brokers: i64,
    pub status_counts: Vec<(String, i64)>,
    pub last_sync: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrokerPerformance {
    pub broker_id: i64,
    pub username: String,
    pub email: String,
    pub total_leads: i64,
    pub converted: i64,
    pub lost: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentAssignment {
    pub lead_id: i64,
    pub lead_name: String,
    pub broker_id: i64,
    pub broker_username: String,
    pub assigned_at: String,
}
