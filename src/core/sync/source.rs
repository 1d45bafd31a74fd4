use async_trait::async_trait;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Value, json};
use thiserror::Error;

/// What a sync run needs to talk to the lead source: the bound page and
/// the credentials read from the vault.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub page_id: String,
    pub access_token: String,
    /// When present every request is signed with `appsecret_proof`.
    pub app_secret: Option<String>,
}

/// A lead form or any other grouping the source files leads under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadContainer {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeadField {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "scalar_values")]
    pub values: Vec<String>,
}

/// Form answers arrive as strings, but numeric inputs (phone numbers, ages)
/// are sometimes sent as JSON numbers.
fn scalar_values<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|value| match value {
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            other => Err(D::Error::custom(format!(
                "unsupported field value {}",
                other
            ))),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalLead {
    /// `None` when the source omitted the identifier; such leads are
    /// imported every time they are seen.
    pub external_id: Option<String>,
    pub created_time: Option<String>,
    pub fields: Vec<LeadField>,
}

/// One page of results plus the cursor for the next one, if any.
/// `rejected` holds entries of this page that could not be decoded; the
/// rest of the page is still usable.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub rejected: Vec<SourceError>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next: None,
            rejected: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("request timed out")]
    Timeout,
    #[error("lead source answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl SourceError {
    /// Structured form kept in the integration log `details` column.
    pub fn details(&self) -> Value {
        match self {
            SourceError::Timeout => json!({ "kind": "timeout" }),
            SourceError::Status { status, body } => {
                json!({ "kind": "status", "status": status, "body": body })
            }
            SourceError::Transport(e) => json!({ "kind": "transport", "error": e }),
            SourceError::Decode(e) => json!({ "kind": "decode", "error": e }),
        }
    }
}

/// Remote system the leads are pulled from. Implementations return one
/// page per call; the orchestrator decides how far to follow `next`.
#[async_trait]
pub trait LeadSource: Send + Sync {
    async fn list_containers(
        &self,
        settings: &SourceSettings,
        after: Option<&str>,
    ) -> Result<Page<LeadContainer>, SourceError>;

    async fn list_lead_items(
        &self,
        container_id: &str,
        settings: &SourceSettings,
        after: Option<&str>,
    ) -> Result<Page<ExternalLead>, SourceError>;

    /// Display name of the configured page; doubles as a connectivity check.
    async fn describe_page(&self, settings: &SourceSettings) -> Result<String, SourceError>;
}
