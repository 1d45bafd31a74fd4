use anyhow::Result;
use async_trait::async_trait;
use hmac::Mac;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::Duration;

use super::source::{
    ExternalLead, LeadContainer, LeadField, LeadSource, Page, SourceError, SourceSettings,
};

const MAX_ERROR_BODY: usize = 512;

type HmacSha256 = hmac::Hmac<Sha256>;

/// Graph `appsecret_proof`: hex HMAC-SHA256 of the access token keyed by the
/// app secret.
fn appsecret_proof(app_secret: &str, access_token: &str) -> Option<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(app_secret.as_bytes()).ok()?;
    mac.update(access_token.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

// ── Graph API wire format ──

#[derive(Deserialize)]
struct Listing<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Deserialize)]
struct Paging {
    #[serde(default)]
    cursors: Option<Cursors>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct Cursors {
    #[serde(default)]
    after: Option<String>,
}

#[derive(Deserialize)]
struct FormEntry {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct LeadEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
    #[serde(default)]
    field_data: Vec<LeadField>,
}

#[derive(Deserialize)]
struct PageEntry {
    #[serde(default)]
    name: Option<String>,
    id: String,
}

impl<T> Listing<T> {
    /// The `after` cursor only means something when Graph also sent a
    /// `next` link; the last page carries cursors but no link.
    /// Entries `map` rejects are collected instead of failing the page.
    fn into_page<U>(self, mut map: impl FnMut(T) -> Result<U, SourceError>) -> Page<U> {
        let next = self.paging.and_then(|p| match p.next {
            Some(_) => p.cursors.and_then(|c| c.after),
            None => None,
        });
        let mut items = Vec::with_capacity(self.data.len());
        let mut rejected = Vec::new();
        for entry in self.data {
            match map(entry) {
                Ok(item) => items.push(item),
                Err(e) => rejected.push(e),
            }
        }
        Page {
            items,
            next,
            rejected,
        }
    }
}

// ── Client ──

/// Lead source backed by the Meta Graph API lead-ads endpoints.
pub struct MetaGraphSource {
    client: Client,
    base_url: String,
    request_timeout: Duration,
    test_timeout: Duration,
}

impl MetaGraphSource {
    pub fn new(base_url: &str, request_timeout: Duration, test_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("leadflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout,
            test_timeout,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        settings: &SourceSettings,
        timeout: Duration,
    ) -> Result<T, SourceError> {
        let url = format!("{}/{}", self.base_url, path);
        let mut req = self
            .client
            .get(&url)
            .query(query)
            .query(&[("access_token", settings.access_token.as_str())]);
        if let Some(proof) = settings
            .app_secret
            .as_deref()
            .and_then(|secret| appsecret_proof(secret, &settings.access_token))
        {
            req = req.query(&[("appsecret_proof", proof.as_str())]);
        }
        let res = req
            .timeout(timeout)
            .send()
            .await
            .map_err(map_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(map_transport)?;
        if !status.is_success() {
            let mut body = body;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| SourceError::Decode(e.to_string()))
    }
}

fn map_transport(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Transport(e.to_string())
    }
}

fn with_cursor<'a>(
    mut query: Vec<(&'a str, &'a str)>,
    after: Option<&'a str>,
) -> Vec<(&'a str, &'a str)> {
    if let Some(after) = after {
        query.push(("after", after));
    }
    query
}

#[async_trait]
impl LeadSource for MetaGraphSource {
    async fn list_containers(
        &self,
        settings: &SourceSettings,
        after: Option<&str>,
    ) -> Result<Page<LeadContainer>, SourceError> {
        let query = with_cursor(vec![("fields", "id,name")], after);
        let listing: Listing<FormEntry> = self
            .get_json(
                &format!("{}/leadgen_forms", settings.page_id),
                &query,
                settings,
                self.request_timeout,
            )
            .await?;
        Ok(listing.into_page(|f| {
            Ok(LeadContainer {
                id: f.id,
                name: f.name,
            })
        }))
    }

    async fn list_lead_items(
        &self,
        container_id: &str,
        settings: &SourceSettings,
        after: Option<&str>,
    ) -> Result<Page<ExternalLead>, SourceError> {
        let query = with_cursor(vec![("fields", "id,created_time,field_data")], after);
        // Entries are decoded one by one so a single malformed lead does not
        // hide the rest of the page.
        let listing: Listing<serde_json::Value> = self
            .get_json(
                &format!("{}/leads", container_id),
                &query,
                settings,
                self.request_timeout,
            )
            .await?;
        Ok(listing.into_page(|raw| {
            let hint = raw.get("id").and_then(|id| id.as_str()).map(str::to_string);
            let entry: LeadEntry = serde_json::from_value(raw).map_err(|e| match &hint {
                Some(id) => SourceError::Decode(format!("lead {}: {}", id, e)),
                None => SourceError::Decode(e.to_string()),
            })?;
            Ok(ExternalLead {
                external_id: entry.id.filter(|id| !id.is_empty()),
                created_time: entry.created_time,
                fields: entry.field_data,
            })
        }))
    }

    async fn describe_page(&self, settings: &SourceSettings) -> Result<String, SourceError> {
        let page: PageEntry = self
            .get_json(
                &settings.page_id,
                &[("fields", "name,id")],
                settings,
                self.test_timeout,
            )
            .await?;
        Ok(page.name.unwrap_or(page.id))
    }
}
