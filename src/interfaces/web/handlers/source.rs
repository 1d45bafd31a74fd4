use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use super::failure;
use crate::core::vault::{META_API_TOKEN, META_APP_SECRET};
use crate::interfaces::web::AppState;

pub async fn get_source(State(state): State<AppState>) -> Json<Value> {
    let config = match state.store.get_source_config().await {
        Ok(config) => config,
        Err(e) => return failure(e),
    };
    let token_set = match state.vault.get_non_empty(META_API_TOKEN).await {
        Ok(token) => token.is_some(),
        Err(e) => return failure(e),
    };
    Json(json!({
        "success": true,
        "source": config,
        "api_token_set": token_set,
    }))
}

/// Source settings update. Credentials are optional so the page can be
/// rebound without re-entering the token; they are never echoed back.
#[derive(Debug, Deserialize)]
pub struct UpdateSourceRequest {
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub app_secret: Option<String>,
}

pub async fn update_source(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSourceRequest>,
) -> Json<Value> {
    if let Some(token) = payload.api_token.as_deref()
        && let Err(e) = state.vault.set_secret(META_API_TOKEN, token.trim()).await
    {
        return failure(e);
    }
    if let Some(secret) = payload.app_secret.as_deref()
        && let Err(e) = state.vault.set_secret(META_APP_SECRET, secret.trim()).await
    {
        return failure(e);
    }
    match state
        .store
        .save_source_config(payload.page_id.as_deref(), payload.active)
        .await
    {
        Ok(()) => Json(json!({ "success": true, "message": "Source configuration saved" })),
        Err(e) => failure(e),
    }
}

pub async fn test_source(State(state): State<AppState>) -> Json<Value> {
    match state.orchestrator.test_connection().await {
        Ok(page_name) => Json(json!({ "success": true, "page_name": page_name })),
        Err(e) => failure(e),
    }
}
