use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::failure;
use crate::interfaces::web::AppState;

/// Manual resync. Waits for a scheduled run in progress rather than skipping.
pub async fn trigger_sync(State(state): State<AppState>) -> Json<Value> {
    match state.orchestrator.sync_once().await {
        Ok(report) => Json(json!({ "success": true, "report": report })),
        Err(e) => failure(e),
    }
}
