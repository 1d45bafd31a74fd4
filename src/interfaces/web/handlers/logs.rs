use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::failure;
use crate::interfaces::web::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub limit: Option<usize>,
}

pub async fn list_logs(State(state): State<AppState>, Query(query): Query<LogQuery>) -> Json<Value> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    match state.store.list_integration_logs(limit).await {
        Ok(logs) => Json(json!({ "success": true, "logs": logs })),
        Err(e) => failure(e),
    }
}
