use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::failure;
use crate::interfaces::web::AppState;

pub async fn dashboard(State(state): State<AppState>) -> Json<Value> {
    match state.store.dashboard_stats().await {
        Ok(stats) => Json(json!({ "success": true, "stats": stats })),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_days() -> u32 {
    30
}

pub async fn broker_performance(
    State(state): State<AppState>,
    Query(query): Query<PerformanceQuery>,
) -> Json<Value> {
    match state.store.broker_performance(query.days).await {
        Ok(brokers) => Json(json!({ "success": true, "days": query.days, "brokers": brokers })),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent")]
    pub limit: usize,
}

fn default_recent() -> usize {
    20
}

pub async fn recent_assignments(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Value> {
    match state.store.recent_assignments(query.limit.min(200)).await {
        Ok(assignments) => Json(json!({ "success": true, "assignments": assignments })),
        Err(e) => failure(e),
    }
}
