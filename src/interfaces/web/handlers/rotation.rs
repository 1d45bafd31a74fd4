use axum::{Json, extract::State};
use serde_json::{Value, json};

use super::failure;
use crate::core::distribution::RotationConfig;
use crate::interfaces::web::AppState;

pub async fn get_rotation(State(state): State<AppState>) -> Json<Value> {
    match state.distributor.rotation_state().await {
        Ok(rotation) => Json(json!({ "success": true, "rotation": rotation })),
        Err(e) => failure(e),
    }
}

pub async fn update_rotation(
    State(state): State<AppState>,
    Json(config): Json<RotationConfig>,
) -> Json<Value> {
    match state.distributor.update_rotation_config(&config).await {
        Ok(rotation) => Json(json!({ "success": true, "rotation": rotation })),
        Err(e) => failure(e),
    }
}

pub async fn distribute_pending(State(state): State<AppState>) -> Json<Value> {
    match state.distributor.distribute_pending().await {
        Ok(report) => Json(json!({ "success": true, "report": report })),
        Err(e) => failure(e),
    }
}
