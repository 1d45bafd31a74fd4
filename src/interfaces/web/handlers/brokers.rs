use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use super::failure;
use crate::core::store::{BrokerFlags, NewBroker};
use crate::interfaces::web::AppState;

pub async fn list_brokers(State(state): State<AppState>) -> Json<Value> {
    match state.store.list_brokers().await {
        Ok(brokers) => Json(json!({ "success": true, "brokers": brokers })),
        Err(e) => failure(e),
    }
}

pub async fn create_broker(
    State(state): State<AppState>,
    Json(payload): Json<NewBroker>,
) -> Json<Value> {
    match state.store.create_broker(&payload).await {
        Ok(broker) => Json(json!({ "success": true, "broker": broker })),
        Err(e) => failure(e),
    }
}

pub async fn update_broker(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(flags): Json<BrokerFlags>,
) -> Json<Value> {
    match state.store.update_broker_flags(id, &flags).await {
        Ok(true) => match state.store.resolve_broker(id).await {
            Ok(broker) => Json(json!({ "success": true, "broker": broker })),
            Err(e) => failure(e),
        },
        Ok(false) => failure(format!("Broker {} not found", id)),
        Err(e) => failure(e),
    }
}

pub async fn delete_broker(Path(id): Path<i64>, State(state): State<AppState>) -> Json<Value> {
    match state.store.delete_broker(id).await {
        Ok(true) => Json(json!({ "success": true, "message": "Broker removed" })),
        Ok(false) => failure(format!("Broker {} not found", id)),
        Err(e) => failure(e),
    }
}

pub async fn broker_notifications(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Json<Value> {
    match state.store.broker_notifications(id).await {
        Ok(notifications) => Json(json!({ "success": true, "notifications": notifications })),
        Err(e) => failure(e),
    }
}
