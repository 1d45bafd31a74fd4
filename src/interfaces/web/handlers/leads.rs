use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::failure;
use crate::core::store::{LeadFilter, LeadStatus, LeadUpdate, NewLead};
use crate::interfaces::web::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LeadQuery {
    pub broker_id: Option<i64>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub async fn list_leads(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> Json<Value> {
    let status = match query.status.as_deref() {
        Some(raw) => match LeadStatus::from_status(raw) {
            Some(status) => Some(status),
            None => return failure(format!("Unknown lead status '{}'", raw)),
        },
        None => None,
    };
    let filter = LeadFilter {
        broker_id: query.broker_id,
        status,
        limit: query.limit,
    };
    match state.store.list_leads(&filter).await {
        Ok(leads) => Json(json!({ "success": true, "leads": leads })),
        Err(e) => failure(e),
    }
}

/// Create a lead by hand and hand it to the rotation straight away.
pub async fn create_lead(
    State(state): State<AppState>,
    Json(mut payload): Json<NewLead>,
) -> Json<Value> {
    payload.external_id = None;
    let lead = match state.store.insert_lead(&payload).await {
        Ok(Some(lead)) => lead,
        Ok(None) => return failure("Lead already exists"),
        Err(e) => return failure(e),
    };
    let distribution = match state.distributor.distribute(std::slice::from_ref(&lead)).await {
        Ok(report) => report,
        Err(e) => return failure(e),
    };
    match state.store.get_lead(lead.id).await {
        Ok(current) => Json(json!({
            "success": true,
            "lead": current,
            "distribution": distribution,
        })),
        Err(e) => failure(e),
    }
}

pub async fn get_lead(Path(id): Path<i64>, State(state): State<AppState>) -> Json<Value> {
    match state.store.get_lead(id).await {
        Ok(Some(lead)) => match state.store.list_assignments_for_lead(id).await {
            Ok(assignments) => Json(json!({
                "success": true,
                "lead": lead,
                "assignments": assignments,
            })),
            Err(e) => failure(e),
        },
        Ok(None) => failure(format!("Lead {} not found", id)),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    /// Acting broker; when present the lead must be assigned to them.
    #[serde(default)]
    pub broker_id: Option<i64>,
    #[serde(flatten)]
    pub update: LeadUpdate,
}

pub async fn update_lead(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateLeadRequest>,
) -> Json<Value> {
    match state
        .store
        .update_lead(id, payload.broker_id, &payload.update)
        .await
    {
        Ok(Some(lead)) => Json(json!({ "success": true, "lead": lead })),
        Ok(None) => failure(format!("Lead {} not found or not assigned to you", id)),
        Err(e) => failure(e),
    }
}
