pub mod brokers;
pub mod leads;
pub mod logs;
pub mod reports;
pub mod rotation;
pub mod source;
pub mod sync;

use axum::Json;
use serde_json::{Value, json};

pub(super) fn failure(error: impl std::fmt::Display) -> Json<Value> {
    Json(json!({ "success": false, "error": error.to_string() }))
}
