use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::AppState;

fn is_loopback(host: &str) -> bool {
    matches!(host, "127.0.0.1" | "::1" | "localhost")
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "success": false, "error": message })),
    )
        .into_response()
}

/// Bearer-token gate. With no token issued yet the API is open on loopback
/// only; once a token exists every request must present a valid one.
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let any_tokens = match state.store.has_any_api_tokens().await {
        Ok(any) => any,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    if !any_tokens {
        if is_loopback(&state.api_host) {
            return next.run(req).await;
        }
        return unauthorized(
            "No API tokens configured. Run 'leadflow token create <name>' before exposing the API on a non-loopback address.",
        );
    }

    let raw_token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());

    let Some(raw_token) = raw_token else {
        return unauthorized("Missing or invalid Authorization header. Use: Bearer <token>");
    };

    match state.store.validate_api_token(&raw_token).await {
        Ok(true) => next.run(req).await,
        _ => unauthorized("Invalid API token"),
    }
}
