use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::handlers::{brokers, leads, logs, reports, rotation, source, sync};
use super::{AppState, auth, sse_logs_endpoint};

fn build_localhost_cors(api_port: u16) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn build_api_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health))
        .layer(middleware::from_fn(security_headers));

    let authed_routes = Router::new()
        .route(
            "/api/brokers",
            get(brokers::list_brokers).post(brokers::create_broker),
        )
        .route(
            "/api/brokers/{id}",
            axum::routing::patch(brokers::update_broker).delete(brokers::delete_broker),
        )
        .route(
            "/api/brokers/{id}/notifications",
            get(brokers::broker_notifications),
        )
        .route("/api/leads", get(leads::list_leads).post(leads::create_lead))
        .route(
            "/api/leads/{id}",
            get(leads::get_lead).patch(leads::update_lead),
        )
        .route(
            "/api/rotation",
            get(rotation::get_rotation).put(rotation::update_rotation),
        )
        .route("/api/rotation/distribute", post(rotation::distribute_pending))
        .route(
            "/api/source",
            get(source::get_source).put(source::update_source),
        )
        .route("/api/source/test", post(source::test_source))
        .route("/api/sync", post(sync::trigger_sync))
        .route("/api/logs", get(logs::list_logs))
        .route("/api/logs/stream", get(sse_logs_endpoint))
        .route("/api/reports/dashboard", get(reports::dashboard))
        .route("/api/reports/brokers", get(reports::broker_performance))
        .route("/api/reports/assignments", get(reports::recent_assignments))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(middleware::from_fn(security_headers))
        .layer(build_localhost_cors(state.api_port));

    public_routes.merge(authed_routes).with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}
