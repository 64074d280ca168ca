pub mod tenant_routes;

use crate::state::SharedState;
use axum::{
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn app(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any) // Restrict to specific origins in production
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    let api = Router::new()
        .route("/tenants/register", post(tenant_routes::register_tenant))
        .route("/tenants", get(tenant_routes::list_tenants))
        .route("/tenants/{id}", get(tenant_routes::get_tenant))
        .route("/tenants/{id}/jobs", get(tenant_routes::tenant_jobs))
        .with_state(state);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "hrplatform"
    }))
}
