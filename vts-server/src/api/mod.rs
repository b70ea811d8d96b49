//! REST API
//!
//! All routes live under `/api` except `/health`. Protected routes pull an
//! [`AuthSession`](crate::auth::AuthSession) from the bearer token; the
//! login and health routes are the only unauthenticated surface.

pub mod auth;
pub mod catalog;
pub mod events;
pub mod transfer;
pub mod violations;

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(violations::router())
        .merge(catalog::router())
        .merge(transfer::router())
        .merge(events::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "vts-server",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.started_at.elapsed().as_secs(),
    }))
}
