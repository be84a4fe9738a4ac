//! HTTP surface for the authorization server.
//!
//! The router exposes the token endpoint, the scoped profile resource, and a
//! health probe. Consent and admin surfaces are external collaborators that
//! drive the library API directly.

pub mod handlers;

use std::sync::Arc;

use axum::{
    Json, Router,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::store::OAuthStore;

/// Shared state for HTTP handlers.
pub struct HttpState {
    pub store: OAuthStore,
    pub config: Config,
}

/// Create the HTTP router.
pub fn create_router(store: OAuthStore, config: Config) -> Router {
    let state = Arc::new(HttpState { store, config });

    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/oauth2/token", post(handlers::handle_token))
        .route("/api/v1/user", get(handlers::handle_user_info))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "campus-id",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
