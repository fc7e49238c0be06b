//! HTTP surface: connection lifecycle API, login routes, health.

pub mod auth;
pub mod connections;
pub mod error;

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::json;
use tower_cookies::CookieManagerLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub use error::{ApiError, ErrorResponse};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/organizations/{org_id}/sso/connections",
            post(connections::create_connection).get(connections::list_connections),
        )
        .route(
            "/organizations/{org_id}/sso/connections/{client_id}",
            axum::routing::patch(connections::update_connection)
                .delete(connections::delete_connection),
        )
        .route(
            "/organizations/{org_id}/sso/metadata",
            get(connections::sp_metadata),
        )
        .route("/auth/sso/authorize", get(auth::authorize))
        .route(
            "/auth/sso/callback",
            get(auth::saml_acs_get).post(auth::saml_acs_post),
        )
        .route("/auth/sso/oidc", get(auth::oidc_callback))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
