//! # geoauth Server
//!
//! HTTP front end for the geoauth authentication core.
//!
//! - `POST /api/auth/register`, `/login`, `/refresh`, `/logout`
//! - `DELETE /api/auth/users/{user_id}/sessions` (Admin only)
//! - `GET /api/test/*` diagnostic endpoints for bearer tokens and roles
//!
//! Requests carrying `Authorization: Bearer <token>` are validated by
//! [`auth::middleware::auth_middleware`]; the validated claims travel to
//! handlers as a request extension.

pub mod auth;
pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

use geoauth_config::CorsConfig;

/// Full application router with CORS and request tracing applied.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.config().cors);

    Router::new()
        .route("/ping", get(handlers::diagnostics::ping))
        .merge(routes::create_api_router(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(cors: &CorsConfig) -> CorsLayer {
    let allow_origin = if cors.is_wildcard_included() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %origin, "ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
