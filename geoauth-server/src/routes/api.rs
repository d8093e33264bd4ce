use axum::{
    Router, middleware,
    routing::{delete, get, post},
};

use crate::{
    AppState,
    auth::{
        handlers,
        middleware::{auth_middleware, require_admin},
    },
    handlers::diagnostics,
};

pub const AUTH_BASE: &str = "/api/auth";
pub const TEST_BASE: &str = "/api/test";

pub fn create_auth_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .merge(create_admin_auth_routes(state))
}

/// Session administration; bearer token with the `Admin` role required.
fn create_admin_auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/users/{user_id}/sessions",
            delete(handlers::revoke_user_sessions),
        )
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state, auth_middleware))
}

pub fn create_test_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/protected", get(diagnostics::protected))
        .route("/check-role", get(diagnostics::check_role))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin = Router::new()
        .route("/admin", get(diagnostics::admin))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/public", get(diagnostics::public))
        .merge(protected)
        .merge(admin)
}
