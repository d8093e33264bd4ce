mod api;

use axum::Router;

use crate::AppState;

pub use api::{AUTH_BASE, TEST_BASE};

/// Mount the authentication and diagnostic routes under `/api`.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest(AUTH_BASE, api::create_auth_router(state.clone()))
        .nest(TEST_BASE, api::create_test_router(state))
}
