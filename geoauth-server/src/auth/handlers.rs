use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use tracing::warn;

use geoauth_core::{
    api_types::{
        LoginRequest, LoginResponse, LogoutResponse, RefreshTokenRequest,
        RegisterRequest, RegisterResponse, RevokeSessionsResponse,
    },
    auth::{ADMIN_ROLE, DEFAULT_ROLE, UserId, policy},
};

use crate::auth::middleware::bearer_token;
use crate::infra::{
    app_state::AppState,
    errors::{result_status, status_for},
};

/// Open registration. Roles other than `User` need an Admin bearer token
/// unless `allow_role_self_assignment` is set.
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> (StatusCode, Json<RegisterResponse>) {
    if let Err(err) = request.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse::failure(err.to_string())),
        );
    }

    if let Some(role) = privileged_role(request.role.as_deref())
        && !state.config().auth.allow_role_self_assignment
        && !caller_is_admin(&state, &headers)
    {
        warn!(username = %request.username, %role, "refused role self-assignment");
        return (
            StatusCode::FORBIDDEN,
            Json(RegisterResponse::failure(format!(
                "{ADMIN_ROLE} role required to assign role {role}"
            ))),
        );
    }

    let result = state
        .auth()
        .register(
            &request.username,
            &request.email,
            &request.password,
            request.role.as_deref(),
        )
        .await;

    (result_status(&result), Json(RegisterResponse::from_result(&result)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> (StatusCode, Json<LoginResponse>) {
    let result = state.auth().login(&request.username, &request.password).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(err) => {
            warn!(username = %request.username, reason = %err, "login rejected");
            status_for(err)
        }
    };

    (status, Json(LoginResponse::from_result(&result)))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> (StatusCode, Json<LoginResponse>) {
    let result = state.auth().refresh(&request.refresh_token).await;

    (result_status(&result), Json(LoginResponse::from_result(&result)))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(request): Json<RefreshTokenRequest>,
) -> (StatusCode, Json<LogoutResponse>) {
    let result = state.auth().logout(&request.refresh_token).await;

    (result_status(&result), Json(LogoutResponse::from_result(&result)))
}

/// Drop every refresh token of a user, signing them out everywhere.
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> (StatusCode, Json<RevokeSessionsResponse>) {
    let result = state.auth().revoke_all_sessions(user_id).await;

    (result_status(&result), Json(RevokeSessionsResponse::from_result(&result)))
}

fn privileged_role(requested: Option<&str>) -> Option<&str> {
    requested
        .map(str::trim)
        .filter(|role| !role.is_empty() && *role != DEFAULT_ROLE)
}

fn caller_is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    bearer_token(headers)
        .and_then(|token| state.auth().decode_access_token(token))
        .is_some_and(|claims| {
            policy::require_role(&claims, ADMIN_ROLE).is_allowed()
        })
}
