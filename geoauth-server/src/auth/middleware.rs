use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use geoauth_core::auth::{
    ADMIN_ROLE, AccessClaims,
    policy::{self, AccessDecision, DenyReason},
};

use crate::infra::{app_state::AppState, errors::AppError};

const AUTHENTICATION_REQUIRED: &str = "Authentication required";

/// Validate the bearer token and attach its [`AccessClaims`] to the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::unauthorized(AUTHENTICATION_REQUIRED))?;

    let claims = state.auth().decode_access_token(token);
    if let AccessDecision::Deny(reason) =
        policy::require_authenticated(claims.as_ref())
    {
        debug!(?reason, "rejected bearer token");
        return Err(AppError::unauthorized(AUTHENTICATION_REQUIRED));
    }

    if let Some(claims) = claims {
        request.extensions_mut().insert(claims);
    }
    Ok(next.run(request).await)
}

/// Reject callers without the `Admin` role. Must run after
/// [`auth_middleware`].
pub async fn require_admin(
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = request
        .extensions()
        .get::<AccessClaims>()
        .ok_or_else(|| AppError::unauthorized(AUTHENTICATION_REQUIRED))?;

    match policy::require_role(claims, ADMIN_ROLE) {
        AccessDecision::Allow => Ok(next.run(request).await),
        AccessDecision::Deny(DenyReason::Unauthenticated) => {
            Err(AppError::unauthorized(AUTHENTICATION_REQUIRED))
        }
        AccessDecision::Deny(DenyReason::MissingRole { required }) => {
            debug!(
                user = %claims.unique_name,
                required = %required,
                "role check failed"
            );
            Err(AppError::forbidden(format!("{required} role required")))
        }
    }
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
