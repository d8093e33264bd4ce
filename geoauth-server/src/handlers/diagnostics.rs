//! Endpoints for checking what the server makes of a bearer token.

use axum::{Extension, Json};
use serde::Serialize;
use serde_json::Value;

use geoauth_core::auth::{
    AccessClaims, UserId,
    policy::{self, RoleReport},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimsEcho {
    pub message: &'static str,
    pub user_id: Option<UserId>,
    pub role: Option<String>,
    pub claims: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCheck {
    pub message: &'static str,
    #[serde(flatten)]
    pub report: RoleReport,
    pub claims: Value,
}

pub async fn ping() -> &'static str {
    "pong"
}

pub async fn public() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "This is a public endpoint - no authentication required",
    })
}

pub async fn protected(
    Extension(claims): Extension<AccessClaims>,
) -> Json<ClaimsEcho> {
    Json(echo(
        "This is a protected endpoint - authentication required",
        &claims,
    ))
}

pub async fn check_role(
    Extension(claims): Extension<AccessClaims>,
) -> Json<RoleCheck> {
    Json(RoleCheck {
        message: "Role check endpoint - shows how the server sees your role claims",
        report: policy::role_report(&claims),
        claims: claims_value(&claims),
    })
}

pub async fn admin(
    Extension(claims): Extension<AccessClaims>,
) -> Json<ClaimsEcho> {
    Json(echo("This is an admin-only endpoint", &claims))
}

fn echo(message: &'static str, claims: &AccessClaims) -> ClaimsEcho {
    ClaimsEcho {
        message,
        user_id: claims.user_id(),
        role: claims.effective_role().map(str::to_string),
        claims: claims_value(claims),
    }
}

fn claims_value(claims: &AccessClaims) -> Value {
    serde_json::to_value(claims).unwrap_or(Value::Null)
}
