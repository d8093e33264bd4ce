//! Claims-based access decisions
//!
//! Pure functions over already-validated [`AccessClaims`]; nothing here
//! touches request state or the stores.

use serde::{Deserialize, Serialize};

use crate::auth::domain::user::{ADMIN_ROLE, DEFAULT_ROLE, UserId};
use crate::auth::token::AccessClaims;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// No valid token, or one without a usable subject.
    Unauthenticated,
    /// Authenticated, but the token lacks the required role.
    MissingRole { required: String },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

/// Allow any caller holding valid claims with a numeric subject.
pub fn require_authenticated(claims: Option<&AccessClaims>) -> AccessDecision {
    match claims.and_then(AccessClaims::user_id) {
        Some(_) => AccessDecision::Allow,
        None => AccessDecision::Deny(DenyReason::Unauthenticated),
    }
}

/// Allow only callers whose role claim equals `required` exactly.
pub fn require_role(claims: &AccessClaims, required: &str) -> AccessDecision {
    if let AccessDecision::Deny(reason) = require_authenticated(Some(claims)) {
        return AccessDecision::Deny(reason);
    }

    if claims.effective_role() == Some(required) {
        AccessDecision::Allow
    } else {
        AccessDecision::Deny(DenyReason::MissingRole {
            required: required.to_string(),
        })
    }
}

/// Role membership summary echoed by the diagnostic endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleReport {
    pub user_id: Option<UserId>,
    pub username: String,
    pub role: Option<String>,
    pub is_admin: bool,
    pub is_user: bool,
}

pub fn role_report(claims: &AccessClaims) -> RoleReport {
    let role = claims.effective_role();
    RoleReport {
        user_id: claims.user_id(),
        username: claims.unique_name.clone(),
        role: role.map(str::to_string),
        is_admin: role == Some(ADMIN_ROLE),
        is_user: role == Some(DEFAULT_ROLE),
    }
}
