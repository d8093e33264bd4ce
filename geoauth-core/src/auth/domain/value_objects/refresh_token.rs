use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::domain::user::UserId;

pub type RefreshTokenId = i64;

/// Persisted refresh credential.
#[derive(Clone, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for RefreshTokenRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshTokenRecord")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl RefreshTokenRecord {
    /// Expired from the instant `expires_at` is reached.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Refresh row to be inserted; the store assigns the id.
#[derive(Clone)]
pub struct NewRefreshToken {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for NewRefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewRefreshToken")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

impl NewRefreshToken {
    pub fn into_record(self, id: RefreshTokenId) -> RefreshTokenRecord {
        RefreshTokenRecord {
            id,
            user_id: self.user_id,
            token: self.token,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// What happens to a refresh row when it is exchanged for an access token.
///
/// The choice changes the wire contract: under `Rotate` every refresh
/// response carries a new value and the presented one stops working.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPolicy {
    /// Replace value and expiry in one conditional update.
    #[default]
    Rotate,
    /// Bump `updated_at` only and hand the same value back.
    Touch,
}

impl RefreshPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshPolicy::Rotate => "rotate",
            RefreshPolicy::Touch => "touch",
        }
    }
}

impl fmt::Display for RefreshPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown refresh policy '{0}' (expected 'rotate' or 'touch')")]
pub struct RefreshPolicyParseError(pub String);

impl FromStr for RefreshPolicy {
    type Err = RefreshPolicyParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rotate" => Ok(RefreshPolicy::Rotate),
            "touch" => Ok(RefreshPolicy::Touch),
            other => Err(RefreshPolicyParseError(other.to_string())),
        }
    }
}
