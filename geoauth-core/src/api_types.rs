use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::domain::services::{AuthenticationError, SessionTokens};
use crate::auth::domain::user::{UserId, UserIdentity};

// ===== Request Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Validation errors for registration input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Username must be between 3 and 100 characters")]
    InvalidUsername,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Email must not exceed 255 characters")]
    EmailTooLong,

    #[error("Password must be at least 6 characters")]
    PasswordTooShort,

    #[error("Password must not exceed 100 characters")]
    PasswordTooLong,
}

impl RegisterRequest {
    /// Validate registration request.
    ///
    /// Blank fields pass here and are rejected by the orchestrator with its
    /// own "all fields required" error.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.username.trim().is_empty()
            || self.email.trim().is_empty()
            || self.password.is_empty()
        {
            return Ok(());
        }

        // Username: 3-100 chars
        let username_len = self.username.trim().chars().count();
        if !(3..=100).contains(&username_len) {
            return Err(ValidationError::InvalidUsername);
        }

        let email = self.email.trim();
        if email.chars().count() > 255 {
            return Err(ValidationError::EmailTooLong);
        }
        if !is_plausible_email(email) {
            return Err(ValidationError::InvalidEmail);
        }

        // Password: 6-100 chars
        let password_len = self.password.chars().count();
        if password_len < 6 {
            return Err(ValidationError::PasswordTooShort);
        }
        if password_len > 100 {
            return Err(ValidationError::PasswordTooLong);
        }

        Ok(())
    }
}

/// Exactly one `@` with something on both sides and no whitespace.
fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Body of both the refresh and the logout calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

// ===== Response Types =====

/// Outcome of login and refresh. Callers branch on `success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LoginResponse {
    pub fn from_result(result: &Result<SessionTokens, AuthenticationError>) -> Self {
        match result {
            Ok(session) => Self {
                success: true,
                token: Some(session.access_token.clone()),
                refresh_token: Some(session.refresh_token.clone()),
                expires_at: Some(session.expires_at),
                message: Some("Login successful".to_string()),
            },
            Err(err) => Self {
                success: false,
                token: None,
                refresh_token: None,
                expires_at: None,
                message: Some(failure_message(err)),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl RegisterResponse {
    pub fn from_result(result: &Result<UserIdentity, AuthenticationError>) -> Self {
        match result {
            Ok(identity) => Self {
                success: true,
                message: "User registered successfully".to_string(),
                user_id: Some(identity.id),
                username: Some(identity.username.clone()),
                email: Some(identity.email.clone()),
            },
            Err(err) => Self::failure(failure_message(err)),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            user_id: None,
            username: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

impl LogoutResponse {
    pub fn from_result(result: &Result<(), AuthenticationError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                message: "Logout successful".to_string(),
            },
            Err(err) => Self {
                success: false,
                message: failure_message(err),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeSessionsResponse {
    pub success: bool,
    pub message: String,
    pub revoked: u64,
}

impl RevokeSessionsResponse {
    pub fn from_result(result: &Result<u64, AuthenticationError>) -> Self {
        match result {
            Ok(revoked) => Self {
                success: true,
                message: format!("Revoked {revoked} session(s)"),
                revoked: *revoked,
            },
            Err(err) => Self {
                success: false,
                message: failure_message(err),
                revoked: 0,
            },
        }
    }
}

fn failure_message(err: &AuthenticationError) -> String {
    if err.is_fatal() {
        error!(error = %err, "authentication request failed");
    }
    err.public_message()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            role: None,
        }
    }

    #[test]
    fn registration_bounds() {
        assert!(request("alice", "a@x.com", "secret1").validate().is_ok());
        assert_eq!(
            request("al", "a@x.com", "secret1").validate(),
            Err(ValidationError::InvalidUsername)
        );
        assert_eq!(
            request(&"a".repeat(101), "a@x.com", "secret1").validate(),
            Err(ValidationError::InvalidUsername)
        );
        assert_eq!(
            request("alice", "a@x.com", "12345").validate(),
            Err(ValidationError::PasswordTooShort)
        );
        assert_eq!(
            request("alice", "a@x.com", &"p".repeat(101)).validate(),
            Err(ValidationError::PasswordTooLong)
        );
        let long_email = format!("{}@x.com", "a".repeat(250));
        assert_eq!(
            request("alice", &long_email, "secret1").validate(),
            Err(ValidationError::EmailTooLong)
        );
    }

    #[test]
    fn email_shape() {
        for bad in ["no-at-sign", "@x.com", "a@", "a@@x.com", "a b@x.com", "a@.x"] {
            assert_eq!(
                request("alice", bad, "secret1").validate(),
                Err(ValidationError::InvalidEmail),
                "{bad}"
            );
        }
    }

    #[test]
    fn blank_fields_are_left_to_the_orchestrator() {
        assert!(request("", "", "").validate().is_ok());
    }

    #[test]
    fn fatal_errors_do_not_leak_details() {
        let result: Result<SessionTokens, _> = Err(AuthenticationError::Storage(
            anyhow::anyhow!("password authentication failed for user geo"),
        ));
        let response = LoginResponse::from_result(&result);
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("An internal error occurred"));
    }

    #[test]
    fn login_response_uses_camel_case() {
        let response = LoginResponse::from_result(&Err(AuthenticationError::InvalidCredentials));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid username or password");
        assert!(json.get("refreshToken").is_none());
    }
}
