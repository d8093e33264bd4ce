use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::crypto::{CredentialError, CredentialHasher};
use crate::auth::domain::repositories::{
    RefreshTokenRepository, UserRepository, is_duplicate_user,
};
use crate::auth::domain::user::{DEFAULT_ROLE, NewUser, User, UserId, UserIdentity};
use crate::auth::domain::value_objects::{
    NewRefreshToken, RefreshPolicy, RefreshTokenRecord,
};
use crate::auth::token::{AccessClaims, AccessTokenService, TokenError};
use crate::clock::Clock;

/// Message shown in place of any fatal error's details.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("All fields are required")]
    MissingRegistrationFields,
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("Refresh token is required")]
    MissingRefreshToken,
    #[error("Username or email already exists")]
    UserAlreadyExists,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Invalid or expired refresh token")]
    InvalidRefreshToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Refresh token not found")]
    RefreshTokenNotFound,
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    #[error("Background task failed: {0}")]
    Task(String),
    #[error("Refresh token lifetime puts expiry out of range")]
    ExpiryOutOfRange,
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// Missing or malformed input; the caller fixes the request.
    Validation,
    /// Bad credentials or an invalid/expired token. Always generic.
    Authentication,
    /// Duplicate username or email.
    Conflict,
    /// Referenced user or token vanished.
    NotFound,
    /// Backing store unavailable.
    Store,
    /// Hashing, signing or runtime fault.
    Internal,
}

impl AuthenticationError {
    pub fn kind(&self) -> AuthErrorKind {
        use AuthenticationError::*;
        match self {
            MissingRegistrationFields | MissingCredentials | MissingRefreshToken => {
                AuthErrorKind::Validation
            }
            InvalidCredentials | InvalidRefreshToken => AuthErrorKind::Authentication,
            UserAlreadyExists => AuthErrorKind::Conflict,
            UserNotFound | RefreshTokenNotFound => AuthErrorKind::NotFound,
            Storage(_) => AuthErrorKind::Store,
            Credential(_) | Token(_) | Task(_) | ExpiryOutOfRange => {
                AuthErrorKind::Internal
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), AuthErrorKind::Store | AuthErrorKind::Internal)
    }

    /// Text safe to show a caller: fatal errors never echo their cause.
    pub fn public_message(&self) -> String {
        if self.is_fatal() {
            INTERNAL_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        }
    }
}

/// Refresh-token behaviour, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    pub refresh_token_lifetime: Duration,
    pub refresh_policy: RefreshPolicy,
}

impl AuthSettings {
    pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_token_lifetime: Duration::days(Self::DEFAULT_REFRESH_TOKEN_DAYS),
            refresh_policy: RefreshPolicy::default(),
        }
    }
}

/// Tokens handed out by login and refresh.
#[derive(Clone)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
    /// Expiry of the access token.
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
    pub user: UserIdentity,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("expires_at", &self.expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

pub struct AuthenticationService {
    users: Arc<dyn UserRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    hasher: Arc<CredentialHasher>,
    tokens: Arc<AccessTokenService>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
}

impl fmt::Debug for AuthenticationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationService")
            .field("user_repo_refs", &Arc::strong_count(&self.users))
            .field(
                "refresh_repo_refs",
                &Arc::strong_count(&self.refresh_tokens),
            )
            .field("hasher", &self.hasher)
            .field("tokens", &self.tokens)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AuthenticationService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        hasher: Arc<CredentialHasher>,
        tokens: Arc<AccessTokenService>,
        clock: Arc<dyn Clock>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            hasher,
            tokens,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    /// Create an account. `role` defaults to `"User"`.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Option<&str>,
    ) -> Result<UserIdentity, AuthenticationError> {
        let username = username.trim();
        let email = email.trim();
        if username.is_empty() || email.is_empty() || password.is_empty() {
            return Err(AuthenticationError::MissingRegistrationFields);
        }

        if self.users.exists(username, email).await? {
            return Err(AuthenticationError::UserAlreadyExists);
        }

        let password_hash = self.hash_password(password).await?;
        let role = role
            .map(str::trim)
            .filter(|role| !role.is_empty())
            .unwrap_or(DEFAULT_ROLE);

        let new_user = NewUser {
            username: username.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            password_hash,
            created_at: self.clock.now(),
        };

        let user = match self.users.create(new_user).await {
            Ok(user) => user,
            // Lost a race with a concurrent registration.
            Err(err) if is_duplicate_user(&err) => {
                return Err(AuthenticationError::UserAlreadyExists);
            }
            Err(err) => return Err(err.into()),
        };

        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user.identity())
    }

    /// Verify a username/password pair and open a new session.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<SessionTokens, AuthenticationError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AuthenticationError::MissingCredentials);
        }

        let Some(user) = self.users.find_by_username(username).await? else {
            self.burn_verification(password).await?;
            debug!(%username, "login for unknown username");
            return Err(AuthenticationError::InvalidCredentials);
        };

        if !self.verify_password(password, &user.password_hash).await? {
            debug!(user_id = user.id, "login with wrong password");
            return Err(AuthenticationError::InvalidCredentials);
        }

        let issued = self.tokens.issue(&user)?;
        let now = self.clock.now();
        let expires_at = self.refresh_expiry(now)?;
        let record = self
            .refresh_tokens
            .create(NewRefreshToken {
                user_id: user.id,
                token: self.tokens.generate_refresh_value()?,
                expires_at,
                created_at: now,
            })
            .await?;

        info!(user_id = user.id, "user logged in");
        Ok(Self::session(&user, issued.token, issued.expires_at, record))
    }

    /// Exchange a refresh value for a new access token.
    ///
    /// Under [`RefreshPolicy::Rotate`] the returned refresh value is new and
    /// the presented one stops working; under [`RefreshPolicy::Touch`] the
    /// presented value is handed back.
    pub async fn refresh(
        &self,
        refresh_value: &str,
    ) -> Result<SessionTokens, AuthenticationError> {
        if refresh_value.is_empty() {
            return Err(AuthenticationError::MissingRefreshToken);
        }

        let now = self.clock.now();
        let record = match self.refresh_tokens.find_by_token(refresh_value).await? {
            Some(record) if !record.is_expired(now) => record,
            Some(record) => {
                debug!(token_id = record.id, "refresh with expired token");
                return Err(AuthenticationError::InvalidRefreshToken);
            }
            None => return Err(AuthenticationError::InvalidRefreshToken),
        };

        let Some(user) = self.users.find_by_id(record.user_id).await? else {
            warn!(user_id = record.user_id, "refresh token owner no longer exists");
            return Err(AuthenticationError::UserNotFound);
        };

        let issued = self.tokens.issue(&user)?;

        let record = match self.settings.refresh_policy {
            RefreshPolicy::Rotate => {
                let new_value = self.tokens.generate_refresh_value()?;
                let new_expires_at = self.refresh_expiry(now)?;
                let rotated = self
                    .refresh_tokens
                    .rotate(record.id, refresh_value, &new_value, new_expires_at, now)
                    .await?;
                if !rotated {
                    debug!(token_id = record.id, "refresh token was rotated concurrently");
                    return Err(AuthenticationError::InvalidRefreshToken);
                }
                RefreshTokenRecord {
                    token: new_value,
                    expires_at: new_expires_at,
                    updated_at: now,
                    ..record
                }
            }
            RefreshPolicy::Touch => {
                if !self.refresh_tokens.touch(record.id, now).await? {
                    return Err(AuthenticationError::InvalidRefreshToken);
                }
                RefreshTokenRecord {
                    updated_at: now,
                    ..record
                }
            }
        };

        debug!(user_id = user.id, policy = %self.settings.refresh_policy, "session refreshed");
        Ok(Self::session(&user, issued.token, issued.expires_at, record))
    }

    /// End the session the presented refresh value belongs to.
    pub async fn logout(&self, refresh_value: &str) -> Result<(), AuthenticationError> {
        if refresh_value.is_empty() {
            return Err(AuthenticationError::MissingRefreshToken);
        }

        let record = self
            .refresh_tokens
            .find_by_token(refresh_value)
            .await?
            .ok_or(AuthenticationError::RefreshTokenNotFound)?;

        if !self.refresh_tokens.delete(record.id).await? {
            return Err(AuthenticationError::RefreshTokenNotFound);
        }

        info!(user_id = record.user_id, token_id = record.id, "session logged out");
        Ok(())
    }

    /// Delete every refresh token of `user_id`. Administrative.
    pub async fn revoke_all_sessions(&self, user_id: UserId) -> Result<u64, AuthenticationError> {
        if self.users.find_by_id(user_id).await?.is_none() {
            return Err(AuthenticationError::UserNotFound);
        }

        let revoked = self.refresh_tokens.delete_by_user(user_id).await?;
        info!(user_id, revoked, "revoked all sessions");
        Ok(revoked)
    }

    /// Subject id of a valid access token.
    pub fn validate_access_token(&self, token: &str) -> Option<UserId> {
        self.tokens.validate(token)
    }

    pub fn decode_access_token(&self, token: &str) -> Option<AccessClaims> {
        self.tokens.decode_claims(token)
    }

    fn refresh_expiry(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AuthenticationError> {
        now.checked_add_signed(self.settings.refresh_token_lifetime)
            .ok_or(AuthenticationError::ExpiryOutOfRange)
    }

    fn session(
        user: &User,
        access_token: String,
        expires_at: DateTime<Utc>,
        record: RefreshTokenRecord,
    ) -> SessionTokens {
        SessionTokens {
            access_token,
            refresh_token: record.token,
            expires_at,
            refresh_expires_at: record.expires_at,
            user: user.identity(),
        }
    }

    async fn hash_password(&self, password: &str) -> Result<String, AuthenticationError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| AuthenticationError::Task(err.to_string()))?
            .map_err(AuthenticationError::from)
    }

    async fn verify_password(
        &self,
        password: &str,
        stored_hash: &str,
    ) -> Result<bool, AuthenticationError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let stored_hash = stored_hash.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
            .await
            .map_err(|err| AuthenticationError::Task(err.to_string()))
    }

    async fn burn_verification(&self, password: &str) -> Result<(), AuthenticationError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_dummy(&password))
            .await
            .map_err(|err| AuthenticationError::Task(err.to_string()))
    }
}
