//! Storage ports for accounts and refresh tokens
//!
//! Lookups that find nothing return `Ok(None)`; `Err` is reserved for the
//! store itself failing.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::auth::domain::user::{NewUser, User, UserId};
use crate::auth::domain::value_objects::{
    NewRefreshToken, RefreshTokenId, RefreshTokenRecord,
};

/// Returned (inside `anyhow::Error`) when an insert collides with an
/// existing username or email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("username or email already exists")]
pub struct DuplicateUser;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Whether the username or the email is already taken.
    async fn exists(&self, username: &str, email: &str) -> Result<bool>;

    /// Insert a new account. Fails with [`DuplicateUser`] on a uniqueness
    /// violation.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Delete an account and, by cascade, all of its refresh tokens.
    async fn delete(&self, id: UserId) -> Result<bool>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn find_by_token(
        &self,
        token: &str,
    ) -> Result<Option<RefreshTokenRecord>>;

    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord>;

    async fn delete(&self, id: RefreshTokenId) -> Result<bool>;

    /// Delete every refresh token of a user; returns how many went.
    async fn delete_by_user(&self, user_id: UserId) -> Result<u64>;

    /// Replace value and expiry of row `id`, but only while it still holds
    /// `expected_token` and has not expired at `now`. Returns `false` when
    /// the condition did not hold, so two racing rotations of the same value
    /// cannot both win.
    async fn rotate(
        &self,
        id: RefreshTokenId,
        expected_token: &str,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Bump `updated_at` of row `id`. Returns `false` if the row is gone.
    async fn touch(&self, id: RefreshTokenId, now: DateTime<Utc>) -> Result<bool>;

    /// Purge rows expired at `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Whether an error from a [`UserRepository`] is a uniqueness violation.
pub fn is_duplicate_user(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DuplicateUser>().is_some()
}
