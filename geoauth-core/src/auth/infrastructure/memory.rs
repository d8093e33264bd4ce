use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::auth::domain::repositories::{
    DuplicateUser, RefreshTokenRepository, UserRepository,
};
use crate::auth::domain::user::{NewUser, User, UserId};
use crate::auth::domain::value_objects::{
    NewRefreshToken, RefreshTokenId, RefreshTokenRecord,
};

#[derive(Debug, Default)]
struct StoreState {
    users: BTreeMap<UserId, User>,
    refresh_tokens: BTreeMap<RefreshTokenId, RefreshTokenRecord>,
    next_user_id: UserId,
    next_token_id: RefreshTokenId,
}

/// Process-local store implementing both repository ports.
///
/// One lock guards users and tokens together, so cascade deletes and the
/// conditional rotation are atomic just as they are in the database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryAuthStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    pub async fn refresh_token_count(&self) -> usize {
        self.state.lock().await.refresh_tokens.len()
    }

    /// All refresh rows owned by `user_id`, oldest first.
    pub async fn refresh_tokens_for(&self, user_id: UserId) -> Vec<RefreshTokenRecord> {
        self.state
            .lock()
            .await
            .refresh_tokens
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryAuthStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let guard = self.state.lock().await;
        Ok(guard
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn exists(&self, username: &str, email: &str) -> Result<bool> {
        let guard = self.state.lock().await;
        Ok(guard
            .users
            .values()
            .any(|user| user.username == username || user.email == email))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut guard = self.state.lock().await;
        let taken = guard
            .users
            .values()
            .any(|existing| existing.username == user.username || existing.email == user.email);
        if taken {
            return Err(DuplicateUser.into());
        }

        guard.next_user_id += 1;
        let user = user.into_user(guard.next_user_id);
        guard.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<bool> {
        let mut guard = self.state.lock().await;
        let removed = guard.users.remove(&id).is_some();
        if removed {
            guard.refresh_tokens.retain(|_, record| record.user_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl RefreshTokenRepository for InMemoryAuthStore {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        let guard = self.state.lock().await;
        Ok(guard
            .refresh_tokens
            .values()
            .find(|record| record.token == token)
            .cloned())
    }

    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let mut guard = self.state.lock().await;
        if !guard.users.contains_key(&token.user_id) {
            bail!("refresh token references unknown user {}", token.user_id);
        }
        if guard
            .refresh_tokens
            .values()
            .any(|record| record.token == token.token)
        {
            bail!("refresh token value already exists");
        }

        guard.next_token_id += 1;
        let record = token.into_record(guard.next_token_id);
        guard.refresh_tokens.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete(&self, id: RefreshTokenId) -> Result<bool> {
        Ok(self.state.lock().await.refresh_tokens.remove(&id).is_some())
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64> {
        let mut guard = self.state.lock().await;
        let before = guard.refresh_tokens.len();
        guard.refresh_tokens.retain(|_, record| record.user_id != user_id);
        Ok((before - guard.refresh_tokens.len()) as u64)
    }

    async fn rotate(
        &self,
        id: RefreshTokenId,
        expected_token: &str,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut guard = self.state.lock().await;
        if guard
            .refresh_tokens
            .values()
            .any(|record| record.id != id && record.token == new_token)
        {
            bail!("refresh token value already exists");
        }

        match guard.refresh_tokens.get_mut(&id) {
            Some(record) if record.token == expected_token && !record.is_expired(now) => {
                record.token = new_token.to_string();
                record.expires_at = new_expires_at;
                record.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch(&self, id: RefreshTokenId, now: DateTime<Utc>) -> Result<bool> {
        let mut guard = self.state.lock().await;
        match guard.refresh_tokens.get_mut(&id) {
            Some(record) => {
                record.updated_at = now;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let mut guard = self.state.lock().await;
        let before = guard.refresh_tokens.len();
        guard.refresh_tokens.retain(|_, record| !record.is_expired(now));
        Ok((before - guard.refresh_tokens.len()) as u64)
    }
}
