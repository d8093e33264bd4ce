use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::auth::domain::repositories::RefreshTokenRepository;
use crate::auth::domain::user::UserId;
use crate::auth::domain::value_objects::{
    NewRefreshToken, RefreshTokenId, RefreshTokenRecord,
};

#[derive(Debug, Clone)]
pub struct PostgresRefreshTokenRepository {
    pool: PgPool,
}

impl PostgresRefreshTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<RefreshTokenRecord> {
        let id: RefreshTokenId = row
            .try_get("id")
            .context("Failed to read refresh token id")?;
        let user_id: UserId = row
            .try_get("user_id")
            .context("Failed to read refresh token owner")?;
        let token: String = row
            .try_get("token")
            .context("Failed to read refresh token value")?;
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .context("Failed to read expires_at")?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .context("Failed to read created_at")?;
        let updated_at: DateTime<Utc> = row
            .try_get("updated_at")
            .context("Failed to read updated_at")?;

        Ok(RefreshTokenRecord {
            id,
            user_id,
            token,
            expires_at,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl RefreshTokenRepository for PostgresRefreshTokenRepository {
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshTokenRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, token, expires_at, created_at, updated_at
            FROM refresh_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .context("Failed to look up refresh token")?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn create(&self, token: NewRefreshToken) -> Result<RefreshTokenRecord> {
        let row = sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token, expires_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, user_id, token, expires_at, created_at, updated_at
            "#,
        )
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.created_at)
        .fetch_one(self.pool())
        .await
        .context("Failed to create refresh token")?;

        Self::map_row(&row)
    }

    async fn delete(&self, id: RefreshTokenId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .context("Failed to delete refresh token")?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_user(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .context("Failed to delete refresh tokens for user")?;

        Ok(result.rows_affected())
    }

    async fn rotate(
        &self,
        id: RefreshTokenId,
        expected_token: &str,
        new_token: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // A lost race updates zero rows.
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET token = $3, expires_at = $4, updated_at = $5
            WHERE id = $1 AND token = $2 AND expires_at > $5
            "#,
        )
        .bind(id)
        .bind(expected_token)
        .bind(new_token)
        .bind(new_expires_at)
        .bind(now)
        .execute(self.pool())
        .await
        .context("Failed to rotate refresh token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn touch(&self, id: RefreshTokenId, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE refresh_tokens SET updated_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(self.pool())
            .await
            .context("Failed to touch refresh token")?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(self.pool())
            .await
            .context("Failed to purge expired refresh tokens")?;

        Ok(result.rows_affected())
    }
}
