use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::auth::domain::repositories::{DuplicateUser, UserRepository};
use crate::auth::domain::user::{NewUser, User, UserId};

#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: &PgRow) -> Result<User> {
        let id: UserId = row.try_get("id").context("Failed to read user id")?;
        let username: String = row
            .try_get("username")
            .context("Failed to read username")?;
        let email: String = row.try_get("email").context("Failed to read email")?;
        let role: String = row.try_get("role").context("Failed to read role")?;
        let password_hash: String = row
            .try_get("password_hash")
            .context("Failed to read password hash")?;
        let created_at: DateTime<Utc> = row
            .try_get("created_at")
            .context("Failed to read created_at")?;

        Ok(User {
            id,
            username,
            email,
            role,
            password_hash,
            created_at,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, role, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .context("Failed to load user by id")?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, role, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .context("Failed to load user by username")?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn exists(&self, username: &str, email: &str) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM users WHERE username = $1 OR email = $2
            ) AS taken
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_one(self.pool())
        .await
        .context("Failed to check user uniqueness")?;

        row.try_get("taken").context("Failed to read uniqueness flag")
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, role, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, role, password_hash, created_at
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.role)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .fetch_one(self.pool())
        .await;

        match result {
            Ok(row) => Self::map_row(&row),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DuplicateUser.into())
            }
            Err(err) => Err(anyhow::Error::new(err).context("Failed to create user")),
        }
    }

    async fn delete(&self, id: UserId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}
