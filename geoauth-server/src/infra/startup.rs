use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tokio::task::JoinHandle;
use tracing::info;

use geoauth_config::Config;
use geoauth_core::{
    MIGRATOR,
    auth::{
        AccessTokenService, RefreshTokenSweeper,
        domain::{
            repositories::RefreshTokenRepository,
            services::{
                create_authentication_service,
                create_in_memory_authentication_service,
            },
        },
        infrastructure::PostgresRefreshTokenRepository,
    },
    clock::Clock,
};

use super::app_state::AppState;

const MAX_DB_CONNECTIONS: u32 = 10;

/// Application state plus the handles startup hooks need.
pub struct AppResources {
    pub state: AppState,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AppResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppResources")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Wire the orchestrator to PostgreSQL when a database URL is configured,
/// otherwise to a process-local in-memory store.
pub async fn build_app_resources(
    config: Arc<Config>,
    clock: Arc<dyn Clock>,
) -> Result<AppResources> {
    let hasher = Arc::new(
        config
            .hasher()
            .context("invalid password hashing parameters")?,
    );
    let tokens = Arc::new(AccessTokenService::new(
        config
            .token_settings()
            .context("invalid access token settings")?,
        config.auth.claims_encoding,
        clock.clone(),
    ));
    let settings = config.auth_settings();

    let (service, refresh_tokens) =
        match config.database.url.as_deref() {
            Some(url) => {
                let pool = connect_database(url).await?;
                let refresh_tokens: Arc<dyn RefreshTokenRepository> =
                    Arc::new(PostgresRefreshTokenRepository::new(pool.clone()));
                let service = create_authentication_service(
                    pool,
                    hasher,
                    tokens,
                    clock.clone(),
                    settings,
                );
                (service, refresh_tokens)
            }
            None => {
                let (service, store) = create_in_memory_authentication_service(
                    hasher,
                    tokens,
                    clock.clone(),
                    settings,
                );
                info!("using in-memory account store");
                let refresh_tokens: Arc<dyn RefreshTokenRepository> = store;
                (service, refresh_tokens)
            }
        };

    Ok(AppResources {
        state: AppState::new(config, Arc::new(service)),
        refresh_tokens,
        clock,
    })
}

/// Connect and apply pending migrations.
pub async fn connect_database(url: &str) -> Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(MAX_DB_CONNECTIONS)
        .connect(url)
        .await
        .context("failed to connect to PostgreSQL")?;
    info!("Successfully connected to PostgreSQL");

    MIGRATOR
        .run(&pool)
        .await
        .context("database migration failed")?;
    info!("Database schema up to date");

    Ok(pool)
}

#[async_trait]
pub trait StartupHooks: Send + Sync {
    /// Start background work; returned handles are aborted on shutdown.
    async fn run(&self, resources: &AppResources) -> Result<Vec<JoinHandle<()>>>;
}

#[derive(Debug, Default)]
pub struct ProdStartupHooks;

#[async_trait]
impl StartupHooks for ProdStartupHooks {
    async fn run(&self, resources: &AppResources) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();

        match resources.state.config().auth.sweep_interval {
            Some(every) => {
                let sweeper = RefreshTokenSweeper::new(
                    resources.refresh_tokens.clone(),
                    resources.clock.clone(),
                    every,
                );
                info!(interval = ?every, "expired refresh token sweep enabled");
                handles.push(sweeper.spawn());
            }
            None => info!("expired refresh token sweep disabled"),
        }

        Ok(handles)
    }
}

#[derive(Debug, Default)]
pub struct NoopStartupHooks;

#[async_trait]
impl StartupHooks for NoopStartupHooks {
    async fn run(&self, _resources: &AppResources) -> Result<Vec<JoinHandle<()>>> {
        Ok(Vec::new())
    }
}
