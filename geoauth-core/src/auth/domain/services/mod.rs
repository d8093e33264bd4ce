// Authentication domain services
// The orchestrator composes hashing, token signing and the two stores into
// the register / login / refresh / logout flows.

mod authentication_service;

use std::sync::Arc;

pub use authentication_service::{
    AuthErrorKind, AuthSettings, AuthenticationError, AuthenticationService,
    SessionTokens,
};

use crate::auth::infrastructure::InMemoryAuthStore;
use crate::auth::{AccessTokenService, CredentialHasher};
use crate::clock::Clock;

/// Factory function to create an AuthenticationService with PostgreSQL repositories
#[cfg(feature = "database")]
pub fn create_authentication_service(
    pool: sqlx::PgPool,
    hasher: Arc<CredentialHasher>,
    tokens: Arc<AccessTokenService>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
) -> AuthenticationService {
    use crate::auth::infrastructure::postgres::{
        PostgresRefreshTokenRepository, PostgresUserRepository,
    };

    let users = Arc::new(PostgresUserRepository::new(pool.clone()));
    let refresh_tokens = Arc::new(PostgresRefreshTokenRepository::new(pool));
    AuthenticationService::new(
        users,
        refresh_tokens,
        hasher,
        tokens,
        clock,
        settings,
    )
}

/// Same service over a fresh [`InMemoryAuthStore`], for database-less runs.
pub fn create_in_memory_authentication_service(
    hasher: Arc<CredentialHasher>,
    tokens: Arc<AccessTokenService>,
    clock: Arc<dyn Clock>,
    settings: AuthSettings,
) -> (AuthenticationService, Arc<InMemoryAuthStore>) {
    let store = Arc::new(InMemoryAuthStore::new());
    let service = AuthenticationService::new(
        store.clone(),
        store.clone(),
        hasher,
        tokens,
        clock,
        settings,
    );
    (service, store)
}
