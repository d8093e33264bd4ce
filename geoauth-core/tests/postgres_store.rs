//! PostgreSQL repository behaviour. Needs a live database via DATABASE_URL.
#![cfg(feature = "pg-tests")]

mod support;

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use geoauth_core::auth::domain::repositories::{
    RefreshTokenRepository, UserRepository, is_duplicate_user,
};
use geoauth_core::auth::domain::services::{
    AuthSettings, AuthenticationError, create_authentication_service,
};
use geoauth_core::auth::domain::user::NewUser;
use geoauth_core::auth::domain::value_objects::NewRefreshToken;
use geoauth_core::auth::infrastructure::{
    PostgresRefreshTokenRepository, PostgresUserRepository,
};
use geoauth_core::auth::{
    AccessTokenService, ClaimsEncoding, CredentialHasher, TokenSettings,
};
use geoauth_core::clock::ManualClock;
use sqlx::PgPool;

fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        username: username.into(),
        email: email.into(),
        role: "User".into(),
        password_hash: "$argon2id$placeholder".into(),
        created_at: Utc::now(),
    }
}

#[sqlx::test(migrator = "geoauth_core::MIGRATOR")]
async fn unique_violation_surfaces_as_duplicate(pool: PgPool) -> Result<()> {
    let users = PostgresUserRepository::new(pool);

    let alice = users.create(new_user("alice", "a@x.com")).await?;
    assert!(users.exists("alice", "nobody@x.com").await?);
    assert_eq!(users.find_by_username("alice").await?.map(|u| u.id), Some(alice.id));

    let err = users.create(new_user("alice", "b@x.com")).await.unwrap_err();
    assert!(is_duplicate_user(&err));

    Ok(())
}

#[sqlx::test(migrator = "geoauth_core::MIGRATOR")]
async fn user_delete_cascades(pool: PgPool) -> Result<()> {
    let users = PostgresUserRepository::new(pool.clone());
    let tokens = PostgresRefreshTokenRepository::new(pool);

    let alice = users.create(new_user("alice", "a@x.com")).await?;
    tokens
        .create(NewRefreshToken {
            user_id: alice.id,
            token: "cascade-me".into(),
            expires_at: Utc::now() + Duration::days(7),
            created_at: Utc::now(),
        })
        .await?;

    assert!(UserRepository::delete(&users, alice.id).await?);
    assert!(tokens.find_by_token("cascade-me").await?.is_none());

    Ok(())
}

#[sqlx::test(migrator = "geoauth_core::MIGRATOR")]
async fn rotation_is_conditional(pool: PgPool) -> Result<()> {
    let users = PostgresUserRepository::new(pool.clone());
    let tokens = PostgresRefreshTokenRepository::new(pool);
    let alice = users.create(new_user("alice", "a@x.com")).await?;

    let now = Utc::now();
    let record = tokens
        .create(NewRefreshToken {
            user_id: alice.id,
            token: "v1".into(),
            expires_at: now + Duration::days(1),
            created_at: now,
        })
        .await?;

    let later = now + Duration::days(7);
    assert!(tokens.rotate(record.id, "v1", "v2", later, now).await?);
    assert!(!tokens.rotate(record.id, "v1", "v3", later, now).await?);
    assert!(tokens.find_by_token("v1").await?.is_none());
    assert_eq!(tokens.find_by_token("v2").await?.map(|r| r.id), Some(record.id));

    assert!(tokens.touch(record.id, now).await?);
    assert_eq!(tokens.delete_expired(later).await?, 1);

    Ok(())
}

#[sqlx::test(migrator = "geoauth_core::MIGRATOR")]
async fn orchestrator_round_trip(pool: PgPool) -> Result<()> {
    let clock = ManualClock::starting_now();
    let tokens = Arc::new(AccessTokenService::new(
        TokenSettings::new(
            support::SIGNING_KEY,
            support::ISSUER,
            support::AUDIENCE,
            support::ACCESS_MINUTES,
        )?,
        ClaimsEncoding::Compact,
        Arc::new(clock.clone()),
    ));
    let service = create_authentication_service(
        pool,
        Arc::new(CredentialHasher::with_params(1024, 1, 1)?),
        tokens,
        Arc::new(clock.clone()),
        AuthSettings::default(),
    );

    let alice = service.register("alice", "a@x.com", "secret1", None).await?;
    let session = service.login("alice", "secret1").await?;
    let refreshed = service.refresh(&session.refresh_token).await?;
    assert_eq!(service.validate_access_token(&refreshed.access_token), Some(alice.id));

    service.logout(&refreshed.refresh_token).await?;
    let err = service.refresh(&refreshed.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthenticationError::InvalidRefreshToken));

    Ok(())
}
