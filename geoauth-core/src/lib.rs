//! # geoauth Core
//!
//! Core library for the geoauth service: password verification, signed access
//! tokens and the refresh-token lifecycle behind them.
//!
//! ## Overview
//!
//! - **Credential Verifier**: argon2id hashing with an embedded salt and an
//!   optional server-side pepper ([`auth::CredentialHasher`])
//! - **Token Signer/Validator**: HS256 access tokens with issuer, audience and
//!   zero clock-skew expiry ([`auth::AccessTokenService`])
//! - **Refresh Token Store**: repository ports plus in-memory and PostgreSQL
//!   implementations ([`auth::domain::repositories`])
//! - **Auth Orchestrator**: register, login, refresh, logout
//!   ([`auth::domain::services::AuthenticationService`])
//! - **Claims Policy**: pure allow/deny decisions over validated claims
//!   ([`auth::policy`])
//!
//! ## Feature Flags
//!
//! - `database`: PostgreSQL repositories and embedded migrations (SQLx)
//! - `pg-tests`: repository tests that need a live database
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use geoauth_core::auth::{
//!     AccessTokenService, ClaimsEncoding, CredentialHasher, TokenSettings,
//!     domain::services::{AuthSettings, AuthenticationService},
//!     infrastructure::InMemoryAuthStore,
//! };
//! use geoauth_core::clock::SystemClock;
//!
//! async fn sign_in() -> anyhow::Result<()> {
//!     let clock = Arc::new(SystemClock);
//!     let store = Arc::new(InMemoryAuthStore::new());
//!     let tokens = Arc::new(AccessTokenService::new(
//!         TokenSettings::new("a-very-long-signing-key-of-32-bytes!", "geo", "geo-clients", 60)?,
//!         ClaimsEncoding::Compact,
//!         clock.clone(),
//!     ));
//!     let service = AuthenticationService::new(
//!         store.clone(),
//!         store,
//!         Arc::new(CredentialHasher::new()?),
//!         tokens,
//!         clock,
//!         AuthSettings::default(),
//!     );
//!
//!     service.register("alice", "a@x.com", "secret1", None).await?;
//!     let session = service.login("alice", "secret1").await?;
//!     println!("access token expires at {}", session.expires_at);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

/// Authentication: hashing, tokens, repositories, orchestration and policy
pub mod auth;

/// Wire-level request/response types shared with the HTTP layer
pub mod api_types;

/// Time source abstraction used for expiry decisions
pub mod clock;

/// Embedded migrations for the PostgreSQL store
#[cfg(feature = "database")]
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
