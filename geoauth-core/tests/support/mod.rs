#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use geoauth_core::auth::{
    AccessTokenService, ClaimsEncoding, CredentialHasher, RefreshPolicy,
    TokenSettings,
    domain::services::{AuthSettings, AuthenticationService},
    infrastructure::InMemoryAuthStore,
};
use geoauth_core::clock::ManualClock;

pub const SIGNING_KEY: &str = "integration-signing-key-of-at-least-32-bytes";
pub const ISSUER: &str = "geoauth";
pub const AUDIENCE: &str = "geoauth-clients";
pub const ACCESS_MINUTES: u32 = 30;

/// Orchestrator wired to an in-memory store and a manually driven clock.
pub struct TestAuthHarness {
    pub service: Arc<AuthenticationService>,
    pub store: Arc<InMemoryAuthStore>,
    pub tokens: Arc<AccessTokenService>,
    pub clock: ManualClock,
}

impl TestAuthHarness {
    pub fn new(policy: RefreshPolicy) -> Result<Self> {
        let clock = ManualClock::starting_now();
        let store = Arc::new(InMemoryAuthStore::new());
        let tokens = Arc::new(AccessTokenService::new(
            TokenSettings::new(SIGNING_KEY, ISSUER, AUDIENCE, ACCESS_MINUTES)?,
            ClaimsEncoding::Compact,
            Arc::new(clock.clone()),
        ));
        let hasher = Arc::new(CredentialHasher::with_params(1024, 1, 1)?);

        let service = AuthenticationService::new(
            store.clone(),
            store.clone(),
            hasher,
            tokens.clone(),
            Arc::new(clock.clone()),
            AuthSettings {
                refresh_policy: policy,
                ..AuthSettings::default()
            },
        );

        Ok(Self {
            service: Arc::new(service),
            store,
            tokens,
            clock,
        })
    }
}
