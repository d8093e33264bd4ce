#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use axum_test::TestServer;
use serde_json::{Value, json};

use geoauth_config::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, JwtConfig,
    ServerConfig,
};
use geoauth_core::{
    auth::{ADMIN_ROLE, ClaimsEncoding, RefreshPolicy},
    clock::ManualClock,
};
use geoauth_server::{AppState, create_app, infra::startup::build_app_resources};

pub const PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub clock: ManualClock,
}

pub fn test_config(policy: RefreshPolicy) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
        },
        database: DatabaseConfig { url: None },
        jwt: JwtConfig {
            key: "http-test-signing-key-that-is-long-enough".into(),
            issuer: "geoauth".into(),
            audience: "geoauth-clients".into(),
            duration_minutes: 15,
        },
        auth: AuthConfig {
            refresh_token_days: AuthConfig::DEFAULT_REFRESH_TOKEN_DAYS,
            refresh_policy: policy,
            password_pepper: None,
            hash_memory_kib: 1024,
            hash_iterations: 1,
            hash_parallelism: 1,
            claims_encoding: ClaimsEncoding::Compact,
            sweep_interval: None,
            allow_role_self_assignment: false,
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:5173".into()],
        },
        metadata: ConfigMetadata::default(),
    }
}

pub async fn build_test_app(policy: RefreshPolicy) -> Result<TestApp> {
    build_test_app_with(test_config(policy)).await
}

pub async fn build_test_app_with(config: Config) -> Result<TestApp> {
    let clock = ManualClock::starting_now();
    let resources =
        build_app_resources(Arc::new(config), Arc::new(clock.clone())).await?;

    let server = TestServer::new(create_app(resources.state.clone()))
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state: resources.state,
        clock,
    })
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Register through the API; returns the new user id.
pub async fn register(
    server: &TestServer,
    username: &str,
    role: Option<&str>,
) -> i64 {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@geo.example"),
            "password": PASSWORD,
            "role": role,
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    body["userId"].as_i64().expect("userId in register response")
}

/// Create an Admin account directly through the service, bypassing the
/// HTTP role-assignment check; returns the new user id.
pub async fn seed_admin(app: &TestApp, username: &str) -> i64 {
    app.state
        .auth()
        .register(
            username,
            &format!("{username}@geo.example"),
            PASSWORD,
            Some(ADMIN_ROLE),
        )
        .await
        .expect("seed admin")
        .id
}

/// Log in through the API; returns `(access_token, refresh_token)`.
pub async fn login(server: &TestServer, username: &str) -> (String, String) {
    let response = server
        .post("/api/auth/login")
        .json(&json!({ "username": username, "password": PASSWORD }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    (
        body["token"].as_str().expect("token").to_string(),
        body["refreshToken"].as_str().expect("refreshToken").to_string(),
    )
}
