use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use geoauth_core::auth::{
    AuthSettings, ClaimsEncoding, CredentialError, CredentialHasher,
    RefreshPolicy, TokenError, TokenSettings,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    /// Signing configuration for the access-token service.
    pub fn token_settings(&self) -> Result<TokenSettings, TokenError> {
        TokenSettings::new(
            self.jwt.key.as_bytes(),
            self.jwt.issuer.clone(),
            self.jwt.audience.clone(),
            self.jwt.duration_minutes,
        )
    }

    pub fn auth_settings(&self) -> AuthSettings {
        AuthSettings {
            refresh_token_lifetime: chrono::Duration::days(i64::from(
                self.auth.refresh_token_days,
            )),
            refresh_policy: self.auth.refresh_policy,
        }
    }

    /// Password hasher with the configured cost and pepper.
    pub fn hasher(&self) -> Result<CredentialHasher, CredentialError> {
        let hasher = CredentialHasher::with_params(
            self.auth.hash_memory_kib,
            self.auth.hash_iterations,
            self.auth.hash_parallelism,
        )?;

        match self.auth.password_pepper.as_deref() {
            Some(pepper) => hasher.with_pepper(pepper),
            None => Ok(hasher),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Absent means the in-memory store.
    pub url: Option<String>,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub key: String,
    pub issuer: String,
    pub audience: String,
    pub duration_minutes: u32,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("duration_minutes", &self.duration_minutes)
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthConfig {
    pub refresh_token_days: u32,
    pub refresh_policy: RefreshPolicy,
    pub password_pepper: Option<String>,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
    pub claims_encoding: ClaimsEncoding,
    /// Interval of the expired-token sweep; `None` disables it.
    pub sweep_interval: Option<Duration>,
    /// Let unauthenticated callers register with a role other than `User`.
    pub allow_role_self_assignment: bool,
}

impl AuthConfig {
    pub const DEFAULT_REFRESH_TOKEN_DAYS: u32 = 7;
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("refresh_token_days", &self.refresh_token_days)
            .field("refresh_policy", &self.refresh_policy)
            .field("peppered", &self.password_pepper.is_some())
            .field("hash_memory_kib", &self.hash_memory_kib)
            .field("hash_iterations", &self.hash_iterations)
            .field("hash_parallelism", &self.hash_parallelism)
            .field("claims_encoding", &self.claims_encoding)
            .field("sweep_interval", &self.sweep_interval)
            .field(
                "allow_role_self_assignment",
                &self.allow_role_self_assignment,
            )
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    pub fn is_wildcard_included(&self) -> bool {
        self.allowed_origins
            .iter()
            .any(|origin| origin.trim() == "*")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
