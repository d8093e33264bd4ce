use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use geoauth_core::auth::{ClaimsEncoding, RefreshPolicy};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub jwt: FileJwtConfig,
    #[serde(default)]
    pub auth: FileAuthConfig,
    #[serde(default)]
    pub cors: FileCorsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileJwtConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileAuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_policy: Option<RefreshPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_pepper: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_memory_kib: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_iterations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_parallelism: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims_encoding: Option<ClaimsEncoding>,
    /// Humantime duration, e.g. `"1h"` or `"15m"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_role_self_assignment: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCorsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
}

/// Environment-derived configuration values.
///
/// Numeric and enum settings stay as raw strings here so the loader can
/// report which variable failed to parse.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<String>,
    pub database_url: Option<String>,
    pub jwt_key: Option<String>,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_duration_minutes: Option<String>,
    pub refresh_token_days: Option<String>,
    pub refresh_policy: Option<String>,
    pub password_pepper: Option<String>,
    pub claims_encoding: Option<String>,
    pub sweep_interval: Option<String>,
    pub allow_role_self_assignment: Option<String>,
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self {
            config_path: non_empty_var("GEOAUTH_CONFIG").map(PathBuf::from),
            server_host: non_empty_var("SERVER_HOST"),
            server_port: non_empty_var("SERVER_PORT"),
            database_url: non_empty_var("DATABASE_URL"),
            jwt_key: non_empty_var("JWT_KEY"),
            jwt_issuer: non_empty_var("JWT_ISSUER"),
            jwt_audience: non_empty_var("JWT_AUDIENCE"),
            jwt_duration_minutes: non_empty_var("JWT_DURATION_MINUTES"),
            refresh_token_days: non_empty_var("REFRESH_TOKEN_DAYS"),
            refresh_policy: non_empty_var("REFRESH_POLICY"),
            password_pepper: non_empty_var("PASSWORD_PEPPER"),
            claims_encoding: non_empty_var("CLAIMS_ENCODING"),
            sweep_interval: non_empty_var("REFRESH_SWEEP_INTERVAL"),
            allow_role_self_assignment: non_empty_var(
                "ALLOW_ROLE_SELF_ASSIGNMENT",
            ),
            cors_allowed_origins: parse_csv_var("CORS_ALLOWED_ORIGINS"),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn parse_csv_var(name: &str) -> Option<Vec<String>> {
    std::env::var(name).ok().map(|raw| parse_csv(&raw))
}

pub(crate) fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter_map(|part| {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}
