use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

use geoauth_core::auth::{ClaimsEncoding, CredentialHasher, RefreshPolicy};

use super::{
    models::{
        AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig,
        JwtConfig, ServerConfig,
    },
    sources::{EnvConfig, FileConfig},
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] =
    ["geoauth.toml", "config/geoauth.toml"];
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Default, Clone)]
struct ConfigLoaderOptions {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the process environment and the config file, and
    /// compose the validated configuration.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Compose configuration from an explicit environment snapshot. Does
    /// not touch `.env` or the process environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = if let Some(path) = &self.options.config_path {
            (path.clone(), true)
        } else if let Some(path) = &env.config_path {
            (path.clone(), true)
        } else if let Some(found) = DEFAULT_CONFIG_LOCATIONS
            .iter()
            .map(PathBuf::from)
            .find(|candidate| candidate.exists())
        {
            (found, false)
        } else {
            return Ok((None, None));
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file_config = read_file_config(&path)?;
        debug!(path = %path.display(), "loaded configuration file");
        Ok((Some(file_config), Some(path)))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn compose_config(
    file_config: Option<FileConfig>,
    env: EnvConfig,
    config_path: Option<PathBuf>,
) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
    let mut warnings = ConfigWarnings::default();

    if config_path.is_none() {
        warnings.push_with_hint(
            "No geoauth.toml detected; using environment variables only",
            "Create geoauth.toml or point GEOAUTH_CONFIG at a configuration file",
        );
    }

    let FileConfig {
        server: file_server,
        database: file_database,
        jwt: file_jwt,
        auth: file_auth,
        cors: file_cors,
    } = file_config.unwrap_or_default();

    let server = ServerConfig {
        host: env
            .server_host
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: parse_env("SERVER_PORT", env.server_port.as_deref())?
            .or(file_server.port)
            .unwrap_or(DEFAULT_PORT),
    };

    let database = DatabaseConfig {
        url: env
            .database_url
            .or(file_database.url)
            .filter(|url| !url.trim().is_empty()),
    };

    let jwt = JwtConfig {
        key: required("JWT_KEY", env.jwt_key.or(file_jwt.key))?,
        issuer: required("JWT_ISSUER", env.jwt_issuer.or(file_jwt.issuer))?,
        audience: required(
            "JWT_AUDIENCE",
            env.jwt_audience.or(file_jwt.audience),
        )?,
        duration_minutes: parse_env(
            "JWT_DURATION_MINUTES",
            env.jwt_duration_minutes.as_deref(),
        )?
        .or(file_jwt.duration_minutes)
        .ok_or(ConfigLoadError::MissingSetting {
            key: "JWT_DURATION_MINUTES",
        })?,
    };

    let sweep_interval = match env.sweep_interval.or(file_auth.sweep_interval) {
        Some(raw) => Some(parse_duration("REFRESH_SWEEP_INTERVAL", &raw)?),
        None => None,
    };

    let auth = AuthConfig {
        refresh_token_days: parse_env(
            "REFRESH_TOKEN_DAYS",
            env.refresh_token_days.as_deref(),
        )?
        .or(file_auth.refresh_token_days)
        .unwrap_or(AuthConfig::DEFAULT_REFRESH_TOKEN_DAYS),
        refresh_policy: parse_env::<RefreshPolicy>(
            "REFRESH_POLICY",
            env.refresh_policy.as_deref(),
        )?
        .or(file_auth.refresh_policy)
        .unwrap_or_default(),
        password_pepper: env
            .password_pepper
            .or(file_auth.password_pepper)
            .filter(|pepper| !pepper.is_empty()),
        hash_memory_kib: file_auth
            .hash_memory_kib
            .unwrap_or(CredentialHasher::DEFAULT_MEMORY_KIB),
        hash_iterations: file_auth
            .hash_iterations
            .unwrap_or(CredentialHasher::DEFAULT_ITERATIONS),
        hash_parallelism: file_auth
            .hash_parallelism
            .unwrap_or(CredentialHasher::DEFAULT_PARALLELISM),
        claims_encoding: parse_env::<ClaimsEncoding>(
            "CLAIMS_ENCODING",
            env.claims_encoding.as_deref(),
        )?
        .or(file_auth.claims_encoding)
        .unwrap_or_default(),
        sweep_interval,
        allow_role_self_assignment: parse_env(
            "ALLOW_ROLE_SELF_ASSIGNMENT",
            env.allow_role_self_assignment.as_deref(),
        )?
        .or(file_auth.allow_role_self_assignment)
        .unwrap_or(false),
    };

    let cors = CorsConfig {
        allowed_origins: env
            .cors_allowed_origins
            .or(file_cors.allowed_origins)
            .unwrap_or_else(default_cors_origins),
    };

    let config = Config {
        server,
        database,
        jwt,
        auth,
        cors,
        metadata: ConfigMetadata {
            config_path,
            env_file_loaded: false,
        },
    };

    let guard_warnings = validation::apply_guard_rails(&config)?;
    warnings.extend(guard_warnings);

    Ok((config, warnings))
}

fn required(
    key: &'static str,
    value: Option<String>,
) -> Result<String, ConfigLoadError> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigLoadError::MissingSetting { key })
}

fn parse_env<T>(
    key: &'static str,
    raw: Option<&str>,
) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|raw| {
        raw.trim()
            .parse::<T>()
            .map_err(|err| ConfigLoadError::InvalidValue {
                key,
                value: raw.to_string(),
                reason: err.to_string(),
            })
    })
    .transpose()
}

fn parse_duration(
    key: &'static str,
    raw: &str,
) -> Result<Duration, ConfigLoadError> {
    humantime::parse_duration(raw.trim()).map_err(|err| {
        ConfigLoadError::InvalidValue {
            key,
            value: raw.to_string(),
            reason: err.to_string(),
        }
    })
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".to_string()]
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("required setting {key} is not configured")]
    MissingSetting { key: &'static str },
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
