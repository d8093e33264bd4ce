use thiserror::Error;

use super::models::Config;

#[derive(Debug, Error)]
pub enum ConfigGuardRailError {
    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },
    #[error("{field} must not exceed {max}")]
    TooLarge { field: &'static str, max: u64 },
    #[error("CORS wildcard origin cannot be combined with explicit origins")]
    MixedCorsWildcard,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Reject unusable settings and flag weak ones.
pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    const MIN_KEY_LENGTH: usize = 32;
    const MAX_REFRESH_TOKEN_DAYS: u32 = 3650;

    let mut warnings = ConfigWarnings::default();

    if config.jwt.duration_minutes == 0 {
        return Err(ConfigGuardRailError::ZeroValue {
            field: "JWT_DURATION_MINUTES",
        });
    }
    if config.auth.refresh_token_days == 0 {
        return Err(ConfigGuardRailError::ZeroValue {
            field: "REFRESH_TOKEN_DAYS",
        });
    }
    if config.auth.refresh_token_days > MAX_REFRESH_TOKEN_DAYS {
        return Err(ConfigGuardRailError::TooLarge {
            field: "REFRESH_TOKEN_DAYS",
            max: u64::from(MAX_REFRESH_TOKEN_DAYS),
        });
    }
    for (field, value) in [
        ("auth.hash_memory_kib", config.auth.hash_memory_kib),
        ("auth.hash_iterations", config.auth.hash_iterations),
        ("auth.hash_parallelism", config.auth.hash_parallelism),
    ] {
        if value == 0 {
            return Err(ConfigGuardRailError::ZeroValue { field });
        }
    }
    if config.auth.sweep_interval.is_some_and(|every| every.is_zero()) {
        return Err(ConfigGuardRailError::ZeroValue {
            field: "REFRESH_SWEEP_INTERVAL",
        });
    }

    if config.cors.is_wildcard_included() && config.cors.allowed_origins.len() > 1 {
        return Err(ConfigGuardRailError::MixedCorsWildcard);
    }

    if config.jwt.key.len() < MIN_KEY_LENGTH {
        warnings.push_with_hint(
            format!("JWT_KEY is shorter than {MIN_KEY_LENGTH} bytes"),
            "Use at least 32 random bytes for the HMAC-SHA256 signing key",
        );
    }

    if config.database.url.is_none() {
        warnings.push_with_hint(
            "DATABASE_URL not configured; accounts and sessions are kept in memory",
            "Set DATABASE_URL to persist users and refresh tokens across restarts",
        );
    }

    if config.auth.password_pepper.is_none() {
        warnings.push_with_hint(
            "PASSWORD_PEPPER not set; password hashes rely on salt alone",
            "Set PASSWORD_PEPPER before the first account is registered",
        );
    }

    if config.cors.is_wildcard_included() {
        warnings.push("CORS allows any origin");
    }

    if config.auth.allow_role_self_assignment {
        warnings.push_with_hint(
            "ALLOW_ROLE_SELF_ASSIGNMENT enabled; anyone can register as Admin",
            "Leave it off and let an Admin create privileged accounts",
        );
    }

    Ok(warnings)
}
