//! HS256 access tokens and opaque refresh values
//!
//! Access tokens are self-contained: validity is proven by signature,
//! issuer, audience and expiry on every use. Expiry is checked against the
//! injected [`Clock`] with zero skew, so a token is already invalid at the
//! exact instant named by its `exp` claim.

use std::{fmt, str::FromStr, sync::Arc};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
};
use rand::{TryRngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::auth::domain::user::{User, UserId};
use crate::clock::Clock;

/// Number of random bytes behind each refresh value.
pub const REFRESH_VALUE_BYTES: usize = 64;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token settings: {0}")]
    InvalidSettings(&'static str),
    #[error("failed to sign access token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error("secure random source unavailable: {0}")]
    Randomness(String),
}

/// Process-wide signing configuration. Immutable once constructed.
#[derive(Clone)]
pub struct TokenSettings {
    key: Zeroizing<Vec<u8>>,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("key", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenSettings {
    pub fn new(
        key: impl AsRef<[u8]>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        duration_minutes: u32,
    ) -> Result<Self, TokenError> {
        let key = key.as_ref();
        let issuer = issuer.into();
        let audience = audience.into();

        if key.is_empty() {
            return Err(TokenError::InvalidSettings("signing key is empty"));
        }
        if issuer.trim().is_empty() {
            return Err(TokenError::InvalidSettings("issuer is empty"));
        }
        if audience.trim().is_empty() {
            return Err(TokenError::InvalidSettings("audience is empty"));
        }
        if duration_minutes == 0 {
            return Err(TokenError::InvalidSettings(
                "access token duration must be at least one minute",
            ));
        }

        Ok(Self {
            key: Zeroizing::new(key.to_vec()),
            issuer,
            audience,
            lifetime: Duration::minutes(i64::from(duration_minutes)),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &str {
        &self.audience
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }
}

/// Which claim names an issued token carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsEncoding {
    /// Short JWT claim names only.
    #[default]
    Compact,
    /// Short names plus the long URI names older .NET consumers read.
    #[serde(alias = "legacy")]
    LegacyUris,
}

impl FromStr for ClaimsEncoding {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "legacy_uris" | "legacy-uris" | "legacy" => Ok(Self::LegacyUris),
            other => Err(format!(
                "unknown claims encoding '{other}' (expected 'compact' or 'legacy_uris')"
            )),
        }
    }
}

/// URI-named duplicates of the identity claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyUriClaims {
    #[serde(
        rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name_identifier: Option<String>,
    #[serde(
        rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    #[serde(
        rename = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<String>,
    #[serde(
        rename = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub role: Option<String>,
}

impl LegacyUriClaims {
    pub fn is_empty(&self) -> bool {
        self.name_identifier.is_none()
            && self.name.is_none()
            && self.email.is_none()
            && self.role.is_none()
    }
}

/// Claim set carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub unique_name: String,
    pub email: String,
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(flatten)]
    pub legacy: LegacyUriClaims,
}

impl AccessClaims {
    /// Numeric user id carried in `sub`.
    pub fn user_id(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }

    /// Role from the short claim, falling back to the URI-named one.
    pub fn effective_role(&self) -> Option<&str> {
        self.role
            .as_deref()
            .or(self.legacy.role.as_deref())
            .filter(|role| !role.is_empty())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly signed access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and validates access tokens, and mints refresh values.
pub struct AccessTokenService {
    settings: TokenSettings,
    encoding: ClaimsEncoding,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AccessTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessTokenService")
            .field("settings", &self.settings)
            .field("encoding", &self.encoding)
            .field("clock", &self.clock)
            .finish()
    }
}

impl AccessTokenService {
    pub fn new(
        settings: TokenSettings,
        encoding: ClaimsEncoding,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let encoding_key = EncodingKey::from_secret(&settings.key);
        let decoding_key = DecodingKey::from_secret(&settings.key);

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[settings.issuer.as_str()]);
        validation.set_audience(&[settings.audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        // Expiry is checked against the injected clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            settings,
            encoding,
            encoding_key,
            decoding_key,
            validation,
            clock,
        }
    }

    /// Sign an access token for `user`, expiring after the configured lifetime.
    pub fn issue(&self, user: &User) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + self.settings.lifetime;
        let jti = Uuid::new_v4().to_string();
        let role = Some(user.role.clone()).filter(|role| !role.is_empty());

        let legacy = match self.encoding {
            ClaimsEncoding::Compact => LegacyUriClaims::default(),
            ClaimsEncoding::LegacyUris => LegacyUriClaims {
                name_identifier: Some(user.id.to_string()),
                name: Some(user.username.clone()),
                email: Some(user.email.clone()),
                role: role.clone(),
            },
        };

        let claims = AccessClaims {
            sub: user.id.to_string(),
            unique_name: user.username.clone(),
            email: user.email.clone(),
            jti: jti.clone(),
            role,
            iss: self.settings.issuer.clone(),
            aud: self.settings.audience.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            legacy,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?;

        Ok(IssuedToken {
            token,
            jti,
            expires_at: DateTime::from_timestamp(claims.exp, 0)
                .unwrap_or(expires_at),
        })
    }

    /// Subject id of a valid token, `None` for any invalid one.
    pub fn validate(&self, token: &str) -> Option<UserId> {
        let claims = self.decode_claims(token)?;
        let user_id = claims.user_id();
        if user_id.is_none() {
            debug!("access token subject is not a user id");
        }
        user_id
    }

    /// Full claim set of a valid token.
    ///
    /// Bad signature, wrong issuer or audience, expiry and malformed input
    /// all yield `None`; the reason is only visible in debug logs.
    pub fn decode_claims(&self, token: &str) -> Option<AccessClaims> {
        let data = match decode::<AccessClaims>(
            token,
            &self.decoding_key,
            &self.validation,
        ) {
            Ok(data) => data,
            Err(err) => {
                debug!(error = %err, "access token rejected");
                return None;
            }
        };

        let now = self.clock.now().timestamp();
        if data.claims.exp <= now {
            debug!(exp = data.claims.exp, now, "access token expired");
            return None;
        }

        Some(data.claims)
    }

    /// Fresh opaque refresh value: 64 random bytes, base64 encoded.
    pub fn generate_refresh_value(&self) -> Result<String, TokenError> {
        generate_refresh_value()
    }
}

pub fn generate_refresh_value() -> Result<String, TokenError> {
    let mut bytes = Zeroizing::new([0u8; REFRESH_VALUE_BYTES]);
    OsRng
        .try_fill_bytes(bytes.as_mut_slice())
        .map_err(|err| TokenError::Randomness(err.to_string()))?;
    Ok(STANDARD.encode(bytes.as_slice()))
}
