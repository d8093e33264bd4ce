use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, Salt, SaltString,
    },
};
use rand::{TryRngCore, rngs::OsRng};
use std::fmt;
use thiserror::Error;
use tracing::warn;
use zeroize::Zeroizing;

/// Salted, adaptive password hashing (argon2id).
///
/// The salt is embedded in the PHC string returned by [`hash`], so a stored
/// hash is self-describing. An optional server-side pepper is appended to
/// the secret before hashing. Verification of an unknown account runs
/// against a dummy hash so that response time does not reveal whether the
/// account exists.
///
/// [`hash`]: CredentialHasher::hash
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    pepper: Zeroizing<Vec<u8>>,
    dummy_hash: String,
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("invalid Argon2 parameters: {0}")]
    InvalidParams(String),
    #[error("password hashing error: {0}")]
    Hashing(String),
}

impl From<PasswordHashError> for CredentialError {
    fn from(err: PasswordHashError) -> Self {
        CredentialError::Hashing(err.to_string())
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("params", self.argon2.params())
            .field("peppered", &!self.pepper.is_empty())
            .finish()
    }
}

impl CredentialHasher {
    /// ~64 MiB memory and 3 iterations; a solid server baseline.
    pub const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
    pub const DEFAULT_ITERATIONS: u32 = 3;
    pub const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = Salt::RECOMMENDED_LENGTH;
    const DUMMY_SECRET: &'static str = "geoauth-timing-equaliser";

    /// Hasher with default argon2id parameters and no pepper.
    pub fn new() -> Result<Self, CredentialError> {
        Self::with_params(
            Self::DEFAULT_MEMORY_KIB,
            Self::DEFAULT_ITERATIONS,
            Self::DEFAULT_PARALLELISM,
        )
    }

    /// Hasher with caller-chosen cost parameters (constrained hosts, tests).
    pub fn with_params(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, CredentialError> {
        let params = ParamsBuilder::new()
            .m_cost(memory_kib)
            .t_cost(iterations)
            .p_cost(parallelism)
            .output_len(32)
            .build()
            .map_err(|err| CredentialError::InvalidParams(err.to_string()))?;

        Self::from_params(params, Vec::new())
    }

    /// Append a server-side pepper to every secret before hashing.
    ///
    /// Hashes produced without the pepper no longer verify afterwards.
    pub fn with_pepper(
        self,
        pepper: impl AsRef<[u8]>,
    ) -> Result<Self, CredentialError> {
        let params = self.argon2.params().clone();
        Self::from_params(params, pepper.as_ref().to_vec())
    }

    fn from_params(
        params: Params,
        pepper: Vec<u8>,
    ) -> Result<Self, CredentialError> {
        let mut hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::default(), params),
            pepper: Zeroizing::new(pepper),
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(Self::DUMMY_SECRET)?;
        Ok(hasher)
    }

    /// Hash a secret with a fresh random salt. Two calls with the same input
    /// never return the same string.
    pub fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let material = self.peppered(secret);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| CredentialError::Hashing(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)?;

        Ok(self.argon2.hash_password(&material, &salt)?.to_string())
    }

    /// Check a secret against a stored PHC hash.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, secret: &str, stored_hash: &str) -> bool {
        let parsed = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "stored credential hash is malformed");
                return false;
            }
        };

        let material = self.peppered(secret);
        self.argon2.verify_password(&material, &parsed).is_ok()
    }

    /// Burn one verification against the dummy hash. Used when the account
    /// being authenticated does not exist.
    pub fn verify_dummy(&self, secret: &str) {
        let _ = self.verify(secret, &self.dummy_hash);
    }

    fn peppered(&self, secret: &str) -> Zeroizing<Vec<u8>> {
        let mut material =
            Zeroizing::new(Vec::with_capacity(secret.len() + self.pepper.len()));
        material.extend_from_slice(secret.as_bytes());
        material.extend_from_slice(&self.pepper);
        material
    }
}
