//! Authentication for username/password accounts
//!
//! Passwords are verified against argon2id hashes, successful sign-ins get a
//! short-lived HS256 access token plus a long-lived opaque refresh token that
//! is persisted server-side and exchanged for new access tokens.

pub mod crypto;
pub mod domain;
pub mod infrastructure;
pub mod maintenance;
pub mod policy;
pub mod token;

pub use crypto::{CredentialError, CredentialHasher};
pub use domain::services::{
    AuthErrorKind, AuthSettings, AuthenticationError, AuthenticationService,
    SessionTokens,
};
pub use domain::user::{ADMIN_ROLE, DEFAULT_ROLE, User, UserId, UserIdentity};
pub use domain::value_objects::{RefreshPolicy, RefreshTokenRecord};
pub use maintenance::RefreshTokenSweeper;
pub use policy::{AccessDecision, RoleReport};
pub use token::{
    AccessClaims, AccessTokenService, ClaimsEncoding, IssuedToken, TokenError,
    TokenSettings,
};
