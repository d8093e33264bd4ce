//! Configuration for geoauth.
//!
//! Settings come from a TOML file, environment variables (which win) and an
//! optional `.env` file loaded first. The result is validated once and then
//! treated as immutable for the life of the process.

pub mod loader;
pub mod models;
pub mod sources;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader};
pub use models::{
    AuthConfig, Config, ConfigMetadata, CorsConfig, DatabaseConfig, JwtConfig,
    ServerConfig,
};
pub use validation::{ConfigGuardRailError, ConfigWarning, ConfigWarnings};
