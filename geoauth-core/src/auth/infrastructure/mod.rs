//! Repository implementations

mod memory;
#[cfg(feature = "database")]
pub mod postgres;

pub use memory::InMemoryAuthStore;
#[cfg(feature = "database")]
pub use postgres::{PostgresRefreshTokenRepository, PostgresUserRepository};
