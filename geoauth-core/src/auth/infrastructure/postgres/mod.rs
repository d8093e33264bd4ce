mod refresh_tokens;
mod users;

pub use refresh_tokens::PostgresRefreshTokenRepository;
pub use users::PostgresUserRepository;
