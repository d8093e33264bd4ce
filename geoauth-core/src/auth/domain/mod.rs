pub mod repositories;
pub mod services;
pub mod user;
pub mod value_objects;

pub use repositories::{DuplicateUser, RefreshTokenRepository, UserRepository};
pub use user::{NewUser, User, UserId, UserIdentity};
pub use value_objects::{NewRefreshToken, RefreshPolicy, RefreshTokenRecord};
