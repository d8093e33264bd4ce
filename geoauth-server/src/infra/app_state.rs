use std::{fmt, sync::Arc};

use geoauth_config::Config;
use geoauth_core::auth::AuthenticationService;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    auth_service: Arc<AuthenticationService>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        auth_service: Arc<AuthenticationService>,
    ) -> Self {
        Self {
            config,
            auth_service,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn auth(&self) -> &AuthenticationService {
        &self.auth_service
    }
}
