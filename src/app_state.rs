use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::auth::{self, JwtService};
use crate::services::coordinator::JobCoordinator;
use crate::store::{AccountStore, JobStore};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jobs: Arc<dyn JobStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub coordinator: Arc<JobCoordinator>,
    pub jwt: Arc<JwtService>,
    /// Checked on logins for unknown usernames. Empty when auth is disabled.
    pub decoy_hash: Arc<str>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        jobs: Arc<dyn JobStore>,
        accounts: Arc<dyn AccountStore>,
        coordinator: Arc<JobCoordinator>,
    ) -> Self {
        let jwt = JwtService::new(&config.jwt_secret);
        let decoy_hash = if config.auth_enabled {
            auth::decoy_hash(config.password_hash_cost).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to prepare decoy password hash");
                String::new()
            })
        } else {
            String::new()
        };
        Self {
            config: Arc::new(config),
            jobs,
            accounts,
            coordinator,
            jwt: Arc::new(jwt),
            decoy_hash: decoy_hash.into(),
        }
    }
}
