use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

use crate::db::PoolSettings;
use crate::services::coordinator::CoordinatorConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string. Without one, jobs live in memory only.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_database_max_connections")]
    pub database_max_connections: u32,

    #[serde(default = "default_database_min_connections")]
    pub database_min_connections: u32,

    /// Seconds a request waits for a free pooled connection.
    #[serde(default = "default_database_acquire_timeout_secs")]
    pub database_acquire_timeout_secs: u64,

    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// "production" switches logs to JSON and enables secret checks.
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_true")]
    pub docs_enabled: bool,

    /// Require bearer tokens on query and history endpoints.
    #[serde(default)]
    pub auth_enabled: bool,

    /// HS256 signing secret for bearer tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    /// bcrypt cost for newly registered passwords.
    #[serde(default = "default_password_hash_cost")]
    pub password_hash_cost: u32,

    /// External resolver endpoint. Defaults to this server's own simulator.
    #[serde(default)]
    pub external_server_url: Option<String>,

    #[serde(default = "default_resolver_timeout_secs")]
    pub resolver_timeout_secs: u64,

    /// Jobs resolved concurrently.
    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,

    /// Accepted jobs allowed to wait for a worker before submissions get 503.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// How long shutdown waits for in-flight jobs.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Upper bound of the built-in simulator's artificial delay.
    #[serde(default = "default_simulator_delay_max_secs")]
    pub simulator_delay_max_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_database_max_connections() -> u32 {
    20
}

fn default_database_min_connections() -> u32 {
    2
}

fn default_database_acquire_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_true() -> bool {
    true
}

fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}

fn default_password_hash_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_resolver_timeout_secs() -> u64 {
    crate::services::resolver::DEFAULT_TIMEOUT.as_secs()
}

fn default_worker_concurrency() -> usize {
    32
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_shutdown_grace_secs() -> u64 {
    75
}

fn default_simulator_delay_max_secs() -> u64 {
    60
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_url: None,
            database_max_connections: default_database_max_connections(),
            database_min_connections: default_database_min_connections(),
            database_acquire_timeout_secs: default_database_acquire_timeout_secs(),
            log_level: default_log_level(),
            environment: default_environment(),
            docs_enabled: true,
            auth_enabled: false,
            jwt_secret: default_jwt_secret(),
            password_hash_cost: default_password_hash_cost(),
            external_server_url: None,
            resolver_timeout_secs: default_resolver_timeout_secs(),
            worker_concurrency: default_worker_concurrency(),
            queue_capacity: default_queue_capacity(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            simulator_delay_max_secs: default_simulator_delay_max_secs(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env::<Self>().map(Self::normalized)
    }

    /// Treat empty optional strings as unset.
    fn normalized(mut self) -> Self {
        self.database_url = self.database_url.filter(|s| !s.trim().is_empty());
        self.external_server_url = self.external_server_url.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Where the coordinator sends lookups.
    pub fn resolver_endpoint(&self) -> String {
        if let Some(url) = &self.external_server_url {
            return url.clone();
        }
        let port = self
            .bind_addr
            .parse::<SocketAddr>()
            .map(|addr| addr.port())
            .unwrap_or(8080);
        format!("http://127.0.0.1:{port}/api/result")
    }

    pub fn resolver_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// Whether shutdown waits long enough for a job that started just before it.
    pub fn grace_covers_resolution(&self) -> bool {
        self.shutdown_grace() > self.coordinator_config().resolve_deadline
    }

    pub fn pool_settings(&self) -> PoolSettings {
        let max_connections = self.database_max_connections.max(1);
        PoolSettings {
            max_connections,
            min_connections: self.database_min_connections.min(max_connections),
            acquire_timeout: Duration::from_secs(self.database_acquire_timeout_secs),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            concurrency: self.worker_concurrency,
            queue_capacity: self.queue_capacity,
            resolve_deadline: self.resolver_timeout() + Duration::from_secs(5),
        }
    }
}
