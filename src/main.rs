use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;

use cadastral_resolver::{
    app_state::AppState,
    config::AppConfig,
    db::{self, PgStore},
    routes,
    services::{coordinator::JobCoordinator, resolver::HttpResolver},
    store::{memory::MemoryStore, AccountStore, JobStore},
    telemetry,
};

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    telemetry::init_tracing(&config.log_level, config.is_production());

    tracing::info!(environment = %config.environment, "Initializing cadastral-resolver server");

    if config.is_production() && config.auth_enabled && config.jwt_secret == "change-me-in-production" {
        tracing::warn!("JWT_SECRET is the built-in default; set a real secret in production");
    }

    if !config.grace_covers_resolution() {
        tracing::warn!(
            shutdown_grace_secs = config.shutdown_grace_secs,
            resolver_timeout_secs = config.resolver_timeout_secs,
            "SHUTDOWN_GRACE_SECS does not exceed the resolver deadline; \
             jobs running at shutdown may be failed instead of resolved"
        );
    }

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe_metrics();

    let (jobs, accounts): (Arc<dyn JobStore>, Arc<dyn AccountStore>) = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to PostgreSQL database");
            let db_pool = db::init_pool(database_url, config.pool_settings())
                .await
                .expect("Failed to connect to database");

            tracing::info!("Running database migrations");
            db::run_migrations(&db_pool)
                .await
                .expect("Failed to run database migrations");

            let store = Arc::new(PgStore::new(db_pool));
            (store.clone() as Arc<dyn JobStore>, store as Arc<dyn AccountStore>)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, jobs are kept in memory and lost on restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone() as Arc<dyn JobStore>, store as Arc<dyn AccountStore>)
        }
    };

    let resolver = HttpResolver::new(config.resolver_endpoint(), config.resolver_timeout())
        .expect("Failed to initialize resolver client");
    tracing::info!(
        endpoint = %resolver.endpoint(),
        timeout_secs = config.resolver_timeout_secs,
        "Resolver client ready"
    );

    let coordinator = Arc::new(JobCoordinator::start(
        jobs.clone(),
        Arc::new(resolver),
        config.coordinator_config(),
    ));

    let bind_addr = config.bind_addr.clone();
    let shutdown_grace = config.shutdown_grace();
    let state = AppState::new(config, jobs, accounts, coordinator.clone());
    let app = routes::router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // HTTP is closed; let accepted jobs reach a terminal state.
    if !coordinator.shutdown(shutdown_grace).await {
        tracing::warn!("Shutdown grace expired, unfinished jobs were marked failed");
    }

    tracing::info!("Server exiting");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining");
}
