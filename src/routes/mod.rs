use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::middleware::require_auth;

pub mod auth;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod queries;
pub mod resolver;

use resolver::SimulatorSettings;

/// Build the full HTTP surface.
pub fn router(state: AppState, prometheus: Arc<PrometheusHandle>) -> Router {
    let simulator = Arc::new(SimulatorSettings::new(0, state.config.simulator_delay_max_secs));
    let docs_enabled = state.config.docs_enabled;

    let mut jobs = Router::new()
        .route("/query", post(queries::create_query))
        .route("/query/{id}", get(queries::get_query))
        .route("/history", get(queries::history))
        .route("/history/{cadastral_number}", get(queries::history_by_cadastral));
    if state.config.auth_enabled {
        jobs = jobs.route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));
    }

    let api = Router::new()
        .route("/ping", get(health::ping))
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .merge(jobs);

    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", api)
        .with_state(state)
        // Resolver simulator stays open regardless of auth
        .route(
            "/api/result",
            post(resolver::simulate_resolution).with_state(simulator),
        )
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(prometheus),
        );

    if docs_enabled {
        app = app.route("/swagger", get(docs::index));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
}
