use std::sync::Arc;

use axum::{routing::get, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use cadastral_resolver::{
    routes::resolver::{simulate_resolution, SimulatorSettings},
    telemetry,
};

/// Environment for the standalone simulator.
#[derive(Debug, Deserialize)]
struct MockConfig {
    #[serde(default = "default_port")]
    port: u16,

    /// Longest simulated processing time, in seconds.
    #[serde(default = "default_delay_max")]
    delay_max: u64,
}

fn default_port() -> u16 {
    8081
}

fn default_delay_max() -> u64 {
    60
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config: MockConfig = envy::from_env().expect("Failed to load mock resolver configuration");

    telemetry::init_tracing("info", false);

    let settings = Arc::new(SimulatorSettings::new(1, config.delay_max));
    let app: Router = Router::new()
        .route("/api/result", post(simulate_resolution))
        .with_state(settings)
        .route("/ping", get(ping))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!(delay_max = config.delay_max, "Mock resolver listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}

async fn ping() -> Json<Value> {
    Json(json!({ "message": "mock server is running" }))
}
