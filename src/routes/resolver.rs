use std::sync::Arc;
use std::time::Duration;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use rand::Rng;

use crate::error::ApiError;
use crate::models::resolution::{ResolveRequest, ResolveResponse};

/// Delay bounds for the resolver simulator, in whole seconds.
#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    pub min_delay_secs: u64,
    pub max_delay_secs: u64,
}

impl SimulatorSettings {
    pub fn new(min_delay_secs: u64, max_delay_secs: u64) -> Self {
        Self {
            min_delay_secs,
            max_delay_secs: max_delay_secs.max(min_delay_secs),
        }
    }
}

/// POST /api/result: Stand-in for the external resolver.
///
/// Sleeps a random number of seconds within the configured bounds and then
/// answers with a random match. Left open even when auth is enabled.
pub async fn simulate_resolution(
    State(settings): State<Arc<SimulatorSettings>>,
    payload: Result<Json<ResolveRequest>, JsonRejection>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let Json(request) = payload?;

    let (delay_secs, result) = {
        let mut rng = rand::thread_rng();
        (
            rng.gen_range(settings.min_delay_secs..=settings.max_delay_secs),
            rng.gen_bool(0.5),
        )
    };

    tracing::info!(
        cadastral_number = %request.cadastral_number,
        delay_secs,
        "Simulating resolution"
    );
    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
    tracing::info!(cadastral_number = %request.cadastral_number, result, "Simulated resolution done");

    Ok(Json(ResolveResponse {
        result,
        delay: delay_secs as f64,
    }))
}
