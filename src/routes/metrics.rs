use std::sync::Arc;

use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Register descriptions for every metric the service emits.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "cadastral_jobs_submitted_total",
        "Cadastral lookup jobs accepted"
    );
    metrics::describe_counter!(
        "cadastral_jobs_rejected_total",
        "Submissions refused because the job queue was full or draining"
    );
    metrics::describe_counter!(
        "cadastral_jobs_completed_total",
        "Jobs that reached the completed state"
    );
    metrics::describe_counter!(
        "cadastral_jobs_failed_total",
        "Jobs that reached the failed state, by reason: rejected, unavailable or shutdown"
    );
    metrics::describe_counter!(
        "cadastral_jobs_stalled_total",
        "Job runs abandoned because a lifecycle write failed"
    );
    metrics::describe_histogram!(
        "cadastral_resolver_seconds",
        "Wall time of a single external resolver call"
    );
    metrics::describe_gauge!(
        "cadastral_jobs_in_flight",
        "Jobs currently being resolved"
    );
}

/// GET /metrics: Prometheus text exposition.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
