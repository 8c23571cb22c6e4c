use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::middleware::Owner;
use crate::models::job::{CadastralJob, Location};
use crate::models::query::{HistoryParams, JobResponse, QueryRequest};
use crate::store::{Page, StoreError};

/// POST /api/v1/query: Accept a lookup and resolve it in the background.
pub async fn create_query(
    State(state): State<AppState>,
    Owner(owner): Owner,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<JobResponse>), ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let slot = state.coordinator.reserve().map_err(|e| {
        tracing::warn!(error = %e, "Rejecting query submission");
        metrics::counter!("cadastral_jobs_rejected_total").increment(1);
        ApiError::from(e)
    })?;

    let job = CadastralJob::new(
        request.cadastral_number.trim(),
        Location {
            latitude: request.latitude,
            longitude: request.longitude,
        },
        owner,
    );

    state.jobs.insert(&job).await.map_err(|e| match e {
        StoreError::Conflict(_) => ApiError::Conflict("query already exists".to_string()),
        other => ApiError::internal("failed to create query", &other),
    })?;

    metrics::counter!("cadastral_jobs_submitted_total").increment(1);
    tracing::info!(
        job_id = %job.id,
        cadastral_number = %job.identifier,
        authenticated = owner.is_some(),
        "Query accepted"
    );

    let response = JobResponse::from(&job);
    slot.dispatch(job);

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// GET /api/v1/query/{id}: Current state of a single job.
pub async fn get_query(
    State(state): State<AppState>,
    Owner(owner): Owner,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let Path(id) = path?;

    let job = state
        .jobs
        .get(id)
        .await
        .map_err(|e| ApiError::internal("failed to get query", &e))?
        .filter(|job| owner.is_none() || job.owner == owner)
        .ok_or_else(|| ApiError::NotFound(format!("query {id} not found")))?;

    Ok(Json(JobResponse::from(&job)))
}

/// GET /api/v1/history: The caller's jobs, newest first.
pub async fn history(
    State(state): State<AppState>,
    Owner(owner): Owner,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let Query(params) = params?;
    let page = Page::new(params.page, params.limit);

    let jobs = state
        .jobs
        .list_by_owner(owner, page)
        .await
        .map_err(|e| ApiError::internal("failed to get queries", &e))?;

    Ok(Json(jobs.iter().map(JobResponse::from).collect()))
}

/// GET /api/v1/history/{cadastral_number}: Every job for one parcel.
pub async fn history_by_cadastral(
    State(state): State<AppState>,
    Owner(owner): Owner,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<JobResponse>>, ApiError> {
    let Path(cadastral_number) = path?;
    let cadastral_number = cadastral_number.trim();
    if cadastral_number.is_empty() {
        return Err(ApiError::Validation("cadastral_number is required".to_string()));
    }

    let jobs = state
        .jobs
        .list_by_identifier(cadastral_number, owner)
        .await
        .map_err(|e| ApiError::internal("failed to get queries", &e))?;

    Ok(Json(jobs.iter().map(JobResponse::from).collect()))
}
