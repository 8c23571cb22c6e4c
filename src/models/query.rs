use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{CadastralJob, JobStatus};

/// Request to look up a cadastral parcel.
#[derive(Debug, Deserialize, Validate)]
pub struct QueryRequest {
    #[garde(length(max = 255), custom(not_blank))]
    pub cadastral_number: String,

    #[garde(range(min = -90.0, max = 90.0))]
    pub latitude: f64,

    #[garde(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        return Err(garde::Error::new("is required"));
    }
    Ok(())
}

/// Job as returned to API callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobResponse {
    pub id: Uuid,
    pub cadastral_number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&CadastralJob> for JobResponse {
    fn from(job: &CadastralJob) -> Self {
        Self {
            id: job.id,
            cadastral_number: job.identifier.clone(),
            latitude: job.location.latitude,
            longitude: job.location.longitude,
            status: job.status,
            result: job.result,
            created_at: job.created_at,
            completed_at: job.completed_at,
        }
    }
}

/// `?page=&limit=` on the history endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[garde(length(min = 1, max = 255))]
    pub username: String,

    #[garde(length(min = 1, max = 128))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[garde(ascii, length(min = 3, max = 64))]
    pub username: String,

    #[garde(length(min = 8, max = 72))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
