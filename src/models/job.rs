use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a cadastral lookup job.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// WGS84 coordinates of the parcel being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// A lifecycle write applied to a job.
///
/// Each variant carries exactly the data its target status allows, so a
/// `result` can only ever be written together with `completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Processing,
    Completed { matched: bool },
    Failed,
}

impl Transition {
    pub fn status(self) -> JobStatus {
        match self {
            Transition::Processing => JobStatus::Processing,
            Transition::Completed { .. } => JobStatus::Completed,
            Transition::Failed => JobStatus::Failed,
        }
    }

    pub fn result(self) -> Option<bool> {
        match self {
            Transition::Completed { matched } => Some(matched),
            _ => None,
        }
    }

    /// The only status this transition may be applied from.
    pub fn from_status(self) -> JobStatus {
        match self {
            Transition::Processing => JobStatus::Pending,
            Transition::Completed { .. } | Transition::Failed => JobStatus::Processing,
        }
    }
}

/// A cadastral lookup job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadastralJob {
    pub id: Uuid,
    pub identifier: String,
    pub location: Location,
    pub status: JobStatus,
    pub result: Option<bool>,
    pub owner: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl CadastralJob {
    /// Build a fresh `pending` job with a time-ordered id.
    pub fn new(identifier: impl Into<String>, location: Location, owner: Option<Uuid>) -> Self {
        Self {
            id: Uuid::now_v7(),
            identifier: identifier.into(),
            location,
            status: JobStatus::Pending,
            result: None,
            owner,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Apply a transition in place. Callers check `from_status` first.
    pub fn apply(&mut self, transition: Transition, at: DateTime<Utc>) {
        self.status = transition.status();
        self.result = transition.result();
        self.completed_at = transition.status().is_terminal().then_some(at);
    }
}
