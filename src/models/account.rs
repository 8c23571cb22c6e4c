use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A registered user allowed to submit and query jobs when auth is enabled.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(username: impl Into<String>, password_hash: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            username: username.into(),
            password_hash,
            created_at: Utc::now(),
        }
    }
}
