//! Persistence seams for jobs and accounts.
//!
//! The coordinator and the HTTP layer only ever see these traits. Postgres
//! (`crate::db::PgStore`) is the production backend; `memory::MemoryStore`
//! backs local development without a database and the test suite.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::job::{CadastralJob, JobStatus, Transition};

pub mod memory;

/// Page of history results, already clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    page: i64,
    page_size: i64,
}

impl Page {
    pub const DEFAULT_SIZE: i64 = 20;
    pub const MAX_SIZE: i64 = 100;

    /// `page` is 1-based. Missing or non-positive values fall back to defaults.
    pub fn new(page: Option<i64>, page_size: Option<i64>) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .unwrap_or(Self::DEFAULT_SIZE)
            .min(Self::MAX_SIZE);
        Self { page, page_size }
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record {0} already exists")]
    Conflict(String),

    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job {id} cannot move to {to} while {from}")]
    InvalidTransition {
        id: Uuid,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable CRUD over cadastral jobs. No business logic lives here beyond
/// refusing transitions from the wrong predecessor state.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job. Fails with `Conflict` when the id is taken.
    async fn insert(&self, job: &CadastralJob) -> Result<(), StoreError>;

    /// Atomically write status, result and completion time for one job.
    async fn update_status(&self, id: Uuid, transition: Transition) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<CadastralJob>, StoreError>;

    /// Newest-first page of jobs, optionally restricted to one owner.
    async fn list_by_owner(
        &self,
        owner: Option<Uuid>,
        page: Page,
    ) -> Result<Vec<CadastralJob>, StoreError>;

    /// Every job for a cadastral number, newest first, optionally restricted to one owner.
    async fn list_by_identifier(
        &self,
        identifier: &str,
        owner: Option<Uuid>,
    ) -> Result<Vec<CadastralJob>, StoreError>;

    /// Connectivity check for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_account(&self, account: &Account) -> Result<(), StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        let page = Page::default();
        assert_eq!(page.limit(), 20);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_offset() {
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.limit(), 10);
        assert_eq!(page.offset(), 20);
    }

    #[test]
    fn test_page_never_negative() {
        let page = Page::new(Some(0), Some(-5));
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), Page::DEFAULT_SIZE);

        let page = Page::new(Some(-7), Some(10));
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_size_capped() {
        assert_eq!(Page::new(Some(1), Some(10_000)).limit(), Page::MAX_SIZE);
    }

    #[test]
    fn test_huge_page_saturates() {
        let page = Page::new(Some(i64::MAX), Some(100));
        assert!(page.offset() >= 0);
    }
}
