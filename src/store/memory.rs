use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::account::Account;
use crate::models::job::{CadastralJob, Transition};
use crate::store::{AccountStore, JobStore, Page, StoreError};

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<Uuid, CadastralJob>>,
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(jobs: &mut [CadastralJob]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert(&self, job: &CadastralJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(job.id.to_string()));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_status(&self, id: Uuid, transition: Transition) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if job.status != transition.from_status() {
            return Err(StoreError::InvalidTransition {
                id,
                from: job.status,
                to: transition.status(),
            });
        }

        job.apply(transition, Utc::now());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<CadastralJob>, StoreError> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn list_by_owner(
        &self,
        owner: Option<Uuid>,
        page: Page,
    ) -> Result<Vec<CadastralJob>, StoreError> {
        let mut matching: Vec<CadastralJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| owner.is_none() || job.owner == owner)
            .cloned()
            .collect();
        newest_first(&mut matching);

        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect())
    }

    async fn list_by_identifier(
        &self,
        identifier: &str,
        owner: Option<Uuid>,
    ) -> Result<Vec<CadastralJob>, StoreError> {
        let mut matching: Vec<CadastralJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.identifier == identifier)
            .filter(|job| owner.is_none() || job.owner == owner)
            .cloned()
            .collect();
        newest_first(&mut matching);
        Ok(matching)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn create_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.username) {
            return Err(StoreError::Conflict(account.username.clone()));
        }
        accounts.insert(account.username.clone(), account.clone());
        Ok(())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().await.get(username).cloned())
    }
}
