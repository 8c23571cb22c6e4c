use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::db::{is_unique_violation, PgStore};
use crate::models::job::{CadastralJob, JobStatus, Location, Transition};
use crate::store::{JobStore, Page, StoreError};

fn job_from_row(row: &PgRow) -> Result<CadastralJob, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str)
        .map_err(|_| StoreError::Corrupt(format!("unknown job status '{status_str}'")))?;

    Ok(CadastralJob {
        id: row.try_get("id")?,
        identifier: row.try_get("cadastral_number")?,
        location: Location {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        },
        status,
        result: row.try_get("result")?,
        owner: row.try_get("owner_id")?,
        created_at: row.try_get("created_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

#[async_trait]
impl JobStore for PgStore {
    async fn insert(&self, job: &CadastralJob) -> Result<(), StoreError> {
        let outcome = sqlx::query(
            r#"
            INSERT INTO cadastral_jobs
                (id, cadastral_number, latitude, longitude, status, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(job.id)
        .bind(&job.identifier)
        .bind(job.location.latitude)
        .bind(job.location.longitude)
        .bind(job.status.as_str())
        .bind(job.owner)
        .bind(job.created_at)
        .execute(self.pool())
        .await;

        match outcome {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(StoreError::Conflict(job.id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_status(&self, id: Uuid, transition: Transition) -> Result<(), StoreError> {
        let status = transition.status();

        // Guarded on the predecessor state so a terminal row is never rewritten.
        let updated = sqlx::query(
            r#"
            UPDATE cadastral_jobs
            SET status = $1,
                result = $2,
                completed_at = CASE WHEN $3 THEN NOW() ELSE NULL END
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(status.as_str())
        .bind(transition.result())
        .bind(status.is_terminal())
        .bind(id)
        .bind(transition.from_status().as_str())
        .execute(self.pool())
        .await?;

        if updated.rows_affected() == 1 {
            return Ok(());
        }

        let current = sqlx::query("SELECT status FROM cadastral_jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        match current {
            None => Err(StoreError::NotFound(id)),
            Some(row) => {
                let from: String = row.try_get("status")?;
                Err(StoreError::InvalidTransition {
                    id,
                    from: JobStatus::from_str(&from)
                        .map_err(|_| StoreError::Corrupt(format!("unknown job status '{from}'")))?,
                    to: status,
                })
            }
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<CadastralJob>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, cadastral_number, latitude, longitude, status, result, owner_id,
                   created_at, completed_at
            FROM cadastral_jobs
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_by_owner(
        &self,
        owner: Option<Uuid>,
        page: Page,
    ) -> Result<Vec<CadastralJob>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, cadastral_number, latitude, longitude, status, result, owner_id,
                   created_at, completed_at
            FROM cadastral_jobs
            WHERE ($1::uuid IS NULL OR owner_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn list_by_identifier(
        &self,
        identifier: &str,
        owner: Option<Uuid>,
    ) -> Result<Vec<CadastralJob>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, cadastral_number, latitude, longitude, status, result, owner_id,
                   created_at, completed_at
            FROM cadastral_jobs
            WHERE cadastral_number = $1
              AND ($2::uuid IS NULL OR owner_id = $2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(identifier)
        .bind(owner)
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(job_from_row).collect()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(self.pool()).await?;
        Ok(())
    }
}
