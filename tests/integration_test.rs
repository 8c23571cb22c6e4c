use std::sync::Arc;
use std::time::Duration;

use cadastral_resolver::{
    db::{self, PgStore},
    models::{
        account::Account,
        job::{CadastralJob, JobStatus, Location, Transition},
    },
    services::coordinator::{FailureReason, JobCoordinator, JobOutcome, JobRunner},
    store::{AccountStore, JobStore, Page, StoreError},
};
use uuid::Uuid;

mod helpers;

use helpers::{coordinator_config, wait_for_terminal, StubBehavior, StubResolver};

async fn connect() -> Arc<PgStore> {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = db::init_pool(&database_url, db::PoolSettings::default())
        .await
        .expect("Failed to connect to database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    Arc::new(PgStore::new(pool))
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

fn job(identifier: &str, owner: Option<Uuid>) -> CadastralJob {
    CadastralJob::new(
        identifier,
        Location {
            latitude: 55.7558,
            longitude: 37.6173,
        },
        owner,
    )
}

/// Integration test: job lifecycle against PostgreSQL
///
/// Covers schema, guarded transitions and history queries.
///
/// Note: This requires a running PostgreSQL instance configured via
/// DATABASE_URL.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_pg_job_lifecycle() {
    let store = connect().await;
    store.ping().await.expect("ping failed");

    let identifier = unique("77:01:0001001");
    let created = job(&identifier, None);
    store.insert(&created).await.expect("insert failed");

    let fetched = store.get(created.id).await.unwrap().expect("job not found");
    assert_eq!(fetched.status, JobStatus::Pending);
    assert_eq!(fetched.identifier, identifier);
    assert!(fetched.result.is_none());

    // Terminal states cannot be reached without passing through processing.
    let skipped = store
        .update_status(created.id, Transition::Completed { matched: true })
        .await;
    assert!(matches!(skipped, Err(StoreError::InvalidTransition { .. })));

    store
        .update_status(created.id, Transition::Processing)
        .await
        .expect("processing transition failed");
    let processing = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(processing.status, JobStatus::Processing);
    assert!(processing.completed_at.is_none());

    store
        .update_status(created.id, Transition::Completed { matched: false })
        .await
        .expect("completion failed");
    let completed = store.get(created.id).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.result, Some(false));
    assert!(completed.completed_at.is_some());

    // Terminal is final.
    let regressed = store.update_status(created.id, Transition::Failed).await;
    assert!(matches!(regressed, Err(StoreError::InvalidTransition { .. })));

    let missing = store.update_status(Uuid::new_v4(), Transition::Processing).await;
    assert!(matches!(missing, Err(StoreError::NotFound(_))));

    let duplicate = store.insert(&created).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_pg_history_is_scoped_and_ordered() {
    let store = connect().await;

    let account = Account::new(unique("user"), "not-a-real-hash".to_string());
    store.create_account(&account).await.expect("create account failed");
    let found = store
        .find_by_username(&account.username)
        .await
        .unwrap()
        .expect("account not found");
    assert_eq!(found.id, account.id);

    let identifier = unique("78:34:0004281");
    let first = job(&identifier, Some(account.id));
    store.insert(&first).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = job(&identifier, Some(account.id));
    store.insert(&second).await.unwrap();
    store.insert(&job(&identifier, None)).await.unwrap();

    let owned = store
        .list_by_identifier(&identifier, Some(account.id))
        .await
        .unwrap();
    let ids: Vec<_> = owned.iter().map(|j| j.id).collect();
    assert_eq!(ids, [second.id, first.id]);

    let all = store.list_by_identifier(&identifier, None).await.unwrap();
    assert_eq!(all.len(), 3);

    let page = store
        .list_by_owner(Some(account.id), Page::new(Some(1), Some(1)))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, second.id);

    let duplicate = store.create_account(&account).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_pg_coordinator_round_trip() {
    let store = connect().await;

    let runner = JobRunner::new(
        store.clone(),
        Arc::new(StubResolver::new(StubBehavior::Status(503))),
        Duration::from_secs(1),
    );
    let failing = job(&unique("fail"), None);
    store.insert(&failing).await.unwrap();
    assert_eq!(
        runner.run(failing.clone()).await,
        JobOutcome::Failed(FailureReason::Rejected)
    );

    let coordinator = JobCoordinator::start(
        store.clone(),
        Arc::new(StubResolver::new(StubBehavior::Match(true))),
        coordinator_config(2, 8),
    );
    let slot = coordinator.reserve().unwrap();
    let accepted = job(&unique("ok"), None);
    store.insert(&accepted).await.unwrap();
    slot.dispatch(accepted.clone());

    let done = wait_for_terminal(store.as_ref(), accepted.id, Duration::from_secs(5)).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.result, Some(true));

    assert!(coordinator.shutdown(Duration::from_secs(5)).await);
}
