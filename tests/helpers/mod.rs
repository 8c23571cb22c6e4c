//! Test helper utilities: stub resolvers, an in-memory app and polling

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cadastral_resolver::{
    app_state::AppState,
    config::AppConfig,
    models::job::CadastralJob,
    routes,
    services::{
        coordinator::{CoordinatorConfig, JobCoordinator},
        resolver::{Resolution, Resolver, ResolverError},
    },
    store::{memory::MemoryStore, JobStore},
};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde_json::Value;
use tokio::time::{sleep, Instant};
use tower::ServiceExt;
use uuid::Uuid;

/// What a [`StubResolver`] answers.
#[derive(Debug, Clone, Copy)]
pub enum StubBehavior {
    Match(bool),
    Status(u16),
    Hang,
}

/// Resolver double with a fixed answer and optional latency.
pub struct StubResolver {
    behavior: StubBehavior,
    delay: Duration,
    calls: AtomicUsize,
}

impl StubResolver {
    pub fn new(behavior: StubBehavior) -> Self {
        Self::delayed(behavior, Duration::ZERO)
    }

    pub fn delayed(behavior: StubBehavior, delay: Duration) -> Self {
        Self {
            behavior,
            delay,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for StubResolver {
    async fn resolve(&self, _job: &CadastralJob) -> Result<Resolution, ResolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.delay).await;
        match self.behavior {
            StubBehavior::Match(matched) => Ok(Resolution {
                matched,
                elapsed: self.delay,
            }),
            StubBehavior::Status(code) => Err(ResolverError::Status(code)),
            StubBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Decides by cadastral number: `fail-*` errors, `*-no` does not match,
/// anything else matches. Records peak concurrency.
pub struct ScriptedResolver {
    delay: Duration,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Resolver for ScriptedResolver {
    async fn resolve(&self, job: &CadastralJob) -> Result<Resolution, ResolverError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        sleep(self.delay).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if job.identifier.starts_with("fail-") {
            Err(ResolverError::Status(500))
        } else {
            Ok(Resolution {
                matched: !job.identifier.ends_with("-no"),
                elapsed: self.delay,
            })
        }
    }
}

pub fn coordinator_config(concurrency: usize, queue_capacity: usize) -> CoordinatorConfig {
    CoordinatorConfig {
        concurrency,
        queue_capacity,
        resolve_deadline: Duration::from_millis(500),
    }
}

/// Application wired to an in-memory store and a test resolver.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        // Lowest cost bcrypt accepts; keeps registration tests fast.
        password_hash_cost: 4,
        jwt_secret: "test-secret".to_string(),
        simulator_delay_max_secs: 0,
        ..AppConfig::default()
    }
}

pub fn build_app(config: AppConfig, resolver: Arc<dyn Resolver>) -> TestApp {
    build_app_with(config, resolver, coordinator_config(8, 64))
}

pub fn build_app_with(
    config: AppConfig,
    resolver: Arc<dyn Resolver>,
    coordinator: CoordinatorConfig,
) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let coordinator = Arc::new(JobCoordinator::start(store.clone(), resolver, coordinator));
    let state = AppState::new(config, store.clone(), store.clone(), coordinator);
    let prometheus = Arc::new(PrometheusBuilder::new().build_recorder().handle());
    let router = routes::router(state.clone(), prometheus);

    TestApp {
        router,
        state,
        store,
    }
}

/// Send a request through the router and decode the JSON body (Null if empty).
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Poll the store until the job is terminal or the timeout elapses.
pub async fn wait_for_terminal(
    store: &dyn JobStore,
    id: Uuid,
    timeout: Duration,
) -> CadastralJob {
    let deadline = Instant::now() + timeout;
    loop {
        let job = store
            .get(id)
            .await
            .expect("store read failed")
            .expect("job disappeared");
        if job.status.is_terminal() {
            return job;
        }
        assert!(
            Instant::now() < deadline,
            "job {id} still {} after {:?}",
            job.status,
            timeout
        );
        sleep(Duration::from_millis(10)).await;
    }
}

/// Check the result/completion invariants on a stored job.
pub fn assert_consistent(job: &CadastralJob) {
    use cadastral_resolver::models::job::JobStatus;

    assert_eq!(
        job.result.is_some(),
        job.status == JobStatus::Completed,
        "result presence must track completed status: {job:?}"
    );
    assert_eq!(
        job.completed_at.is_some(),
        job.status.is_terminal(),
        "completed_at presence must track terminal status: {job:?}"
    );
}

/// Poll a running server until the job leaves `pending`/`processing`.
pub async fn poll_job_status(
    client: &reqwest::Client,
    base_url: &str,
    id: &str,
    token: Option<&str>,
    timeout: Duration,
) -> Result<Value, String> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut request = client.get(format!("{base_url}/api/v1/query/{id}"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let body: Value = request
            .send()
            .await
            .map_err(|e| format!("status request failed: {e}"))?
            .json()
            .await
            .map_err(|e| format!("status response unreadable: {e}"))?;

        match body["status"].as_str() {
            Some("completed") | Some("failed") => return Ok(body),
            Some(_) if Instant::now() < deadline => sleep(Duration::from_secs(1)).await,
            Some(status) => return Err(format!("job {id} still {status} after {timeout:?}")),
            None => return Err(format!("unexpected response: {body}")),
        }
    }
}
