//! Job lifecycle coordinator.
//!
//! Accepted jobs go through a bounded in-process queue to a dispatcher task
//! that runs at most `concurrency` of them at once. Each job is driven
//! `pending -> processing -> completed | failed` by exactly one task, which
//! is the only writer for that job.
//!
//! Shutdown has two stages. First intake stops and everything accepted is
//! still resolved. If that outlasts the grace period, the remaining jobs are
//! abandoned: in-flight and queued jobs alike get a `failed` write so none is
//! left `pending` or `processing`.
//!
//! ```text
//! submit ──reserve()──► queue (bounded) ──► dispatcher ──semaphore──► run_job
//!                                                                      │
//!                       store ◄── processing ◄─────────────────────────┤
//!                       store ◄── completed / failed ◄── resolver ◄────┘
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::{self, error::TrySendError, OwnedPermit};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::models::job::{CadastralJob, Transition};
use crate::services::resolver::{Resolver, ResolverError};
use crate::store::JobStore;

/// How long abandoned jobs get to record their `failed` state.
const ABANDON_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum number of jobs talking to the resolver at once.
    pub concurrency: usize,
    /// Accepted jobs waiting for a free worker slot.
    pub queue_capacity: usize,
    /// Hard ceiling on a single resolver call, whatever the resolver does.
    pub resolve_deadline: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 32,
            queue_capacity: 1024,
            resolve_deadline: crate::services::resolver::DEFAULT_TIMEOUT + Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("job queue is full")]
    QueueFull,

    #[error("service is shutting down")]
    ShuttingDown,
}

/// How a single run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { matched: bool },
    Failed(FailureReason),
    /// A lifecycle write failed; the job was left in its last persisted state.
    Stalled,
}

/// Why a run ended in `failed`. Exported as the `reason` metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum FailureReason {
    /// The resolver answered but refused or garbled the request.
    Rejected,
    /// Timeout or transport failure.
    Unavailable,
    /// Shutdown grace ran out first.
    Shutdown,
}

impl From<&ResolverError> for FailureReason {
    fn from(e: &ResolverError) -> Self {
        if e.is_rejection() {
            FailureReason::Rejected
        } else {
            FailureReason::Unavailable
        }
    }
}

/// Snapshot of coordinator load for health reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct CoordinatorLoad {
    pub queued: usize,
    pub queue_capacity: usize,
    pub in_flight: usize,
    pub concurrency: usize,
    pub accepting: bool,
}

/// A reserved queue slot. Dropping it without dispatching releases the slot.
pub struct DispatchSlot {
    permit: OwnedPermit<CadastralJob>,
}

impl DispatchSlot {
    /// Hand the job to the coordinator. Never blocks.
    pub fn dispatch(self, job: CadastralJob) {
        debug!(job_id = %job.id, "job handed to coordinator");
        self.permit.send(job);
    }
}

/// Drives a single job through its lifecycle.
#[derive(Clone)]
pub struct JobRunner {
    store: Arc<dyn JobStore>,
    resolver: Arc<dyn Resolver>,
    resolve_deadline: Duration,
    abandon: CancellationToken,
}

impl JobRunner {
    pub fn new(
        store: Arc<dyn JobStore>,
        resolver: Arc<dyn Resolver>,
        resolve_deadline: Duration,
    ) -> Self {
        Self {
            store,
            resolver,
            resolve_deadline,
            abandon: CancellationToken::new(),
        }
    }

    pub async fn run(&self, job: CadastralJob) -> JobOutcome {
        let job_id = job.id;

        if let Err(outcome) = self.mark_processing(job_id).await {
            return outcome;
        }

        info!(
            job_id = %job_id,
            cadastral_number = %job.identifier,
            "Resolving cadastral job"
        );

        let started = Instant::now();
        let resolve = tokio::time::timeout(self.resolve_deadline, self.resolver.resolve(&job));
        let resolved = tokio::select! {
            biased;
            _ = self.abandon.cancelled() => None,
            result = resolve => Some(result.unwrap_or(Err(ResolverError::Timeout))),
        };
        metrics::histogram!("cadastral_resolver_seconds").record(started.elapsed().as_secs_f64());

        match resolved {
            Some(Ok(resolution)) => {
                info!(
                    job_id = %job_id,
                    matched = resolution.matched,
                    resolver_elapsed_ms = resolution.elapsed.as_millis() as u64,
                    "Resolver answered"
                );
                self.finish(
                    job_id,
                    Transition::Completed {
                        matched: resolution.matched,
                    },
                    None,
                )
                .await
            }
            Some(Err(e)) => {
                warn!(job_id = %job_id, kind = e.kind(), error = %e, "Resolver call failed");
                self.finish(job_id, Transition::Failed, Some(FailureReason::from(&e)))
                    .await
            }
            None => {
                warn!(job_id = %job_id, "Shutdown grace expired while resolving, failing job");
                self.finish(job_id, Transition::Failed, Some(FailureReason::Shutdown)).await
            }
        }
    }

    /// Record `failed` for a job that was accepted but will never be resolved.
    ///
    /// Still passes through `processing` so the write order matches a normal run.
    pub async fn abandon(&self, job: CadastralJob) -> JobOutcome {
        warn!(
            job_id = %job.id,
            cadastral_number = %job.identifier,
            "Shutdown grace expired before job started, failing job"
        );
        if let Err(outcome) = self.mark_processing(job.id).await {
            return outcome;
        }
        self.finish(job.id, Transition::Failed, Some(FailureReason::Shutdown)).await
    }

    async fn mark_processing(&self, job_id: Uuid) -> Result<(), JobOutcome> {
        if let Err(e) = self.store.update_status(job_id, Transition::Processing).await {
            // No transition may skip `processing`, so the job keeps whatever
            // state the store holds and is reported as stalled.
            error!(job_id = %job_id, error = %e, "Failed to mark job as processing, abandoning run");
            metrics::counter!("cadastral_jobs_stalled_total", "stage" => "processing").increment(1);
            return Err(JobOutcome::Stalled);
        }
        Ok(())
    }

    /// Write the terminal state. `reason` labels failures in metrics.
    async fn finish(
        &self,
        job_id: Uuid,
        transition: Transition,
        reason: Option<FailureReason>,
    ) -> JobOutcome {
        if let Err(e) = self.store.update_status(job_id, transition).await {
            error!(
                job_id = %job_id,
                status = %transition.status(),
                error = %e,
                "Failed to record terminal state, job stays in processing"
            );
            metrics::counter!("cadastral_jobs_stalled_total", "stage" => "terminal").increment(1);
            return JobOutcome::Stalled;
        }

        match transition {
            Transition::Completed { matched } => {
                metrics::counter!("cadastral_jobs_completed_total").increment(1);
                JobOutcome::Completed { matched }
            }
            _ => {
                let reason = reason.unwrap_or(FailureReason::Unavailable);
                let label: &'static str = reason.into();
                metrics::counter!("cadastral_jobs_failed_total", "reason" => label).increment(1);
                JobOutcome::Failed(reason)
            }
        }
    }
}

/// Bounded, drainable dispatcher for cadastral jobs.
pub struct JobCoordinator {
    sender: mpsc::Sender<CadastralJob>,
    limiter: Arc<Semaphore>,
    config: CoordinatorConfig,
    cancel: CancellationToken,
    abandon: CancellationToken,
    tracker: TaskTracker,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl JobCoordinator {
    /// Spawn the dispatcher on the current runtime.
    pub fn start(
        store: Arc<dyn JobStore>,
        resolver: Arc<dyn Resolver>,
        config: CoordinatorConfig,
    ) -> Self {
        let config = CoordinatorConfig {
            concurrency: config.concurrency.max(1),
            queue_capacity: config.queue_capacity.max(1),
            ..config
        };

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let limiter = Arc::new(Semaphore::new(config.concurrency));
        let cancel = CancellationToken::new();
        let abandon = CancellationToken::new();
        let tracker = TaskTracker::new();
        let runner = JobRunner {
            abandon: abandon.clone(),
            ..JobRunner::new(store, resolver, config.resolve_deadline)
        };

        let dispatcher = tokio::spawn(dispatch_loop(
            receiver,
            runner,
            limiter.clone(),
            tracker.clone(),
            cancel.clone(),
            abandon.clone(),
        ));

        info!(
            concurrency = config.concurrency,
            queue_capacity = config.queue_capacity,
            "Job coordinator started"
        );

        Self {
            sender,
            limiter,
            config,
            cancel,
            abandon,
            tracker,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Reserve room for one job before it is persisted.
    ///
    /// Reserving first means a full queue rejects the submission outright
    /// instead of leaving an inserted job that nobody will pick up.
    pub fn reserve(&self) -> Result<DispatchSlot, DispatchError> {
        if self.cancel.is_cancelled() {
            return Err(DispatchError::ShuttingDown);
        }

        match self.sender.clone().try_reserve_owned() {
            Ok(permit) => Ok(DispatchSlot { permit }),
            Err(TrySendError::Full(_)) => Err(DispatchError::QueueFull),
            Err(TrySendError::Closed(_)) => Err(DispatchError::ShuttingDown),
        }
    }

    pub fn load(&self) -> CoordinatorLoad {
        CoordinatorLoad {
            queued: self.config.queue_capacity - self.sender.capacity(),
            queue_capacity: self.config.queue_capacity,
            in_flight: self.config.concurrency - self.limiter.available_permits(),
            concurrency: self.config.concurrency,
            accepting: !self.cancel.is_cancelled(),
        }
    }

    /// Stop accepting jobs, run everything already accepted to a terminal
    /// write, and wait up to `grace` for that to finish.
    ///
    /// When the grace period runs out, jobs still queued or in flight are
    /// failed instead of resolved. Returns `false` in that case.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!(load = ?self.load(), "Draining job coordinator");
        self.cancel.cancel();

        let mut dispatcher = self.dispatcher.lock().await.take();
        let drain = async {
            if let Some(handle) = dispatcher.as_mut() {
                if let Err(e) = handle.await {
                    error!(error = %e, "Job dispatcher panicked");
                }
            }
            dispatcher = None;
            self.tracker.close();
            self.tracker.wait().await;
        };

        if tokio::time::timeout(grace, drain).await.is_ok() {
            info!("Job coordinator drained");
            return true;
        }

        let load = self.load();
        warn!(
            queued = load.queued,
            in_flight = load.in_flight,
            grace_secs = grace.as_secs_f64(),
            "Job coordinator drain timed out, failing remaining jobs"
        );
        self.abandon.cancel();

        let settle = async {
            if let Some(handle) = dispatcher.as_mut() {
                if let Err(e) = handle.await {
                    error!(error = %e, "Job dispatcher panicked");
                }
            }
            self.tracker.close();
            self.tracker.wait().await;
        };
        if tokio::time::timeout(ABANDON_WAIT, settle).await.is_err() {
            error!(
                remaining = self.tracker.len(),
                "Gave up waiting for abandoned jobs to record their state"
            );
        }
        false
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<CadastralJob>,
    runner: JobRunner,
    limiter: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    abandon: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };
        if let Err(job) = spawn_job(job, &runner, &limiter, &tracker, &abandon).await {
            runner.abandon(job).await;
        }
    }

    // Already accepted jobs still run; outstanding reservations may still send.
    receiver.close();
    loop {
        let job = tokio::select! {
            biased;
            _ = abandon.cancelled() => break,
            job = receiver.recv() => match job {
                Some(job) => job,
                None => {
                    debug!("Job dispatcher stopped");
                    return;
                }
            },
        };
        if let Err(job) = spawn_job(job, &runner, &limiter, &tracker, &abandon).await {
            runner.abandon(job).await;
        }
    }

    let mut abandoned = 0usize;
    while let Ok(job) = receiver.try_recv() {
        runner.abandon(job).await;
        abandoned += 1;
    }
    warn!(abandoned, "Job dispatcher stopped after failing queued jobs");
}

/// Start `job` once a worker slot frees up. Hands the job back if the
/// coordinator is abandoning work before a slot is available.
async fn spawn_job(
    job: CadastralJob,
    runner: &JobRunner,
    limiter: &Arc<Semaphore>,
    tracker: &TaskTracker,
    abandon: &CancellationToken,
) -> Result<(), CadastralJob> {
    let permit = tokio::select! {
        biased;
        _ = abandon.cancelled() => return Err(job),
        permit = limiter.clone().acquire_owned() => match permit {
            Ok(permit) => permit,
            Err(_) => {
                error!(job_id = %job.id, "Worker limiter closed");
                return Err(job);
            }
        },
    };

    let runner = runner.clone();
    tracker.spawn(async move {
        let _permit = permit;
        metrics::gauge!("cadastral_jobs_in_flight").increment(1.0);
        let outcome = runner.run(job).await;
        metrics::gauge!("cadastral_jobs_in_flight").decrement(1.0);
        debug!(outcome = ?outcome, "Job run finished");
    });
    Ok(())
}
