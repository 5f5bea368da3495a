//! The worker: claim, execute, resolve.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::store::JobStore;
use super::types::{Job, JobStatus};

/// Error returned by a job handler. Any error triggers the store's
/// retry/backoff path; the worker does not distinguish causes beyond
/// recording them.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error("handler timed out after {0:?}")]
    Timeout(Duration),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }
}

/// Executes one kind of job. Handlers must be idempotent: at-least-once
/// delivery means the same job can be handed over more than once.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError>;
}

/// Worker tuning knobs.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Sleep between empty polls.
    pub poll_interval: Duration,
    /// Max jobs claimed per poll.
    pub batch_size: usize,
    /// Hard ceiling per job execution; a handler that exceeds it is failed
    /// and rescheduled like any other error.
    pub job_timeout: Duration,
    /// Age past which a processing claim is presumed orphaned.
    pub stale_after: Duration,
    /// How often the stale sweep runs.
    pub sweep_interval: Duration,
    /// Queue this worker drains.
    pub queue: String,
}

impl WorkerConfig {
    pub fn for_queue(queue: impl Into<String>) -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            batch_size: 10,
            job_timeout: Duration::from_secs(30),
            stale_after: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            queue: queue.into(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_size(mut self, batch: usize) -> Self {
        self.batch_size = batch;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }
}

/// Handle for stopping a spawned worker.
pub struct WorkerHandle {
    stop: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl WorkerHandle {
    /// Signal the worker to stop and wait for the in-flight poll to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Drains one queue, routing each claimed job to the handler registered for
/// its payload tag.
pub struct JobWorker {
    store: Arc<dyn JobStore>,
    handlers: HashMap<String, Arc<dyn JobHandler>>,
    config: WorkerConfig,
}

impl JobWorker {
    pub fn new(store: Arc<dyn JobStore>, config: WorkerConfig) -> Self {
        Self {
            store,
            handlers: HashMap::new(),
            config,
        }
    }

    /// Register a handler for the payload tag (the `job` field of the
    /// serialized payload).
    pub fn register(mut self, tag: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(tag.into(), handler);
        self
    }

    /// Claim and execute one batch. Returns how many jobs were executed.
    /// This is the unit the poll loop repeats; tests drive it directly.
    pub async fn run_pending(&self) -> usize {
        let now = Utc::now();
        let batch = match self
            .store
            .claim(&self.config.queue, self.config.batch_size, now)
            .await
        {
            Ok(batch) => batch,
            Err(err) => {
                error!(queue = %self.config.queue, error = %err, "claim failed");
                return 0;
            }
        };

        let count = batch.len();
        for job in batch {
            self.execute(job).await;
        }
        count
    }

    async fn execute(&self, job: Job) {
        let tag = job
            .payload
            .get("job")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let Some(handler) = self.handlers.get(&tag) else {
            // No handler is a permanent condition, not a transient one, but
            // the retry path still caps it at max_attempts.
            warn!(job_id = %job.id, tag = %tag, "no handler registered");
            self.resolve(&job, Err(HandlerError::failed(format!("no handler for {tag:?}"))))
                .await;
            return;
        };

        debug!(job_id = %job.id, queue = %job.queue, attempt = job.attempts + 1, "executing job");
        let outcome = match tokio::time::timeout(self.config.job_timeout, handler.handle(&job)).await
        {
            Ok(result) => result,
            Err(_) => Err(HandlerError::Timeout(self.config.job_timeout)),
        };
        self.resolve(&job, outcome).await;
    }

    async fn resolve(&self, job: &Job, outcome: Result<(), HandlerError>) {
        match outcome {
            Ok(()) => {
                if let Err(err) = self.store.complete(job.id).await {
                    error!(job_id = %job.id, error = %err, "failed to complete job");
                } else {
                    debug!(job_id = %job.id, "job completed");
                }
            }
            Err(handler_err) => {
                let msg = handler_err.to_string();
                match self.store.fail(job.id, &msg, Utc::now()).await {
                    Ok(JobStatus::Failed) => {
                        error!(job_id = %job.id, error = %msg, attempts = job.attempts + 1,
                               "job permanently failed");
                    }
                    Ok(_) => {
                        warn!(job_id = %job.id, error = %msg, "job failed, will retry");
                    }
                    Err(err) => {
                        error!(job_id = %job.id, error = %err, "failed to record job failure");
                    }
                }
            }
        }
    }

    /// Requeue orphaned claims.
    pub async fn sweep_stale(&self) {
        match self
            .store
            .release_stale(self.config.stale_after, Utc::now())
            .await
        {
            Ok(0) => {}
            Ok(n) => info!(queue = %self.config.queue, released = n, "released stale jobs"),
            Err(err) => error!(queue = %self.config.queue, error = %err, "stale sweep failed"),
        }
    }

    /// Spawn the poll loop on the current runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            info!(queue = %self.config.queue, "worker started");
            let mut last_sweep = tokio::time::Instant::now();
            loop {
                // Checked every iteration, not just when idle: a
                // continuously busy queue must still reclaim orphaned jobs.
                if last_sweep.elapsed() >= self.config.sweep_interval {
                    self.sweep_stale().await;
                    last_sweep = tokio::time::Instant::now();
                }

                let executed = self.run_pending().await;
                // Drain eagerly while work remains; sleep only when idle.
                if executed > 0 {
                    continue;
                }
                tokio::select! {
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            info!(queue = %self.config.queue, "worker stopping");
                            return;
                        }
                    }
                }
            }
        });
        WorkerHandle {
            stop: stop_tx,
            task,
        }
    }
}
