//! Job storage: the trait and the in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::types::{Backoff, Job, JobId, JobPayload, JobStatus};

/// Job store error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Per-queue counts for monitoring (the `(queue, status)` access pattern).
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub failed: usize,
}

/// Durable store of outstanding and dead background work.
///
/// The store is the only shared mutable resource between producers and the
/// worker fleet; all cross-process coordination goes through `enqueue`'s
/// conditional insert and `claim`'s exclusive row selection.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert-if-absent on the dedup key. Returns whether a new row was
    /// created; an existing key is silently absorbed, never an error.
    async fn enqueue(&self, payload: &JobPayload, max_attempts: u32)
    -> Result<bool, JobStoreError>;

    /// Claim up to `batch` eligible jobs from `queue`: status pending and
    /// `run_at <= now`, ordered by `run_at` ascending. Claimed rows move to
    /// processing atomically; concurrent claimants never receive the same
    /// row and never block each other.
    async fn claim(
        &self,
        queue: &str,
        batch: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobStoreError>;

    /// Delete the row. Idempotent: completing an already-deleted id is a
    /// no-op (guards against double-completion after a crash-and-redeliver).
    async fn complete(&self, id: JobId) -> Result<(), JobStoreError>;

    /// Record a failed attempt. Below the attempt bound the row returns to
    /// pending with `run_at` pushed forward by exponential backoff;
    /// otherwise it becomes terminally failed. Returns the resulting status.
    async fn fail(
        &self,
        id: JobId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<JobStatus, JobStoreError>;

    /// Requeue processing rows whose claim is older than `older_than`
    /// (worker crashed between claim and resolve). Returns how many rows
    /// were released.
    async fn release_stale(
        &self,
        older_than: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, JobStoreError>;

    /// Fetch one job by id (monitoring/tests).
    async fn get(&self, id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// Per-queue status counts.
    async fn stats(&self, queue: &str) -> Result<QueueStats, JobStoreError>;
}

/// In-memory job store for tests/dev.
///
/// A single mutex stands in for the database's row locking; the observable
/// claim/complete/fail semantics match the Postgres implementation.
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    inner: Mutex<Inner>,
    backoff: Backoff,
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    by_dedup_key: HashMap<String, JobId>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backoff(backoff: Backoff) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            backoff,
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn enqueue(
        &self,
        payload: &JobPayload,
        max_attempts: u32,
    ) -> Result<bool, JobStoreError> {
        let job = Job::new(payload, max_attempts, Utc::now());
        let mut inner = self.inner.lock().unwrap();

        if inner.by_dedup_key.contains_key(&job.dedup_key) {
            return Ok(false);
        }

        inner.by_dedup_key.insert(job.dedup_key.clone(), job.id);
        inner.jobs.insert(job.id, job);
        Ok(true)
    }

    async fn claim(
        &self,
        queue: &str,
        batch: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobStoreError> {
        let mut inner = self.inner.lock().unwrap();

        let mut eligible: Vec<JobId> = inner
            .jobs
            .values()
            .filter(|j| j.queue == queue && j.status == JobStatus::Pending && j.run_at <= now)
            .map(|j| j.id)
            .collect();
        eligible.sort_by_key(|id| inner.jobs[id].run_at);
        eligible.truncate(batch);

        let mut claimed = Vec::with_capacity(eligible.len());
        for id in eligible {
            if let Some(job) = inner.jobs.get_mut(&id) {
                job.status = JobStatus::Processing;
                job.claimed_at = Some(now);
                claimed.push(job.clone());
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, id: JobId) -> Result<(), JobStoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(job) = inner.jobs.remove(&id) {
            inner.by_dedup_key.remove(&job.dedup_key);
        }
        Ok(())
    }

    async fn fail(
        &self,
        id: JobId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<JobStatus, JobStoreError> {
        let backoff = self.backoff;
        let mut inner = self.inner.lock().unwrap();
        let job = inner.jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;

        job.attempts += 1;
        job.error_msg = Some(error.to_string());
        job.claimed_at = None;

        if job.attempts < job.max_attempts {
            job.status = JobStatus::Pending;
            job.run_at = now
                + chrono::Duration::from_std(backoff.delay_after(job.attempts))
                    .unwrap_or_else(|_| chrono::Duration::seconds(0));
        } else {
            job.status = JobStatus::Failed;
            job.failed_at = Some(now);
        }
        Ok(job.status)
    }

    async fn release_stale(
        &self,
        older_than: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, JobStoreError> {
        let cutoff = now
            - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());
        let mut inner = self.inner.lock().unwrap();

        let mut released = 0u64;
        for job in inner.jobs.values_mut() {
            let stale = job.status == JobStatus::Processing
                && job.claimed_at.is_some_and(|at| at < cutoff);
            if stale {
                job.status = JobStatus::Pending;
                job.claimed_at = None;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, JobStoreError> {
        Ok(self.inner.lock().unwrap().jobs.get(&id).cloned())
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, JobStoreError> {
        let inner = self.inner.lock().unwrap();
        let mut stats = QueueStats::default();
        for job in inner.jobs.values().filter(|j| j.queue == queue) {
            match job.status {
                JobStatus::Pending => stats.pending += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        Ok(stats)
    }
}
