//! Core job types and policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crewforge_core::{DomainError, EmployeeId, TaskId, TenantId};

/// Queue executing performance-score computations.
pub const QUEUE_SCORING: &str = "scoring";

/// Queue executing on-chain completion records.
pub const QUEUE_LEDGER: &str = "ledger";

/// Default retry bound for newly enqueued jobs.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job execution status.
///
/// There is no `Completed`: a successfully executed job is deleted, so the
/// table only ever holds outstanding or dead work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for its `run_at` to pass.
    Pending,
    /// Claimed by a worker.
    Processing,
    /// Retries exhausted; never claimed again.
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Failed => "failed",
        }
    }
}

impl core::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// Exponential backoff: `base * 2^attempts`, capped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(10),
            cap: Duration::from_secs(15 * 60),
        }
    }
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay before the next eligibility after `attempts` failures.
    pub fn delay_after(&self, attempts: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempts.min(16));
        self.base.saturating_mul(factor).min(self.cap)
    }
}

/// Strongly-typed job payload, tagged by queue.
///
/// Each handler receives the payload matching its queue instead of an opaque
/// blob requiring runtime inspection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "snake_case")]
pub enum JobPayload {
    /// Recompute the assignee's performance score after a task completion.
    Score {
        tenant_id: TenantId,
        task_id: TaskId,
        employee_id: EmployeeId,
    },
    /// Materialize the task's completion record on the external ledger.
    LedgerRecord { tenant_id: TenantId, task_id: TaskId },
}

impl JobPayload {
    pub fn queue(&self) -> &'static str {
        match self {
            JobPayload::Score { .. } => QUEUE_SCORING,
            JobPayload::LedgerRecord { .. } => QUEUE_LEDGER,
        }
    }

    /// One logical unit of work → one stable key. Duplicate enqueue attempts
    /// with the same key collapse into a single row.
    pub fn dedup_key(&self) -> String {
        match self {
            JobPayload::Score { task_id, .. } => format!("score:task:{task_id}"),
            JobPayload::LedgerRecord { task_id, .. } => format!("ledger:task:{task_id}"),
        }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// A queued unit of background work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub dedup_key: String,
    pub queue: String,
    pub payload: serde_json::Value,
    pub status: JobStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    /// Earliest eligible execution time.
    pub run_at: DateTime<Utc>,
    /// When the current claimant took the row; drives stale reclaim.
    pub claimed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    /// Build a fresh pending job, eligible immediately.
    pub fn new(payload: &JobPayload, max_attempts: u32, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            dedup_key: payload.dedup_key(),
            queue: payload.queue().to_string(),
            payload: payload.to_value(),
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts,
            run_at: now,
            claimed_at: None,
            failed_at: None,
            error_msg: None,
            created_at: now,
        }
    }

    pub fn typed_payload(&self) -> Result<JobPayload, serde_json::Error> {
        JobPayload::from_value(&self.payload)
    }
}
