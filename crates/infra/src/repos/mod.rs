//! Persistence traits for the domain rows.
//!
//! Every read and write is tenant-scoped: the tenant id is a mandatory
//! argument, never inferred, so a row can only ever be reached through its
//! own tenant.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crewforge_core::{EmployeeId, TaskId, TenantId};
use crewforge_scoring::PerformanceSample;
use crewforge_tasks::{Task, TaskStatus};

/// Repository error.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("duplicate row")]
    Duplicate,
    #[error("storage error: {0}")]
    Storage(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Optional filters for task listings.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<EmployeeId>,
    /// Deactivated tasks are hidden unless explicitly requested.
    pub include_inactive: bool,
}

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, task: &Task) -> RepoResult<()>;

    async fn get(&self, tenant_id: TenantId, task_id: TaskId) -> RepoResult<Option<Task>>;

    async fn list(&self, tenant_id: TenantId, filter: &TaskFilter) -> RepoResult<Vec<Task>>;

    /// Persist the full row; the caller has already validated the change.
    async fn update(&self, task: &Task) -> RepoResult<()>;

    /// All active tasks ever assigned to the employee, the scoring input.
    async fn assigned_to(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<Task>>;
}

#[async_trait]
pub trait PerformanceRepository: Send + Sync {
    async fn append(&self, sample: &PerformanceSample) -> RepoResult<()>;

    /// Samples for one employee, oldest first.
    async fn for_employee(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<PerformanceSample>>;

    async fn latest(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<PerformanceSample>>;
}

/// Local record of a task's external-ledger submission. At most one per
/// task, enforced by the store.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub task_id: TaskId,
    /// Transaction reference returned by the ledger, absent when the entry
    /// was recorded while the ledger integration ran disabled.
    pub tx_ref: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(tenant_id: TenantId, task_id: TaskId, tx_ref: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            task_id,
            tx_ref,
            recorded_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait LedgerEntryRepository: Send + Sync {
    /// Insert unless the task already has an entry. Returns whether a row
    /// was created; losing the race to a concurrent insert is not an error.
    async fn insert_once(&self, entry: &LedgerEntry) -> RepoResult<bool>;

    async fn for_task(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> RepoResult<Option<LedgerEntry>>;
}
