//! `crewforge-infra` — durable job pipeline and persistence.
//!
//! The request path only ever writes a durable intent record (a job row);
//! all execution and error handling lives inside the worker. Coordination
//! among concurrent workers happens entirely through the job store's atomic
//! claim primitive, never through in-process locks.

pub mod db;
pub mod handlers;
pub mod jobs;
pub mod repos;

pub use handlers::{LedgerRecordHandler, ScoringHandler};
pub use jobs::dispatcher::{CompletionDispatcher, DispatchReceipt};
pub use jobs::postgres::PostgresJobStore;
pub use jobs::store::{InMemoryJobStore, JobStore, JobStoreError};
pub use jobs::types::{Backoff, Job, JobId, JobPayload, JobStatus};
pub use jobs::worker::{HandlerError, JobHandler, JobWorker, WorkerConfig, WorkerHandle};
pub use repos::{
    LedgerEntry, LedgerEntryRepository, PerformanceRepository, RepoError, TaskFilter,
    TaskRepository,
};
