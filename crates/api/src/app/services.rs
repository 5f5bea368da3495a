//! Infrastructure wiring shared by every handler.

use std::sync::Arc;

use sqlx::PgPool;

use crewforge_infra::handlers::{LedgerRecordHandler, ScoringHandler};
use crewforge_infra::jobs::types::{QUEUE_LEDGER, QUEUE_SCORING};
use crewforge_infra::repos::memory::{
    InMemoryLedgerEntryRepository, InMemoryPerformanceRepository, InMemoryTaskRepository,
};
use crewforge_infra::repos::postgres::{
    PostgresLedgerEntryRepository, PostgresPerformanceRepository, PostgresTaskRepository,
};
use crewforge_infra::{
    CompletionDispatcher, InMemoryJobStore, JobStore, JobWorker, LedgerEntryRepository,
    PerformanceRepository, PostgresJobStore, TaskRepository, WorkerConfig,
};
use crewforge_ledger::LedgerClient;

pub struct AppServices {
    pub tasks: Arc<dyn TaskRepository>,
    pub performance: Arc<dyn PerformanceRepository>,
    pub ledger_entries: Arc<dyn LedgerEntryRepository>,
    pub jobs: Arc<dyn JobStore>,
    pub dispatcher: CompletionDispatcher,
    pub ledger: Arc<LedgerClient>,
}

impl AppServices {
    /// Postgres-backed services, the production wiring.
    pub fn postgres(pool: PgPool, ledger: LedgerClient) -> Self {
        let jobs: Arc<dyn JobStore> = Arc::new(PostgresJobStore::new(pool.clone()));
        Self {
            tasks: Arc::new(PostgresTaskRepository::new(pool.clone())),
            performance: Arc::new(PostgresPerformanceRepository::new(pool.clone())),
            ledger_entries: Arc::new(PostgresLedgerEntryRepository::new(pool)),
            dispatcher: CompletionDispatcher::new(jobs.clone()),
            jobs,
            ledger: Arc::new(ledger),
        }
    }

    /// Everything in memory: tests and local development without a database.
    pub fn in_memory(ledger: LedgerClient) -> Self {
        let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        Self {
            tasks: Arc::new(InMemoryTaskRepository::new()),
            performance: Arc::new(InMemoryPerformanceRepository::new()),
            ledger_entries: Arc::new(InMemoryLedgerEntryRepository::new()),
            dispatcher: CompletionDispatcher::new(jobs.clone()),
            jobs,
            ledger: Arc::new(ledger),
        }
    }

    /// Worker draining the scoring queue.
    pub fn scoring_worker(&self) -> JobWorker {
        let handler = ScoringHandler::new(self.tasks.clone(), self.performance.clone());
        JobWorker::new(self.jobs.clone(), WorkerConfig::for_queue(QUEUE_SCORING))
            .register("score", Arc::new(handler))
    }

    /// Worker draining the ledger queue.
    pub fn ledger_worker(&self) -> JobWorker {
        let handler = LedgerRecordHandler::new(self.ledger.clone(), self.ledger_entries.clone());
        JobWorker::new(self.jobs.clone(), WorkerConfig::for_queue(QUEUE_LEDGER))
            .register("ledger_record", Arc::new(handler))
    }
}
