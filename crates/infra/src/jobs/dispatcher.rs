//! Turns a completed task into durable follow-up work.

use std::sync::Arc;

use tracing::{debug, warn};

use crewforge_tasks::Task;

use super::store::{JobStore, JobStoreError};
use super::types::{DEFAULT_MAX_ATTEMPTS, JobPayload};

/// What the dispatch actually enqueued. `false` means the corresponding
/// dedup key already had a row, so the request was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct DispatchReceipt {
    pub scoring_enqueued: bool,
    pub ledger_enqueued: bool,
}

/// Enqueues the side effects of a task completion: one scoring job (when the
/// task has an assignee to score) and one ledger job. Runs inline on the
/// request path, so it only writes rows and never executes anything.
#[derive(Clone)]
pub struct CompletionDispatcher {
    store: Arc<dyn JobStore>,
    max_attempts: u32,
}

impl CompletionDispatcher {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Enqueue follow-up jobs for `task`, which has just entered its
    /// completed state. Safe to call more than once for the same task: the
    /// task-keyed dedup keys absorb the repeats.
    pub async fn dispatch_completion(&self, task: &Task) -> Result<DispatchReceipt, JobStoreError> {
        let scoring_enqueued = match task.assignee {
            Some(employee_id) => {
                let payload = JobPayload::Score {
                    tenant_id: task.tenant_id,
                    task_id: task.id,
                    employee_id,
                };
                self.store.enqueue(&payload, self.max_attempts).await?
            }
            None => {
                // Nothing to score without an assignee; the ledger record
                // still goes out.
                warn!(task_id = %task.id, "completed task has no assignee, skipping scoring");
                false
            }
        };

        let ledger_payload = JobPayload::LedgerRecord {
            tenant_id: task.tenant_id,
            task_id: task.id,
        };
        let ledger_enqueued = self
            .store
            .enqueue(&ledger_payload, self.max_attempts)
            .await?;

        debug!(
            task_id = %task.id,
            scoring = scoring_enqueued,
            ledger = ledger_enqueued,
            "dispatched completion side effects"
        );
        Ok(DispatchReceipt {
            scoring_enqueued,
            ledger_enqueued,
        })
    }
}
