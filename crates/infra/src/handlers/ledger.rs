//! Handler for ledger jobs: push the completion to the external ledger and
//! record the submission locally.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crewforge_ledger::LedgerClient;

use crate::jobs::types::{Job, JobPayload};
use crate::jobs::worker::{HandlerError, JobHandler};
use crate::repos::{LedgerEntry, LedgerEntryRepository};

pub struct LedgerRecordHandler {
    client: Arc<LedgerClient>,
    entries: Arc<dyn LedgerEntryRepository>,
}

impl LedgerRecordHandler {
    pub fn new(client: Arc<LedgerClient>, entries: Arc<dyn LedgerEntryRepository>) -> Self {
        Self { client, entries }
    }
}

#[async_trait]
impl JobHandler for LedgerRecordHandler {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let (tenant_id, task_id) = match job
            .typed_payload()
            .map_err(|e| HandlerError::failed(format!("bad payload: {e}")))?
        {
            JobPayload::LedgerRecord { tenant_id, task_id } => (tenant_id, task_id),
            other => {
                return Err(HandlerError::failed(format!(
                    "ledger handler got {:?} payload",
                    other.queue()
                )));
            }
        };

        // At-least-once delivery: a prior attempt may already have landed.
        let existing = self
            .entries
            .for_task(tenant_id, task_id)
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;
        if existing.is_some() {
            debug!(%task_id, "ledger entry already recorded, skipping");
            return Ok(());
        }

        let tx_ref = if self.client.is_enabled() {
            // None from an enabled client means the submission did not
            // confirm; fail so the retry path re-submits.
            let tx = self
                .client
                .record_completion(task_id)
                .await
                .ok_or_else(|| HandlerError::failed("ledger submission unconfirmed"))?;
            Some(tx.0)
        } else {
            debug!(%task_id, "ledger disabled, recording local entry only");
            None
        };

        let entry = LedgerEntry::new(tenant_id, task_id, tx_ref);
        let created = self
            .entries
            .insert_once(&entry)
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;
        if created {
            info!(%task_id, tx_ref = ?entry.tx_ref, "completion recorded on ledger");
        }
        // Losing the insert race to a concurrent delivery is still success.
        Ok(())
    }
}
