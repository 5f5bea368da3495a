//! Handler for scoring jobs: re-evaluate one employee's history and append
//! a performance sample.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info};

use crewforge_scoring::{PerformanceSample, ScoringEngine};

use crate::jobs::types::{Job, JobPayload};
use crate::jobs::worker::{HandlerError, JobHandler};
use crate::repos::{PerformanceRepository, TaskRepository};

pub struct ScoringHandler {
    tasks: Arc<dyn TaskRepository>,
    performance: Arc<dyn PerformanceRepository>,
}

impl ScoringHandler {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        performance: Arc<dyn PerformanceRepository>,
    ) -> Self {
        Self { tasks, performance }
    }
}

#[async_trait]
impl JobHandler for ScoringHandler {
    async fn handle(&self, job: &Job) -> Result<(), HandlerError> {
        let (tenant_id, employee_id) = match job
            .typed_payload()
            .map_err(|e| HandlerError::failed(format!("bad payload: {e}")))?
        {
            JobPayload::Score {
                tenant_id,
                employee_id,
                ..
            } => (tenant_id, employee_id),
            other => {
                return Err(HandlerError::failed(format!(
                    "scoring handler got {:?} payload",
                    other.queue()
                )));
            }
        };

        let history = self
            .tasks
            .assigned_to(tenant_id, employee_id)
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;
        debug!(%employee_id, tasks = history.len(), "evaluating performance");

        // Re-scoring is idempotent at the outcome level: the same history
        // always produces the same card, so a redelivered job appends a
        // duplicate row with identical values rather than corrupting state.
        let card = ScoringEngine::evaluate(&history);
        let sample = PerformanceSample::from_card(tenant_id, employee_id, &card, Utc::now());
        self.performance
            .append(&sample)
            .await
            .map_err(|e| HandlerError::failed(e.to_string()))?;

        info!(%employee_id, score = ?card.score, grade = ?card.grade, "performance sample recorded");
        Ok(())
    }
}
