//! Append-only performance history rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crewforge_core::{EmployeeId, TenantId};

use crate::engine::ScoreCard;

/// One scoring pass persisted as a history row.
///
/// Rows are never updated or deleted; each engine run appends a new one.
/// Trend computation depends on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub employee_id: EmployeeId,
    pub score: Option<f64>,
    pub completion_rate: Option<f64>,
    pub on_time_rate: Option<f64>,
    pub avg_complexity: Option<f64>,
    pub task_count: usize,
    pub created_at: DateTime<Utc>,
}

impl PerformanceSample {
    /// Materialize a score card as a history row.
    pub fn from_card(
        tenant_id: TenantId,
        employee_id: EmployeeId,
        card: &ScoreCard,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            tenant_id,
            employee_id,
            score: card.score,
            completion_rate: card.factors.completion_rate,
            on_time_rate: card.factors.on_time_rate,
            avg_complexity: card.factors.avg_complexity,
            task_count: card.task_count,
            created_at: at,
        }
    }
}
