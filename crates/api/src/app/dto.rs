//! Request/response DTOs and JSON mapping helpers.
//!
//! Responses never include the tenant id: the tenant is the caller's own
//! context, and echoing it back would leak the scoping column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crewforge_infra::LedgerEntry;
use crewforge_scoring::{Grade, PerformanceSample, Trend};
use crewforge_tasks::Task;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub complexity: u8,
    pub assignee: Option<Uuid>,
    pub priority: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct ListTasksQuery {
    pub status: Option<String>,
    pub assignee: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub assignee: Option<Uuid>,
    pub status: &'static str,
    pub priority: &'static str,
    pub complexity: u8,
    pub required_skills: Vec<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.as_uuid(),
            assignee: task.assignee.map(|a| a.as_uuid()),
            status: task.status.as_str(),
            priority: task.priority.as_str(),
            complexity: task.complexity.value(),
            required_skills: task.required_skills.iter().map(str::to_string).collect(),
            due_at: task.due_at,
            completed_at: task.completed_at,
            active: task.active,
            created_at: task.created_at,
        }
    }
}

/// Response to a status change: the updated task plus what the change
/// actually enqueued. Both flags are `false` for non-completing transitions
/// and for repeats already absorbed by dedup.
#[derive(Debug, Serialize)]
pub struct StatusChangeResponse {
    #[serde(flatten)]
    pub task: TaskResponse,
    pub scoring_enqueued: bool,
    pub ledger_enqueued: bool,
}

#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub employee_id: Uuid,
    pub score: Option<f64>,
    pub grade: Option<Grade>,
    pub completion_rate: Option<f64>,
    pub on_time_rate: Option<f64>,
    pub avg_complexity: Option<f64>,
    pub task_count: usize,
    pub trend: Trend,
    pub narrative: String,
    pub sampled_at: Option<DateTime<Utc>>,
}

impl PerformanceResponse {
    pub fn from_sample(
        employee_id: Uuid,
        sample: &PerformanceSample,
        trend: Trend,
        narrative: String,
    ) -> Self {
        Self {
            employee_id,
            score: sample.score,
            grade: sample.score.map(Grade::from_score),
            completion_rate: sample.completion_rate,
            on_time_rate: sample.on_time_rate,
            avg_complexity: sample.avg_complexity,
            task_count: sample.task_count,
            trend,
            narrative,
            sampled_at: Some(sample.created_at),
        }
    }

    /// Shape returned before any scoring pass has run for the employee.
    pub fn unscored(employee_id: Uuid, narrative: String) -> Self {
        Self {
            employee_id,
            score: None,
            grade: None,
            completion_rate: None,
            on_time_rate: None,
            avg_complexity: None,
            task_count: 0,
            trend: Trend::InsufficientData,
            narrative,
            sampled_at: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub task_id: Uuid,
    pub tx_ref: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntryResponse {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        Self {
            task_id: entry.task_id.as_uuid(),
            tx_ref: entry.tx_ref.clone(),
            recorded_at: entry.recorded_at,
        }
    }
}
