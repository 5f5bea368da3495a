//! Postgres repositories.
//!
//! Rows store the uuid forms of the id newtypes and text forms of the
//! closed enums; decoding back into domain types treats an unknown enum
//! string as a storage error rather than a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use uuid::Uuid;

use crewforge_core::{EmployeeId, TaskId, TenantId};
use crewforge_scoring::PerformanceSample;
use crewforge_tasks::{Complexity, Priority, SkillSet, Task, TaskStatus};

use super::{
    LedgerEntry, LedgerEntryRepository, PerformanceRepository, RepoError, RepoResult, TaskFilter,
    TaskRepository,
};

fn storage_err(err: sqlx::Error) -> RepoError {
    RepoError::Storage(err.to_string())
}

#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: PgPool,
}

impl PostgresTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct TaskRowDb {
    id: Uuid,
    tenant_id: Uuid,
    assignee: Option<Uuid>,
    status: String,
    priority: String,
    complexity: i16,
    required_skills: serde_json::Value,
    due_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    active: bool,
    created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for TaskRowDb {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            assignee: row.try_get("assignee")?,
            status: row.try_get("status")?,
            priority: row.try_get("priority")?,
            complexity: row.try_get("complexity")?,
            required_skills: row.try_get("required_skills")?,
            due_at: row.try_get("due_at")?,
            completed_at: row.try_get("completed_at")?,
            active: row.try_get("active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TaskRowDb {
    fn into_task(self) -> RepoResult<Task> {
        let status: TaskStatus = self
            .status
            .parse()
            .map_err(|_| RepoError::Storage(format!("bad task status: {}", self.status)))?;
        let priority: Priority = self
            .priority
            .parse()
            .map_err(|_| RepoError::Storage(format!("bad priority: {}", self.priority)))?;
        let complexity = Complexity::new(self.complexity as u8)
            .map_err(|_| RepoError::Storage(format!("bad complexity: {}", self.complexity)))?;
        let required_skills: SkillSet = serde_json::from_value(self.required_skills)
            .map_err(|e| RepoError::Storage(format!("bad skills: {e}")))?;

        Ok(Task {
            id: TaskId::from_uuid(self.id),
            tenant_id: TenantId::from_uuid(self.tenant_id),
            assignee: self.assignee.map(EmployeeId::from_uuid),
            status,
            priority,
            complexity,
            required_skills,
            due_at: self.due_at,
            completed_at: self.completed_at,
            active: self.active,
            created_at: self.created_at,
        })
    }
}

fn skills_json(task: &Task) -> serde_json::Value {
    serde_json::to_value(&task.required_skills).unwrap_or(serde_json::Value::Null)
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn insert(&self, task: &Task) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tasks (id, tenant_id, assignee, status, priority, complexity,
                               required_skills, due_at, completed_at, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(task.id.as_uuid())
        .bind(task.tenant_id.as_uuid())
        .bind(task.assignee.map(|a| a.as_uuid()))
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.complexity.value() as i16)
        .bind(skills_json(task))
        .bind(task.due_at)
        .bind(task.completed_at)
        .bind(task.active)
        .bind(task.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get(&self, tenant_id: TenantId, task_id: TaskId) -> RepoResult<Option<Task>> {
        let row: Option<TaskRowDb> =
            sqlx::query_as("SELECT * FROM tasks WHERE tenant_id = $1 AND id = $2")
                .bind(tenant_id.as_uuid())
                .bind(task_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;
        row.map(TaskRowDb::into_task).transpose()
    }

    async fn list(&self, tenant_id: TenantId, filter: &TaskFilter) -> RepoResult<Vec<Task>> {
        let rows: Vec<TaskRowDb> = sqlx::query_as(
            r#"
            SELECT * FROM tasks
            WHERE tenant_id = $1
              AND (active OR $2)
              AND ($3::text IS NULL OR status = $3)
              AND ($4::uuid IS NULL OR assignee = $4)
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(filter.include_inactive)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.assignee.map(|a| a.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(TaskRowDb::into_task).collect()
    }

    async fn update(&self, task: &Task) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET assignee = $3, status = $4, priority = $5, complexity = $6,
                required_skills = $7, due_at = $8, completed_at = $9, active = $10
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(task.tenant_id.as_uuid())
        .bind(task.id.as_uuid())
        .bind(task.assignee.map(|a| a.as_uuid()))
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.complexity.value() as i16)
        .bind(skills_json(task))
        .bind(task.due_at)
        .bind(task.completed_at)
        .bind(task.active)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn assigned_to(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<Task>> {
        let rows: Vec<TaskRowDb> = sqlx::query_as(
            r#"
            SELECT * FROM tasks
            WHERE tenant_id = $1 AND assignee = $2 AND active
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(employee_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        rows.into_iter().map(TaskRowDb::into_task).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PostgresPerformanceRepository {
    pool: PgPool,
}

impl PostgresPerformanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct SampleRowDb {
    id: Uuid,
    tenant_id: Uuid,
    employee_id: Uuid,
    score: Option<f64>,
    completion_rate: Option<f64>,
    on_time_rate: Option<f64>,
    avg_complexity: Option<f64>,
    task_count: i64,
    created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for SampleRowDb {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            employee_id: row.try_get("employee_id")?,
            score: row.try_get("score")?,
            completion_rate: row.try_get("completion_rate")?,
            on_time_rate: row.try_get("on_time_rate")?,
            avg_complexity: row.try_get("avg_complexity")?,
            task_count: row.try_get("task_count")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl SampleRowDb {
    fn into_sample(self) -> PerformanceSample {
        PerformanceSample {
            id: self.id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            employee_id: EmployeeId::from_uuid(self.employee_id),
            score: self.score,
            completion_rate: self.completion_rate,
            on_time_rate: self.on_time_rate,
            avg_complexity: self.avg_complexity,
            task_count: self.task_count as usize,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl PerformanceRepository for PostgresPerformanceRepository {
    async fn append(&self, sample: &PerformanceSample) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO performance_samples
                (id, tenant_id, employee_id, score, completion_rate, on_time_rate,
                 avg_complexity, task_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(sample.id)
        .bind(sample.tenant_id.as_uuid())
        .bind(sample.employee_id.as_uuid())
        .bind(sample.score)
        .bind(sample.completion_rate)
        .bind(sample.on_time_rate)
        .bind(sample.avg_complexity)
        .bind(sample.task_count as i64)
        .bind(sample.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn for_employee(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Vec<PerformanceSample>> {
        let rows: Vec<SampleRowDb> = sqlx::query_as(
            r#"
            SELECT * FROM performance_samples
            WHERE tenant_id = $1 AND employee_id = $2
            ORDER BY created_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(employee_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(rows.into_iter().map(SampleRowDb::into_sample).collect())
    }

    async fn latest(
        &self,
        tenant_id: TenantId,
        employee_id: EmployeeId,
    ) -> RepoResult<Option<PerformanceSample>> {
        let row: Option<SampleRowDb> = sqlx::query_as(
            r#"
            SELECT * FROM performance_samples
            WHERE tenant_id = $1 AND employee_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(employee_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.map(SampleRowDb::into_sample))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresLedgerEntryRepository {
    pool: PgPool,
}

impl PostgresLedgerEntryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

struct EntryRowDb {
    id: Uuid,
    tenant_id: Uuid,
    task_id: Uuid,
    tx_ref: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for EntryRowDb {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            task_id: row.try_get("task_id")?,
            tx_ref: row.try_get("tx_ref")?,
            recorded_at: row.try_get("recorded_at")?,
        })
    }
}

impl EntryRowDb {
    fn into_entry(self) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            tenant_id: TenantId::from_uuid(self.tenant_id),
            task_id: TaskId::from_uuid(self.task_id),
            tx_ref: self.tx_ref,
            recorded_at: self.recorded_at,
        }
    }
}

#[async_trait]
impl LedgerEntryRepository for PostgresLedgerEntryRepository {
    async fn insert_once(&self, entry: &LedgerEntry) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, tenant_id, task_id, tx_ref, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (task_id) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.tenant_id.as_uuid())
        .bind(entry.task_id.as_uuid())
        .bind(&entry.tx_ref)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn for_task(
        &self,
        tenant_id: TenantId,
        task_id: TaskId,
    ) -> RepoResult<Option<LedgerEntry>> {
        let row: Option<EntryRowDb> = sqlx::query_as(
            "SELECT * FROM ledger_entries WHERE tenant_id = $1 AND task_id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(task_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.map(EntryRowDb::into_entry))
    }
}
