//! Postgres-backed job store.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` so concurrent workers partition
//! eligible rows without blocking each other; enqueue relies on the unique
//! index on `dedup_key` with `ON CONFLICT DO NOTHING`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

use super::store::{JobStore, JobStoreError, QueueStats};
use super::types::{Backoff, Job, JobId, JobPayload, JobStatus};

#[derive(Debug, Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
    backoff: Backoff,
}

impl PostgresJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            backoff: Backoff::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

struct JobRow {
    id: uuid::Uuid,
    dedup_key: String,
    queue: String,
    payload: serde_json::Value,
    status: String,
    attempts: i32,
    max_attempts: i32,
    run_at: DateTime<Utc>,
    claimed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    error_msg: Option<String>,
    created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for JobRow {
    fn from_row(row: &PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            dedup_key: row.try_get("dedup_key")?,
            queue: row.try_get("queue")?,
            payload: row.try_get("payload")?,
            status: row.try_get("status")?,
            attempts: row.try_get("attempts")?,
            max_attempts: row.try_get("max_attempts")?,
            run_at: row.try_get("run_at")?,
            claimed_at: row.try_get("claimed_at")?,
            failed_at: row.try_get("failed_at")?,
            error_msg: row.try_get("error_msg")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl JobRow {
    fn into_job(self) -> Result<Job, JobStoreError> {
        let status: JobStatus = self
            .status
            .parse()
            .map_err(|_| JobStoreError::Storage(format!("bad job status: {}", self.status)))?;
        Ok(Job {
            id: JobId::from_uuid(self.id),
            dedup_key: self.dedup_key,
            queue: self.queue,
            payload: self.payload,
            status,
            attempts: self.attempts as u32,
            max_attempts: self.max_attempts as u32,
            run_at: self.run_at,
            claimed_at: self.claimed_at,
            failed_at: self.failed_at,
            error_msg: self.error_msg,
            created_at: self.created_at,
        })
    }
}

fn storage_err(err: sqlx::Error) -> JobStoreError {
    JobStoreError::Storage(err.to_string())
}

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn enqueue(
        &self,
        payload: &JobPayload,
        max_attempts: u32,
    ) -> Result<bool, JobStoreError> {
        let job = Job::new(payload, max_attempts, Utc::now());
        let result = sqlx::query(
            r#"
            INSERT INTO jobs (id, dedup_key, queue, payload, status, attempts,
                              max_attempts, run_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (dedup_key) DO NOTHING
            "#,
        )
        .bind(job.id.0)
        .bind(&job.dedup_key)
        .bind(&job.queue)
        .bind(&job.payload)
        .bind(job.status.as_str())
        .bind(job.attempts as i32)
        .bind(job.max_attempts as i32)
        .bind(job.run_at)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn claim(
        &self,
        queue: &str,
        batch: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<Job>, JobStoreError> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            UPDATE jobs SET status = 'processing', claimed_at = $3
            WHERE id IN (
                SELECT id FROM jobs
                WHERE queue = $1 AND status = 'pending' AND run_at <= $3
                ORDER BY run_at
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#,
        )
        .bind(queue)
        .bind(batch as i64)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        let mut jobs = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<Result<Vec<_>, _>>()?;
        // RETURNING does not preserve the subquery's ordering.
        jobs.sort_by_key(|j| j.run_at);
        Ok(jobs)
    }

    async fn complete(&self, id: JobId) -> Result<(), JobStoreError> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn fail(
        &self,
        id: JobId,
        error: &str,
        now: DateTime<Utc>,
    ) -> Result<JobStatus, JobStoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let row: Option<(i32, i32)> =
            sqlx::query_as("SELECT attempts, max_attempts FROM jobs WHERE id = $1 FOR UPDATE")
                .bind(id.0)
                .fetch_optional(&mut *tx)
                .await
                .map_err(storage_err)?;
        let (attempts, max_attempts) = row.ok_or(JobStoreError::NotFound(id))?;

        let attempts = attempts + 1;
        let status = if attempts < max_attempts {
            let delay = self.backoff.delay_after(attempts as u32);
            let run_at = now
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            sqlx::query(
                r#"
                UPDATE jobs SET status = 'pending', attempts = $2, run_at = $3,
                                claimed_at = NULL, error_msg = $4
                WHERE id = $1
                "#,
            )
            .bind(id.0)
            .bind(attempts)
            .bind(run_at)
            .bind(error)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
            JobStatus::Pending
        } else {
            sqlx::query(
                r#"
                UPDATE jobs SET status = 'failed', attempts = $2, failed_at = $3,
                                claimed_at = NULL, error_msg = $4
                WHERE id = $1
                "#,
            )
            .bind(id.0)
            .bind(attempts)
            .bind(now)
            .bind(error)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
            JobStatus::Failed
        };

        tx.commit().await.map_err(storage_err)?;
        Ok(status)
    }

    async fn release_stale(
        &self,
        older_than: Duration,
        now: DateTime<Utc>,
    ) -> Result<u64, JobStoreError> {
        let cutoff = now
            - chrono::Duration::from_std(older_than).unwrap_or_else(|_| chrono::Duration::zero());
        let result = sqlx::query(
            r#"
            UPDATE jobs SET status = 'pending', claimed_at = NULL
            WHERE status = 'processing' AND claimed_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(result.rows_affected())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>, JobStoreError> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(JobRow::into_job).transpose()
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats, JobStoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM jobs WHERE queue = $1 GROUP BY status")
                .bind(queue)
                .fetch_all(&self.pool)
                .await
                .map_err(storage_err)?;

        let mut stats = QueueStats::default();
        for (status, count) in rows {
            match status.as_str() {
                "pending" => stats.pending = count as usize,
                "processing" => stats.processing = count as usize,
                "failed" => stats.failed = count as usize,
                _ => {}
            }
        }
        Ok(stats)
    }
}
