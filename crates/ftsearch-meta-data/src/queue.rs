//! PostgreSQL-backed extraction queue
//!
//! Persistent queue of searcher record ids awaiting text extraction. Workers
//! claim jobs with the SKIP LOCKED pattern, so several worker processes can
//! share one table without double-claiming.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::error::{DatabaseError, DatabaseErrorExt, DatabaseOperation, DatabaseResult};
use crate::models::{ExtractionJob, JobStatus, QueueDepth};
use crate::traits::ExtractionQueue;

/// `PostgreSQL` implementation of [`ExtractionQueue`]
#[derive(Clone)]
pub struct PostgresExtractionQueue {
    pool: PgPool,
}

impl PostgresExtractionQueue {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ExtractionQueue for PostgresExtractionQueue {
    async fn enqueue(&self, searcher_record_id: i64) -> DatabaseResult<i64> {
        let operation = DatabaseOperation::Enqueue { searcher_record_id };

        let row = sqlx::query(
            r"
            INSERT INTO extract_text_jobs (searcher_record_id, status)
            VALUES ($1, 'queued')
            RETURNING id
            ",
        )
        .bind(searcher_record_id)
        .fetch_one(&self.pool)
        .await
        .map_db_err(operation.clone(), None)?;

        row.try_get("id").map_db_err(operation, None)
    }

    async fn dequeue(
        &self,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> DatabaseResult<Option<ExtractionJob>> {
        let operation = DatabaseOperation::Dequeue {
            worker_id: worker_id.to_string(),
        };

        let now = Utc::now();
        let timeout = chrono::Duration::from_std(visibility_timeout).map_err(|e| {
            DatabaseError::UnexpectedState {
                operation: Box::new(operation.clone()),
                message: format!("visibility timeout out of range: {e}"),
                correlation_id: None,
            }
        })?;
        let visible_after = now.checked_add_signed(timeout).unwrap_or(now);

        sqlx::query_as::<_, ExtractionJob>(
            r"
            WITH claimed AS (
                SELECT extract_text_jobs.id
                FROM extract_text_jobs
                WHERE status = 'queued'
                  AND (visible_after IS NULL OR visible_after <= $1)
                ORDER BY created_at, id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE extract_text_jobs
            SET status = 'processing',
                claimed_at = $1,
                claimed_by = $2,
                visible_after = $3
            FROM claimed
            WHERE extract_text_jobs.id = claimed.id
            RETURNING extract_text_jobs.id,
                      extract_text_jobs.searcher_record_id,
                      extract_text_jobs.retry_count
            ",
        )
        .bind(now)
        .bind(worker_id)
        .bind(visible_after)
        .fetch_optional(&self.pool)
        .await
        .map_db_err(operation, None)
    }

    async fn ack(&self, job_id: i64) -> DatabaseResult<()> {
        sqlx::query(
            r"
            UPDATE extract_text_jobs
            SET status = 'completed',
                completed_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_db_err(DatabaseOperation::Ack { job_id }, None)?;

        Ok(())
    }

    async fn requeue(
        &self,
        job_id: i64,
        error: &str,
        max_retries: u32,
    ) -> DatabaseResult<JobStatus> {
        let operation = DatabaseOperation::Requeue { job_id };
        let max_retries = i32::try_from(max_retries).unwrap_or(i32::MAX);

        let row = sqlx::query(
            r"
            UPDATE extract_text_jobs
            SET status = CASE
                    WHEN retry_count + 1 >= $3 THEN 'failed'
                    ELSE 'queued'
                END,
                last_error = $2,
                claimed_at = NULL,
                claimed_by = NULL,
                visible_after = NULL,
                retry_count = retry_count + 1
            WHERE id = $1
            RETURNING status
            ",
        )
        .bind(job_id)
        .bind(error)
        .bind(max_retries)
        .fetch_one(&self.pool)
        .await
        .map_db_err(operation.clone(), None)?;

        let status: String = row.try_get("status").map_db_err(operation.clone(), None)?;
        status
            .parse()
            .map_err(|message| DatabaseError::UnexpectedState {
                operation: Box::new(operation),
                message,
                correlation_id: None,
            })
    }

    async fn recover_timed_out(&self) -> DatabaseResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE extract_text_jobs
            SET status = 'queued',
                claimed_at = NULL,
                claimed_by = NULL,
                visible_after = NULL
            WHERE status = 'processing'
              AND visible_after < $1
            ",
        )
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_db_err(DatabaseOperation::RecoverTimedOut, None)?;

        Ok(result.rows_affected())
    }

    async fn depth(&self) -> DatabaseResult<QueueDepth> {
        let operation = DatabaseOperation::QueueDepth;

        let row = sqlx::query(
            r"
            SELECT
                COUNT(*) FILTER (WHERE status = 'queued') as queued,
                COUNT(*) FILTER (WHERE status = 'processing') as processing,
                COUNT(*) FILTER (WHERE status = 'completed') as completed,
                COUNT(*) FILTER (WHERE status = 'failed') as failed
            FROM extract_text_jobs
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_db_err(operation, None)?;

        Ok(QueueDepth {
            queued: row.try_get("queued").unwrap_or(0),
            processing: row.try_get("processing").unwrap_or(0),
            completed: row.try_get("completed").unwrap_or(0),
            failed: row.try_get("failed").unwrap_or(0),
        })
    }
}
