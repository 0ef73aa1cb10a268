//! Repository and queue traits for dependency injection and testing

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DatabaseResult;
use crate::models::{ExtractionJob, JobStatus, QueueDepth, SearcherRecord};

/// Persistence of searchable records
#[async_trait]
pub trait SearcherRecordRepository: Send + Sync {
    /// Look up the record projected from a host entity
    async fn find_by_original(
        &self,
        original_id: i64,
        original_type: &str,
    ) -> DatabaseResult<Option<SearcherRecord>>;

    async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<SearcherRecord>>;

    /// Upsert identity, scope and metadata keyed by `(original_id, original_type)`
    ///
    /// `content` is never written here; use [`Self::update_content`].
    /// Returns the persisted record id.
    async fn save(&self, record: &SearcherRecord) -> DatabaseResult<i64>;

    /// Replace the stored content of a record in full
    async fn update_content(&self, id: i64, content: &str) -> DatabaseResult<()>;
}

/// Persistent queue of pending extractions
#[async_trait]
pub trait ExtractionQueue: Send + Sync {
    /// Enqueue a record for extraction, returns the job id
    async fn enqueue(&self, searcher_record_id: i64) -> DatabaseResult<i64>;

    /// Claim the oldest visible job (SKIP LOCKED pattern)
    ///
    /// The claimed job stays invisible to other workers for `visibility_timeout`.
    async fn dequeue(
        &self,
        worker_id: &str,
        visibility_timeout: Duration,
    ) -> DatabaseResult<Option<ExtractionJob>>;

    /// Mark a job as completed
    async fn ack(&self, job_id: i64) -> DatabaseResult<()>;

    /// Return a job to the queue, or fail it once `max_retries` is reached
    async fn requeue(&self, job_id: i64, error: &str, max_retries: u32)
    -> DatabaseResult<JobStatus>;

    /// Release jobs whose visibility timeout expired, returns the count
    async fn recover_timed_out(&self) -> DatabaseResult<u64>;

    /// Job counts by status
    async fn depth(&self) -> DatabaseResult<QueueDepth>;
}
