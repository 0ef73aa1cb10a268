//! In-memory implementations of the repository and queue traits for testing

// Allow test-specific patterns in mock implementation
#![allow(clippy::unwrap_used)] // Mocks can panic on lock poisoning
#![allow(clippy::expect_used)] // Test code can use expect
#![allow(clippy::arithmetic_side_effects)] // Test counters can overflow
#![allow(clippy::significant_drop_tightening)] // Mock locks don't need optimization

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{DatabaseError, DatabaseOperation, DatabaseResult};
use crate::models::{ExtractionJob, JobStatus, QueueDepth, SearcherRecord};
use crate::traits::{ExtractionQueue, SearcherRecordRepository};

/// One-shot failure switch shared by the mocks
#[derive(Clone, Default)]
struct FailSwitch {
    message: Arc<Mutex<Option<String>>>,
}

impl FailSwitch {
    fn arm(&self, message: &str) {
        *self.message.lock().unwrap() = Some(message.to_string());
    }

    fn check(&self, operation: DatabaseOperation) -> DatabaseResult<()> {
        match self.message.lock().unwrap().take() {
            Some(message) => Err(DatabaseError::UnexpectedState {
                operation: Box::new(operation),
                message,
                correlation_id: None,
            }),
            None => Ok(()),
        }
    }
}

/// Mock searcher record repository
#[derive(Clone, Default)]
pub struct MockSearcherRecordRepository {
    pub records: Arc<Mutex<BTreeMap<i64, SearcherRecord>>>,
    /// Every `(id, content)` pair written through `update_content`
    pub content_writes: Arc<Mutex<Vec<(i64, String)>>>,
    fail: FailSwitch,
}

impl MockSearcherRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure to fail on next operation
    pub fn fail_next(&self, message: &str) {
        self.fail.arm(message);
    }

    /// Insert a record directly, assigning an id when missing
    pub fn insert(&self, mut record: SearcherRecord) -> i64 {
        let mut records = self.records.lock().unwrap();
        let id = record
            .id
            .unwrap_or_else(|| records.keys().next_back().map_or(1, |last| last + 1));
        record.id = Some(id);
        records.insert(id, record);
        id
    }

    pub fn get(&self, id: i64) -> Option<SearcherRecord> {
        self.records.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SearcherRecordRepository for MockSearcherRecordRepository {
    async fn find_by_original(
        &self,
        original_id: i64,
        original_type: &str,
    ) -> DatabaseResult<Option<SearcherRecord>> {
        self.fail.check(DatabaseOperation::FindByOriginal {
            original_id,
            original_type: original_type.to_string(),
        })?;

        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.original_id == original_id && r.original_type == original_type)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<SearcherRecord>> {
        self.fail.check(DatabaseOperation::FindById { id })?;
        Ok(self.get(id))
    }

    async fn save(&self, record: &SearcherRecord) -> DatabaseResult<i64> {
        self.fail.check(DatabaseOperation::SaveRecord {
            original_id: record.original_id,
            original_type: record.original_type.clone(),
        })?;

        let existing = self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                r.original_id == record.original_id && r.original_type == record.original_type
            })
            .cloned();

        let mut stored = record.clone();
        match existing {
            Some(existing) => {
                stored.id = existing.id;
                stored.content = existing.content;
            }
            None => {
                stored.id = None;
                stored.content = None;
            }
        }
        Ok(self.insert(stored))
    }

    async fn update_content(&self, id: i64, content: &str) -> DatabaseResult<()> {
        self.fail.check(DatabaseOperation::UpdateContent {
            id,
            content_bytes: content.len(),
        })?;

        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::UnexpectedState {
                operation: Box::new(DatabaseOperation::UpdateContent {
                    id,
                    content_bytes: content.len(),
                }),
                message: "record not found".to_string(),
                correlation_id: None,
            })?;
        record.content = Some(content.to_string());
        self.content_writes
            .lock()
            .unwrap()
            .push((id, content.to_string()));
        Ok(())
    }
}

/// Job as stored by [`MockExtractionQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockJob {
    pub id: i64,
    pub searcher_record_id: i64,
    pub status: JobStatus,
    pub retry_count: i32,
    pub claimed_by: Option<String>,
    pub last_error: Option<String>,
}

/// Mock extraction queue with FIFO claiming
#[derive(Clone, Default)]
pub struct MockExtractionQueue {
    pub jobs: Arc<Mutex<Vec<MockJob>>>,
    fail: FailSwitch,
}

impl MockExtractionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure to fail on next operation
    pub fn fail_next(&self, message: &str) {
        self.fail.arm(message);
    }

    pub fn job(&self, job_id: i64) -> Option<MockJob> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .find(|job| job.id == job_id)
            .cloned()
    }

    /// Record ids of every job ever enqueued, in order
    pub fn enqueued_record_ids(&self) -> Vec<i64> {
        self.jobs
            .lock()
            .unwrap()
            .iter()
            .map(|job| job.searcher_record_id)
            .collect()
    }

    fn update<F>(&self, job_id: i64, operation: DatabaseOperation, f: F) -> DatabaseResult<MockJob>
    where
        F: FnOnce(&mut MockJob),
    {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .iter_mut()
            .find(|job| job.id == job_id)
            .ok_or_else(|| DatabaseError::UnexpectedState {
                operation: Box::new(operation),
                message: format!("job {job_id} not found"),
                correlation_id: None,
            })?;
        f(job);
        Ok(job.clone())
    }
}

#[async_trait]
impl ExtractionQueue for MockExtractionQueue {
    async fn enqueue(&self, searcher_record_id: i64) -> DatabaseResult<i64> {
        self.fail
            .check(DatabaseOperation::Enqueue { searcher_record_id })?;

        let mut jobs = self.jobs.lock().unwrap();
        let id = i64::try_from(jobs.len()).unwrap() + 1;
        jobs.push(MockJob {
            id,
            searcher_record_id,
            status: JobStatus::Queued,
            retry_count: 0,
            claimed_by: None,
            last_error: None,
        });
        Ok(id)
    }

    async fn dequeue(
        &self,
        worker_id: &str,
        _visibility_timeout: Duration,
    ) -> DatabaseResult<Option<ExtractionJob>> {
        self.fail.check(DatabaseOperation::Dequeue {
            worker_id: worker_id.to_string(),
        })?;

        let mut jobs = self.jobs.lock().unwrap();
        Ok(jobs
            .iter_mut()
            .find(|job| job.status == JobStatus::Queued)
            .map(|job| {
                job.status = JobStatus::Processing;
                job.claimed_by = Some(worker_id.to_string());
                ExtractionJob {
                    id: job.id,
                    searcher_record_id: job.searcher_record_id,
                    retry_count: job.retry_count,
                }
            }))
    }

    async fn ack(&self, job_id: i64) -> DatabaseResult<()> {
        let operation = DatabaseOperation::Ack { job_id };
        self.fail.check(operation.clone())?;
        self.update(job_id, operation, |job| job.status = JobStatus::Completed)?;
        Ok(())
    }

    async fn requeue(
        &self,
        job_id: i64,
        error: &str,
        max_retries: u32,
    ) -> DatabaseResult<JobStatus> {
        let operation = DatabaseOperation::Requeue { job_id };
        self.fail.check(operation.clone())?;
        let job = self.update(job_id, operation, |job| {
            job.retry_count += 1;
            job.claimed_by = None;
            job.last_error = Some(error.to_string());
            job.status = if u32::try_from(job.retry_count).unwrap_or(u32::MAX) >= max_retries {
                JobStatus::Failed
            } else {
                JobStatus::Queued
            };
        })?;
        Ok(job.status)
    }

    async fn recover_timed_out(&self) -> DatabaseResult<u64> {
        self.fail.check(DatabaseOperation::RecoverTimedOut)?;
        // Mock jobs never time out
        Ok(0)
    }

    async fn depth(&self) -> DatabaseResult<QueueDepth> {
        self.fail.check(DatabaseOperation::QueueDepth)?;
        let jobs = self.jobs.lock().unwrap();
        let count = |status: JobStatus| {
            i64::try_from(jobs.iter().filter(|job| job.status == status).count()).unwrap()
        };
        Ok(QueueDepth {
            queued: count(JobStatus::Queued),
            processing: count(JobStatus::Processing),
            completed: count(JobStatus::Completed),
            failed: count(JobStatus::Failed),
        })
    }
}
