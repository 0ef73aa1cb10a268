//! Background worker for text extraction jobs
//!
//! Polls the persistent extraction queue and runs up to `concurrency`
//! extractions at a time. Each job reloads its attachment through the
//! [`AttachmentSource`] and hands it to [`AttachmentIndexer::extract_and_store`].
//!
//! Jobs are acked once extraction has run, including when the decoder
//! failed: those failures are contained and retrying would fail the same
//! way. Persistence and lookup failures requeue the job until
//! `max_retries` is reached.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use ftsearch_common::CorrelationId;
use ftsearch_config::WorkerConfig;
use ftsearch_meta_data::{ExtractionJob, ExtractionQueue, JobStatus, SearcherRecordRepository};

use crate::error::IndexerResult;
use crate::indexer::{AttachmentIndexer, ExtractOutcome};
use crate::source::AttachmentSource;

/// Backoff multiplier applied to the poll interval after a queue error
const ERROR_BACKOFF_FACTOR: u32 = 5;

/// What happened to one dequeued job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Extraction ran; the job was acked
    Extracted(ExtractOutcome),
    /// The searcher record was deleted after enqueueing
    RecordMissing,
    /// The host no longer knows the attachment
    AttachmentMissing,
    /// Another task of this worker is already extracting the same record
    Duplicate,
    /// A retryable failure returned the job to the queue (or failed it)
    Retried(JobStatus),
}

/// A job taken off the queue and its outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessedJob {
    pub job_id: i64,
    pub searcher_record_id: i64,
    pub outcome: JobOutcome,
}

/// Background worker for extraction jobs
#[derive(Clone)]
pub struct ExtractionWorker {
    indexer: Arc<AttachmentIndexer>,
    queue: Arc<dyn ExtractionQueue>,
    repository: Arc<dyn SearcherRecordRepository>,
    source: Arc<dyn AttachmentSource>,
    config: WorkerConfig,
    worker_id: String,
    shutdown_signal: Arc<AtomicBool>,
    /// Record id to job id of extractions currently running
    in_flight: Arc<DashMap<i64, i64>>,
}

impl ExtractionWorker {
    pub fn new(
        indexer: Arc<AttachmentIndexer>,
        queue: Arc<dyn ExtractionQueue>,
        source: Arc<dyn AttachmentSource>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repository: indexer.repository(),
            indexer,
            queue,
            source,
            config,
            worker_id: format!("text-extract-{}", CorrelationId::new()),
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// Identifier written to `claimed_by` for jobs taken by this worker
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Get a handle for graceful shutdown
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    fn visibility_timeout(&self) -> Duration {
        Duration::from_secs(self.config.visibility_timeout_secs)
    }

    /// Main worker loop
    ///
    /// Runs until the shutdown signal is set, then waits for running
    /// extractions to finish. Jobs abandoned by crashed workers are released
    /// back to the queue on every supervisor tick.
    pub async fn run(&self) {
        info!(
            worker_id = %self.worker_id,
            "Text extraction worker started (concurrency: {})",
            self.config.concurrency
        );

        let jobs_processed = Arc::new(AtomicUsize::new(0));
        let mut join_set = tokio::task::JoinSet::new();

        for task_id in 0..self.config.concurrency.max(1) {
            let worker = self.clone();
            let jobs_processed = Arc::clone(&jobs_processed);
            join_set.spawn(async move { worker.task_loop(task_id, jobs_processed).await });
        }

        loop {
            if self.shutdown_signal.load(Ordering::Relaxed) {
                info!("Shutdown signal received, waiting for extraction tasks to finish");
                break;
            }
            self.recover_timed_out().await;
            sleep(self.poll_interval()).await;
        }

        while let Some(result) = join_set.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Extraction task panicked");
            }
        }

        info!(
            "Text extraction worker stopped gracefully (processed {} jobs)",
            jobs_processed.load(Ordering::Relaxed)
        );
    }

    async fn recover_timed_out(&self) {
        match self.queue.recover_timed_out().await {
            Ok(0) => {}
            Ok(count) => warn!("Released {count} timed out extraction jobs"),
            Err(e) => error!("Failed to release timed out extraction jobs: {e}"),
        }
    }

    async fn task_loop(&self, task_id: usize, jobs_processed: Arc<AtomicUsize>) {
        debug!("Extraction task {task_id} starting");

        loop {
            if self.shutdown_signal.load(Ordering::Relaxed) {
                debug!("Extraction task {task_id}: shutdown signal received");
                break;
            }

            match self.process_one().await {
                Ok(Some(processed)) => {
                    jobs_processed.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        job_id = processed.job_id,
                        searcher_record_id = processed.searcher_record_id,
                        "Extraction task {task_id}: {:?}",
                        processed.outcome
                    );
                }
                Ok(None) => sleep(self.poll_interval()).await,
                Err(e) => {
                    error!("Extraction task {task_id}: queue operation failed: {e}");
                    sleep(self.poll_interval().saturating_mul(ERROR_BACKOFF_FACTOR)).await;
                }
            }
        }

        debug!("Extraction task {task_id} shutting down");
    }

    /// Process one job from the queue (for testing)
    ///
    /// Returns `None` when the queue is empty.
    ///
    /// # Errors
    ///
    /// Returns an error only when the queue itself fails; failures while
    /// running the job are recorded on the job instead
    pub async fn process_one(&self) -> IndexerResult<Option<ProcessedJob>> {
        let Some(job) = self
            .queue
            .dequeue(&self.worker_id, self.visibility_timeout())
            .await?
        else {
            return Ok(None);
        };

        let claimed = match self.in_flight.entry(job.searcher_record_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(job.id);
                true
            }
        };
        if !claimed {
            // The running extraction reads the same file and overwrites in full
            self.queue.ack(job.id).await?;
            return Ok(Some(processed(&job, JobOutcome::Duplicate)));
        }

        let result = self.run_job(&job).await;
        self.in_flight.remove(&job.searcher_record_id);

        let outcome = match result {
            Ok(outcome) => {
                self.queue.ack(job.id).await?;
                outcome
            }
            Err(e) => {
                let status = self
                    .queue
                    .requeue(job.id, &e.to_string(), self.config.max_retries)
                    .await?;
                error!(
                    job_id = job.id,
                    searcher_record_id = job.searcher_record_id,
                    retry_count = job.retry_count,
                    "Extraction job failed ({status}): {e}"
                );
                JobOutcome::Retried(status)
            }
        };

        Ok(Some(processed(&job, outcome)))
    }

    async fn run_job(&self, job: &ExtractionJob) -> IndexerResult<JobOutcome> {
        let Some(record) = self.repository.find_by_id(job.searcher_record_id).await? else {
            return Ok(JobOutcome::RecordMissing);
        };
        let Some(attachment) = self.source.find_attachment(record.original_id).await? else {
            return Ok(JobOutcome::AttachmentMissing);
        };

        let outcome = self.indexer.extract_and_store(&attachment).await?;
        Ok(JobOutcome::Extracted(outcome))
    }
}

const fn processed(job: &ExtractionJob, outcome: JobOutcome) -> ProcessedJob {
    ProcessedJob {
        job_id: job.id,
        searcher_record_id: job.searcher_record_id,
        outcome,
    }
}
