//! Integration tests for the background extraction worker
//!
//! Jobs are processed step-wise through `process_one` against the in-memory
//! queue, repository and attachment source.

// Relax strict lints for test code
#![allow(clippy::unwrap_used)] // Tests can use unwrap for assertions
#![allow(clippy::expect_used)] // Tests can use expect for setup
#![allow(clippy::panic)] // Tests can panic on failure

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use ftsearch_config::WorkerConfig;
use ftsearch_extraction::{DecoderRegistry, TextExtractor};
use ftsearch_indexing::{
    AttachmentIndexer, ExtractOutcome, ExtractionWorker, FailureKind, JobOutcome,
    MockAttachmentSource, UpsertOutcome,
};
use ftsearch_meta_data::{
    Attachment, ExtractionQueue, JobStatus, MockExtractionQueue, MockSearcherRecordRepository,
};
use ftsearch_test_utils::{TestFiles, attachment_in, project};

struct Harness {
    worker: ExtractionWorker,
    indexer: Arc<AttachmentIndexer>,
    repository: MockSearcherRecordRepository,
    queue: MockExtractionQueue,
    source: MockAttachmentSource,
}

fn config() -> WorkerConfig {
    WorkerConfig {
        concurrency: 2,
        poll_interval_ms: 10,
        visibility_timeout_secs: 60,
        max_retries: 2,
    }
}

fn harness() -> Harness {
    let repository = MockSearcherRecordRepository::new();
    let queue = MockExtractionQueue::new();
    let source = MockAttachmentSource::new();
    let indexer = Arc::new(AttachmentIndexer::new(
        Arc::new(repository.clone()),
        Arc::new(queue.clone()),
        TextExtractor::new(DecoderRegistry::with_builtin(), 1 << 20),
        1024,
    ));
    let worker = ExtractionWorker::new(
        Arc::clone(&indexer),
        Arc::new(queue.clone()),
        Arc::new(source.clone()),
        config(),
    );
    Harness {
        worker,
        indexer,
        repository,
        queue,
        source,
    }
}

async fn index(harness: &Harness, attachment: Attachment) -> (i64, i64) {
    harness.source.insert(attachment.clone());
    match harness.indexer.upsert(&attachment).await.unwrap() {
        UpsertOutcome::Indexed { record_id, job_id } => (record_id, job_id),
        UpsertOutcome::Skipped(reason) => panic!("attachment skipped: {reason:?}"),
    }
}

#[tokio::test]
async fn test_empty_queue_returns_none() {
    let harness = harness();
    assert!(harness.worker.process_one().await.unwrap().is_none());
}

#[tokio::test]
async fn test_job_is_extracted_and_acked() {
    let harness = harness();
    let files = TestFiles::new();
    let (record_id, job_id) = index(
        &harness,
        attachment_in(project(1), files.write("a.txt", b"searchable words")),
    )
    .await;

    let processed = harness.worker.process_one().await.unwrap().unwrap();

    assert_eq!(processed.job_id, job_id);
    assert_eq!(processed.searcher_record_id, record_id);
    assert!(matches!(
        processed.outcome,
        JobOutcome::Extracted(ExtractOutcome::Stored { .. })
    ));
    assert_eq!(harness.queue.job(job_id).unwrap().status, JobStatus::Completed);
    assert_eq!(
        harness.queue.job(job_id).unwrap().claimed_by.as_deref(),
        Some(harness.worker.worker_id())
    );
    assert_eq!(
        harness.repository.get(record_id).unwrap().content.as_deref(),
        Some("searchable words")
    );
}

#[tokio::test]
async fn test_decode_failure_is_acked_not_retried() {
    let harness = harness();
    let files = TestFiles::new();
    let mut attachment = attachment_in(project(1), files.write("bad.pdf", b"garbage"));
    attachment.content_type = Some("application/pdf".to_string());
    let (_, job_id) = index(&harness, attachment).await;

    let processed = harness.worker.process_one().await.unwrap().unwrap();

    assert_eq!(
        processed.outcome,
        JobOutcome::Extracted(ExtractOutcome::Failed(FailureKind::Decode))
    );
    assert_eq!(harness.queue.job(job_id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn test_vanished_attachment_is_acked() {
    let harness = harness();
    let files = TestFiles::new();
    let attachment = attachment_in(project(1), files.write("a.txt", b"a"));
    let attachment_id = attachment.id;
    let (_, job_id) = index(&harness, attachment).await;
    harness.source.remove(attachment_id);

    let processed = harness.worker.process_one().await.unwrap().unwrap();

    assert_eq!(processed.outcome, JobOutcome::AttachmentMissing);
    assert_eq!(harness.queue.job(job_id).unwrap().status, JobStatus::Completed);
}

#[tokio::test]
async fn test_deleted_record_is_acked() {
    let harness = harness();
    let files = TestFiles::new();
    let (record_id, _) = index(
        &harness,
        attachment_in(project(1), files.write("a.txt", b"a")),
    )
    .await;
    harness.repository.records.lock().unwrap().remove(&record_id);

    let processed = harness.worker.process_one().await.unwrap().unwrap();

    assert_eq!(processed.outcome, JobOutcome::RecordMissing);
}

#[tokio::test]
async fn test_persistence_failure_requeues_until_retries_exhausted() {
    let harness = harness();
    let files = TestFiles::new();
    let (_, job_id) = index(
        &harness,
        attachment_in(project(1), files.write("a.txt", b"a")),
    )
    .await;

    harness.source.fail_next("host unavailable");
    let first = harness.worker.process_one().await.unwrap().unwrap();
    assert_eq!(first.outcome, JobOutcome::Retried(JobStatus::Queued));
    let last_error = harness.queue.job(job_id).unwrap().last_error.unwrap();
    assert!(last_error.ends_with("host unavailable"));

    harness.repository.fail_next("connection reset");
    let second = harness.worker.process_one().await.unwrap().unwrap();
    assert_eq!(second.job_id, job_id);
    assert_eq!(second.outcome, JobOutcome::Retried(JobStatus::Failed));
    assert!(harness.worker.process_one().await.unwrap().is_none());
}

#[tokio::test]
async fn test_queue_failure_surfaces_to_caller() {
    let harness = harness();
    harness.queue.fail_next("queue down");
    assert!(harness.worker.process_one().await.is_err());
}

#[tokio::test]
async fn test_run_drains_queue_and_stops_on_shutdown() {
    let harness = harness();
    let files = TestFiles::new();
    let mut record_ids = Vec::new();
    for index_no in 0..4 {
        let name = format!("doc{index_no}.txt");
        let (record_id, _) = index(
            &harness,
            attachment_in(project(1), files.write(&name, name.as_bytes())),
        )
        .await;
        record_ids.push(record_id);
    }

    let shutdown = harness.worker.shutdown_handle();
    let worker = harness.worker.clone();
    let running = tokio::spawn(async move { worker.run().await });

    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if harness.queue.depth().await.unwrap().completed == 4 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    shutdown.store(true, Ordering::Relaxed);
    tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .expect("worker should stop")
        .unwrap();

    assert!(drained.is_ok(), "queue was not drained");
    for (index_no, record_id) in record_ids.into_iter().enumerate() {
        assert_eq!(
            harness.repository.get(record_id).unwrap().content,
            Some(format!("doc{index_no}.txt"))
        );
    }
}
