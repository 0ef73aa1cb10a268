//! Attachment indexing: record upsert and asynchronous text extraction

use std::sync::Arc;

use ftsearch_config::ExtractionConfig;
use ftsearch_extraction::{
    ContentNormalizer, ExtractionError, FailureKind, TextExtractor, guess_from_path,
    resolve_content_type,
};
use ftsearch_meta_data::{
    ATTACHMENT_TYPE, Attachment, ExtractionQueue, SearcherRecord, SearcherRecordRepository,
};
use tracing::{debug, error, info};

use crate::context::{ExtractionContext, LOG_TARGET};
use crate::error::IndexerResult;
use crate::scope::resolve_scope;

type RepositoryRef = Arc<dyn SearcherRecordRepository>;
type QueueRef = Arc<dyn ExtractionQueue>;

/// Why an attachment was not indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Uploaded but not attached to anything yet
    Unattached,
    /// Container kind without a project association
    NoProjectAssociation,
}

/// Result of [`AttachmentIndexer::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Skipped(SkipReason),
    Indexed { record_id: i64, job_id: i64 },
}

/// Result of [`AttachmentIndexer::extract_and_store`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// File cannot be opened right now
    NotReadable,
    /// Attachment has no searcher record yet
    NoRecord,
    /// Extraction failed and was logged; stored content is untouched
    Failed(FailureKind),
    Stored {
        record_id: i64,
        bytes: usize,
        truncated: bool,
    },
}

/// Projects attachments into searcher records and fills in their content
pub struct AttachmentIndexer {
    repository: RepositoryRef,
    queue: QueueRef,
    extractor: TextExtractor,
    normalizer: ContentNormalizer,
}

impl AttachmentIndexer {
    pub fn new(
        repository: RepositoryRef,
        queue: QueueRef,
        extractor: TextExtractor,
        max_text_size: u64,
    ) -> Self {
        let max_text_size = usize::try_from(max_text_size).unwrap_or(usize::MAX);
        Self {
            repository,
            queue,
            extractor,
            normalizer: ContentNormalizer::new(max_text_size),
        }
    }

    /// Indexer with the built-in decoders and configured limits
    pub fn from_config(
        repository: RepositoryRef,
        queue: QueueRef,
        config: &ExtractionConfig,
    ) -> Self {
        Self::new(
            repository,
            queue,
            TextExtractor::from_config(config),
            config.max_text_size,
        )
    }

    pub fn repository(&self) -> RepositoryRef {
        Arc::clone(&self.repository)
    }

    /// Create or update the searcher record of `attachment` and schedule
    /// extraction of its content
    ///
    /// Unattached attachments and containers without a project association
    /// are skipped without side effects. Stored content is never touched.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Persistence` if the record cannot be saved or
    /// the extraction job cannot be enqueued
    pub async fn upsert(&self, attachment: &Attachment) -> IndexerResult<UpsertOutcome> {
        let Some(container) = attachment.container.as_ref() else {
            return Ok(UpsertOutcome::Skipped(SkipReason::Unattached));
        };
        let Some(scope) = resolve_scope(container) else {
            debug!(
                target: LOG_TARGET,
                attachment_id = attachment.id,
                container_type = container.type_name(),
                "Skipping attachment without project association"
            );
            return Ok(UpsertOutcome::Skipped(SkipReason::NoProjectAssociation));
        };

        let mut record = self
            .repository
            .find_by_original(attachment.id, ATTACHMENT_TYPE)
            .await?
            .unwrap_or_else(|| SearcherRecord::new(attachment.id, ATTACHMENT_TYPE));

        record.container_id = Some(container.id());
        record.container_type = Some(container.type_name().to_string());
        record.filename = Some(attachment.filename.clone());
        record.description.clone_from(&attachment.description);
        record.original_created_on = Some(attachment.created_on);
        scope.apply_to(&mut record);

        let record_id = self.repository.save(&record).await?;
        let job_id = self.queue.enqueue(record_id).await?;

        debug!(
            target: LOG_TARGET,
            searcher_record_id = record_id,
            attachment_id = attachment.id,
            job_id,
            "Enqueued text extraction"
        );
        Ok(UpsertOutcome::Indexed { record_id, job_id })
    }

    /// Extract the text of `attachment` and store it on its searcher record
    ///
    /// Decode and resource failures are logged and reported as
    /// [`ExtractOutcome::Failed`]; the record keeps its previous content.
    /// Running this twice on an unchanged file stores identical content.
    ///
    /// # Errors
    ///
    /// Returns `IndexerError::Persistence` if the record cannot be read or
    /// its content cannot be written
    pub async fn extract_and_store(&self, attachment: &Attachment) -> IndexerResult<ExtractOutcome> {
        if !attachment.is_readable() {
            return Ok(ExtractOutcome::NotReadable);
        }
        let Some(record_id) = self
            .repository
            .find_by_original(attachment.id, ATTACHMENT_TYPE)
            .await?
            .and_then(|record| record.id)
        else {
            return Ok(ExtractOutcome::NoRecord);
        };

        let path = attachment.disk_path.as_path();
        let declared = attachment
            .content_type
            .as_deref()
            .filter(|content_type| !content_type.trim().is_empty())
            .unwrap_or_else(|| guess_from_path(path));
        let content_type = resolve_content_type(path, declared);
        let max_size = u64::try_from(self.normalizer.max_size()).unwrap_or(u64::MAX);

        let mut context = ExtractionContext::begin(
            record_id,
            attachment.id,
            path.to_path_buf(),
            content_type.to_string(),
            max_size,
        );
        debug!(target: LOG_TARGET, "{}", context.format_message("Extracting...", None));

        let result = match self.extractor.extract(path, content_type, max_size).await {
            Ok(raw) => self.normalizer.normalize(raw),
            Err(error) => Err(error),
        };
        context.finish();

        let normalized = match result {
            Ok(normalized) => normalized,
            Err(error) => {
                log_failure(&context, &error);
                return Ok(ExtractOutcome::Failed(error.kind()));
            }
        };

        debug!(target: LOG_TARGET, "{}", context.format_message("Extracted", None));
        if normalized.truncated {
            info!(
                target: LOG_TARGET,
                "{}",
                context.format_message(
                    &format!(
                        "Truncated extracted text: {} -> {}",
                        normalized.original_size,
                        normalized.text.len()
                    ),
                    None
                )
            );
        }

        self.repository
            .update_content(record_id, &normalized.text)
            .await?;

        Ok(ExtractOutcome::Stored {
            record_id,
            bytes: normalized.text.len(),
            truncated: normalized.truncated,
        })
    }
}

fn log_failure(context: &ExtractionContext, error: &ExtractionError) {
    let message = match error.kind() {
        FailureKind::Decode => "Failed to extract text",
        FailureKind::ResourceExhausted => "Failed to extract text by no memory",
    };
    error!(
        target: LOG_TARGET,
        failure_kind = %error.kind(),
        "{}",
        context.format_message(message, Some(error))
    );
}
