//! Error types for attachment indexing

use ftsearch_meta_data::DatabaseError;
use thiserror::Error;

/// Result type alias for indexing operations
pub type IndexerResult<T> = std::result::Result<T, IndexerError>;

/// Failures that escape the indexer
///
/// Decode and resource failures are contained inside the indexer and never
/// appear here; persistence failures always do.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DatabaseError),

    #[error("Attachment lookup failed for attachment {attachment_id}: {message}")]
    AttachmentSource {
        attachment_id: i64,
        message: String,
    },
}
