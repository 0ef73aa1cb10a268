//! Lookup of attachments owned by the host application

use async_trait::async_trait;
use ftsearch_meta_data::Attachment;

use crate::error::IndexerResult;

/// Host-side lookup used when a queued extraction job runs
///
/// The queue only stores searcher record ids; the attachment is reloaded
/// at execution time so permission and container changes made after
/// enqueueing are observed.
#[async_trait]
pub trait AttachmentSource: Send + Sync {
    /// Load an attachment by id, `None` when it no longer exists
    async fn find_attachment(&self, original_id: i64) -> IndexerResult<Option<Attachment>>;
}
