//! Attachment indexing for ftsearch
//!
//! Projects host attachments into searcher records, schedules extraction of
//! their text, and runs the background worker that performs it.

pub mod context;
pub mod error;
pub mod indexer;
pub mod mock;
pub mod scope;
pub mod source;
pub mod worker;

pub use context::{ExtractionContext, LOG_TARGET, format_elapsed};
pub use error::{IndexerError, IndexerResult};
pub use indexer::{AttachmentIndexer, ExtractOutcome, SkipReason, UpsertOutcome};
pub use mock::MockAttachmentSource;
pub use scope::{IssueScope, Scope, resolve_scope};
pub use source::AttachmentSource;
pub use worker::{ExtractionWorker, JobOutcome, ProcessedJob};

// Re-export external crate types for convenience
pub use ftsearch_extraction::{ExtractionError, FailureKind};
pub use ftsearch_meta_data::{DatabaseError, DatabaseResult};
