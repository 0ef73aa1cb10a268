//! Persistence layer for searchable records and the extraction queue

pub mod error;
pub mod models;
pub mod pool;
pub mod queue;
pub mod repository;
pub mod traits;

pub mod mock;
pub use mock::{MockExtractionQueue, MockSearcherRecordRepository};

pub use error::{DatabaseError, DatabaseErrorExt, DatabaseOperation, DatabaseResult};
pub use ftsearch_config::DatabaseConfig;
pub use models::{
    ATTACHMENT_TYPE, Attachment, Board, Container, ContainerEntity, ExtractionJob,
    HasProjectAssociation, Issue, JobStatus, Message, ProjectRef, QueueDepth, SearcherRecord,
    Wiki, WikiPage,
};
pub use pool::{create_pool, initialize_database, run_migrations};
pub use queue::PostgresExtractionQueue;
pub use repository::DbSearcherRecordRepository;
pub use traits::{ExtractionQueue, SearcherRecordRepository};
