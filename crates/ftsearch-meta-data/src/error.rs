//! Structured error handling for the persistence layer
//!
//! Every database failure carries the operation it happened in, so a log line
//! for a failed save or dequeue names the record or job involved.

use std::fmt;
use thiserror::Error;

/// Result type alias for database operations
pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

/// Database operation type for error context
#[derive(Debug, Clone)]
pub enum DatabaseOperation {
    /// Searcher record operations
    FindByOriginal {
        original_id: i64,
        original_type: String,
    },
    FindById {
        id: i64,
    },
    SaveRecord {
        original_id: i64,
        original_type: String,
    },
    UpdateContent {
        id: i64,
        content_bytes: usize,
    },

    /// Extraction queue operations
    Enqueue {
        searcher_record_id: i64,
    },
    Dequeue {
        worker_id: String,
    },
    Ack {
        job_id: i64,
    },
    Requeue {
        job_id: i64,
    },
    RecoverTimedOut,
    QueueDepth,
}

impl fmt::Display for DatabaseOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindByOriginal {
                original_id,
                original_type,
            } => write!(
                f,
                "find_by_original(original_id={original_id}, original_type={original_type})"
            ),
            Self::FindById { id } => write!(f, "find_by_id(id={id})"),
            Self::SaveRecord {
                original_id,
                original_type,
            } => write!(
                f,
                "save_record(original_id={original_id}, original_type={original_type})"
            ),
            Self::UpdateContent { id, content_bytes } => {
                write!(f, "update_content(id={id}, bytes={content_bytes})")
            }

            Self::Enqueue { searcher_record_id } => {
                write!(f, "enqueue(searcher_record_id={searcher_record_id})")
            }
            Self::Dequeue { worker_id } => write!(f, "dequeue(worker={worker_id})"),
            Self::Ack { job_id } => write!(f, "ack(job_id={job_id})"),
            Self::Requeue { job_id } => write!(f, "requeue(job_id={job_id})"),
            Self::RecoverTimedOut => write!(f, "recover_timed_out"),
            Self::QueueDepth => write!(f, "queue_depth"),
        }
    }
}

/// Database error with operation context
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Database connection error
    #[error("Database connection failed: {message} (correlation_id={correlation_id:?})")]
    ConnectionFailed {
        message: String,
        correlation_id: Option<String>,
        #[source]
        source: sqlx::Error,
    },

    /// Query timeout
    #[error(
        "Query timeout for operation '{operation}' (correlation_id={correlation_id:?})"
    )]
    QueryTimeout {
        operation: Box<DatabaseOperation>,
        correlation_id: Option<String>,
        #[source]
        source: sqlx::Error,
    },

    /// Query execution error
    #[error(
        "Query failed for operation '{operation}': {message} (correlation_id={correlation_id:?})"
    )]
    QueryFailed {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
        #[source]
        source: sqlx::Error,
    },

    /// Constraint violation
    #[error(
        "Database constraint violation '{constraint}' (operation='{operation}', correlation_id={correlation_id:?})"
    )]
    ConstraintViolation {
        constraint: String,
        operation: Box<DatabaseOperation>,
        correlation_id: Option<String>,
        #[source]
        source: sqlx::Error,
    },

    /// Migration error
    #[error("Database migration failed: {message}")]
    MigrationFailed {
        message: String,
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// Unexpected database state
    #[error(
        "Unexpected database state for operation '{operation}': {message} (correlation_id={correlation_id:?})"
    )]
    UnexpectedState {
        operation: Box<DatabaseOperation>,
        message: String,
        correlation_id: Option<String>,
    },
}

impl DatabaseError {
    /// Create a new query failed error from `sqlx::Error`
    pub fn query_failed(
        operation: DatabaseOperation,
        source: sqlx::Error,
        correlation_id: Option<String>,
    ) -> Self {
        if let Some(constraint) = source
            .as_database_error()
            .and_then(|db_err| db_err.constraint())
            .map(ToString::to_string)
        {
            return Self::ConstraintViolation {
                constraint,
                operation: Box::new(operation),
                correlation_id,
                source,
            };
        }

        match source {
            sqlx::Error::PoolTimedOut => Self::QueryTimeout {
                operation: Box::new(operation),
                correlation_id,
                source,
            },
            sqlx::Error::Io(_) | sqlx::Error::PoolClosed | sqlx::Error::Tls(_) => {
                Self::ConnectionFailed {
                    message: source.to_string(),
                    correlation_id,
                    source,
                }
            }
            _ => Self::QueryFailed {
                operation: Box::new(operation),
                message: source.to_string(),
                correlation_id,
                source,
            },
        }
    }

    /// Get the correlation ID if present
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Self::ConnectionFailed { correlation_id, .. }
            | Self::QueryTimeout { correlation_id, .. }
            | Self::QueryFailed { correlation_id, .. }
            | Self::ConstraintViolation { correlation_id, .. }
            | Self::UnexpectedState { correlation_id, .. } => correlation_id.as_deref(),
            Self::MigrationFailed { .. } => None,
        }
    }
}

/// Extension trait for converting sqlx errors with context
#[allow(clippy::result_large_err)]
pub trait DatabaseErrorExt<T> {
    /// Convert to `DatabaseError` with operation context
    ///
    /// # Errors
    /// Returns `DatabaseError` with operation context and correlation ID
    fn map_db_err(
        self,
        operation: DatabaseOperation,
        correlation_id: Option<String>,
    ) -> DatabaseResult<T>;
}

impl<T> DatabaseErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn map_db_err(
        self,
        operation: DatabaseOperation,
        correlation_id: Option<String>,
    ) -> DatabaseResult<T> {
        self.map_err(|e| DatabaseError::query_failed(operation, e, correlation_id))
    }
}
