use ftsearch_common::CorrelationId;
use thiserror::Error;

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Search-specific error types with correlation ID support
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search command '{command}' failed (correlation: {correlation_id}): {source}")]
    QueryFailed {
        command: String,
        correlation_id: CorrelationId,
        #[source]
        source: sqlx::Error,
    },

    #[error("Search command '{command}' returned no response (correlation: {correlation_id})")]
    EmptyResponse {
        command: String,
        correlation_id: CorrelationId,
    },

    #[error("Malformed response to search command '{command}': {message}")]
    MalformedResponse { command: String, message: String },

    #[error("Search engine rejected '{command}' with code {return_code}: {message}")]
    Engine {
        command: String,
        return_code: i64,
        message: String,
    },

    #[error("Invalid search command: {0}")]
    InvalidCommand(String),
}

impl SearchError {
    pub fn malformed(command: &str, message: impl std::fmt::Display) -> Self {
        Self::MalformedResponse {
            command: command.to_string(),
            message: message.to_string(),
        }
    }
}
