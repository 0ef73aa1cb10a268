//! Full-text search over PGroonga for ftsearch
//!
//! Compiles engine-agnostic search commands into `pgroonga_command` calls,
//! runs them against the configured index and parses the engine response.

pub mod client;
pub mod command;
pub mod compiler;
pub mod error;
pub mod mock;
pub mod response;
pub mod time_offset;

// Re-export main types
pub use client::{PgroongaClient, PostgresSearchExecutor, SearchExecutor};
pub use command::{ArgumentValue, FILTER, SELECT, SearchCommand, TABLE};
pub use compiler::{CompiledQuery, LIVENESS_PREDICATE, SearchCommandCompiler};
pub use error::{SearchError, SearchResult};
pub use mock::MockSearchExecutor;
pub use response::{Column, ResponseBody, ResponseHeader, SearchResponse, SelectResult};
pub use time_offset::{TimeOffsetCache, local_date_range};
