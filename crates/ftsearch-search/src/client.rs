//! Execution of compiled commands through PGroonga

use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

use ftsearch_common::CorrelationId;
use ftsearch_config::SearchConfig;

use crate::command::SearchCommand;
use crate::compiler::{CompiledQuery, SearchCommandCompiler};
use crate::error::{SearchError, SearchResult};
use crate::response::SearchResponse;

/// Runs a compiled query and returns its single scalar result
#[async_trait]
pub trait SearchExecutor: Send + Sync {
    async fn select_value(&self, query: &CompiledQuery) -> Result<Option<String>, sqlx::Error>;
}

/// Executor backed by a Postgres pool with the PGroonga extension
#[derive(Clone)]
pub struct PostgresSearchExecutor {
    pool: PgPool,
}

impl PostgresSearchExecutor {
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchExecutor for PostgresSearchExecutor {
    async fn select_value(&self, query: &CompiledQuery) -> Result<Option<String>, sqlx::Error> {
        let mut statement = sqlx::query_scalar::<_, Option<String>>(&query.sql);
        for param in &query.params {
            statement = statement.bind(param);
        }
        statement.fetch_one(&self.pool).await
    }
}

/// Compiles, executes and parses search commands
pub struct PgroongaClient {
    executor: Arc<dyn SearchExecutor>,
    compiler: SearchCommandCompiler,
}

impl PgroongaClient {
    pub fn new(executor: Arc<dyn SearchExecutor>, compiler: SearchCommandCompiler) -> Self {
        Self { executor, compiler }
    }

    pub fn from_pool(pool: PgPool, config: &SearchConfig) -> Self {
        Self::new(
            Arc::new(PostgresSearchExecutor::new(pool)),
            SearchCommandCompiler::from_config(config),
        )
    }

    pub const fn compiler(&self) -> &SearchCommandCompiler {
        &self.compiler
    }

    /// Run `command` against the index
    ///
    /// Each execution is wrapped in a `groonga.search` span carrying the
    /// compiled SQL, whether or not it succeeds.
    ///
    /// # Errors
    ///
    /// Returns `QueryFailed` when the driver fails, `EmptyResponse` when the
    /// engine returns NULL, `MalformedResponse` when the result cannot be
    /// parsed and `Engine` when the engine reports an error
    pub async fn select(&self, command: &SearchCommand) -> SearchResult<SearchResponse> {
        let prepared = self.compiler.prepare(command);
        let query = self.compiler.compile_prepared(&prepared);
        let correlation_id = CorrelationId::new();

        let span = tracing::info_span!(
            "groonga.search",
            sql = %query.sql,
            command = command.name(),
            correlation_id = %correlation_id
        );
        let raw = self
            .executor
            .select_value(&query)
            .instrument(span)
            .await
            .map_err(|source| SearchError::QueryFailed {
                command: command.name().to_string(),
                correlation_id: correlation_id.clone(),
                source,
            })?
            .ok_or_else(|| SearchError::EmptyResponse {
                command: command.name().to_string(),
                correlation_id,
            })?;

        SearchResponse::parse(&prepared, &raw)?.into_result()
    }
}
