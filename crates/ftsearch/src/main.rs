//! ftsearch command line
//!
//! `migrate` applies the embedded schema, `work` runs the text extraction
//! worker until interrupted, `search` runs a single select against the index
//! and prints the result as JSON.

mod source;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::info;

use ftsearch_config::ApplicationConfig;
use ftsearch_config::source::{ConfigurationLoader, TomlFileSource};
use ftsearch_indexing::{AttachmentIndexer, ExtractionWorker};
use ftsearch_meta_data::{
    DbSearcherRecordRepository, ExtractionQueue, PostgresExtractionQueue, create_pool,
    initialize_database, run_migrations,
};
use ftsearch_search::{FILTER, PgroongaClient, SearchCommand, local_date_range};

use crate::source::HostAttachmentSource;

/// Column the `--from`/`--to` options filter on
const CREATED_ON_COLUMN: &str = "original_created_on";

/// Full-text search over host attachments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Optional TOML file; keys it sets override the `FTSEARCH_*` variables
    #[arg(long, short = 'c')]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending database migrations
    Migrate,

    /// Run the text extraction worker until interrupted
    Work {
        /// Root directory of the host's attachment storage
        #[arg(long, default_value = "files")]
        storage_dir: PathBuf,
    },

    /// Run a full-text query and print the matches as JSON
    Search {
        /// Engine query expression
        query: String,

        #[arg(long, default_value = "filename,description,content")]
        match_columns: String,

        #[arg(long, default_value = "_id,original_id,original_type,filename,_score")]
        output_columns: String,

        #[arg(long, default_value_t = 10)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Additional engine filter expression
        #[arg(long)]
        filter: Option<String>,

        /// First local day of attachment creation to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last local day of attachment creation to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    ftsearch_common::initialize_environment();

    let args = Args::parse();
    let config = load_config(args.config_file.as_deref())?;

    ftsearch_common::initialize_tracing(
        &config.telemetry.tracing_level,
        config.telemetry.json_logs,
    );
    info!(
        database = %config.database.safe_connection_string(),
        index = %config.search.index_name,
        "Configuration loaded"
    );

    match args.command {
        Command::Migrate => migrate(&config).await,
        Command::Work { storage_dir } => work(&config, storage_dir).await,
        Command::Search {
            query,
            match_columns,
            output_columns,
            limit,
            offset,
            filter,
            from,
            to,
        } => {
            let mut command = SearchCommand::select()
                .with("match_columns", match_columns)
                .with("query", query)
                .with("output_columns", output_columns)
                .with("limit", limit)
                .with("offset", offset);
            command.set_optional(FILTER, build_filter(filter, from, to)?.map(Into::into));
            search(&config, &command).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<ApplicationConfig> {
    let mut loader = ConfigurationLoader::new();
    if let Some(path) = path {
        loader = loader.add_source(Box::new(TomlFileSource::new(path)));
    }
    loader.load().context("Invalid configuration")
}

async fn migrate(config: &ApplicationConfig) -> Result<()> {
    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;
    Ok(())
}

async fn work(config: &ApplicationConfig, storage_dir: PathBuf) -> Result<()> {
    let pool = initialize_database(&config.database).await?;

    let repository = Arc::new(DbSearcherRecordRepository::new(pool.clone()));
    let queue: Arc<dyn ExtractionQueue> = Arc::new(PostgresExtractionQueue::new(pool.clone()));
    let source = Arc::new(HostAttachmentSource::new(pool, storage_dir));

    let indexer = Arc::new(AttachmentIndexer::from_config(
        repository,
        Arc::clone(&queue),
        &config.extraction,
    ));
    let worker = ExtractionWorker::new(indexer, queue, source, config.worker.clone());

    let shutdown = worker.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    worker.run().await;
    Ok(())
}

async fn search(config: &ApplicationConfig, command: &SearchCommand) -> Result<()> {
    let pool = create_pool(&config.database).await?;
    let client = PgroongaClient::from_pool(pool, &config.search);

    let response = client.select(command).await?;
    let output = match response.select() {
        Some(result) => serde_json::json!({
            "n_hits": result.n_hits,
            "columns": result.columns,
            "records": result.record_maps(),
        }),
        None => serde_json::json!({ "n_hits": 0, "records": [] }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Combine the caller's filter with an optional creation-date range
///
/// A single bound selects that one day.
fn build_filter(
    filter: Option<String>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Option<String>> {
    let range = match (from.or(to), to.or(from)) {
        (Some(start), Some(end)) => Some(local_date_range(CREATED_ON_COLUMN, start, end)?),
        _ => None,
    };

    Ok(match (filter, range) {
        (Some(filter), Some(range)) => Some(format!("({filter}) && {range}")),
        (filter, None) => filter,
        (None, range) => range,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_filter_passthrough() {
        let filter = build_filter(Some("is_private == false".into()), None, None).unwrap();
        assert_eq!(filter.as_deref(), Some("is_private == false"));
        assert_eq!(build_filter(None, None, None).unwrap(), None);
    }

    #[test]
    fn test_filter_with_date_range() {
        let range = local_date_range(CREATED_ON_COLUMN, day(1), day(3)).unwrap();
        let filter = build_filter(Some("project_id == 1".into()), Some(day(1)), Some(day(3)))
            .unwrap()
            .unwrap();
        assert_eq!(filter, format!("(project_id == 1) && {range}"));
    }

    #[test]
    fn test_single_bound_selects_one_day() {
        let expected = local_date_range(CREATED_ON_COLUMN, day(5), day(5)).unwrap();
        assert_eq!(
            build_filter(None, Some(day(5)), None).unwrap(),
            Some(expected.clone())
        );
        assert_eq!(build_filter(None, None, Some(day(5))).unwrap(), Some(expected));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert!(build_filter(None, Some(day(9)), Some(day(2))).is_err());
    }

    #[test]
    fn test_search_args_parse() {
        let args = Args::try_parse_from([
            "ftsearch", "search", "report", "--limit", "5", "--from", "2024-03-01",
        ])
        .unwrap();
        match args.command {
            Command::Search {
                query, limit, from, ..
            } => {
                assert_eq!(query, "report");
                assert_eq!(limit, 5);
                assert_eq!(from, Some(day(1)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
