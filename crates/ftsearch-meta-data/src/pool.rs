//! Database connection pool management and migrations

use anyhow::{Context, Result};
use sqlx::PgPool;

use crate::error::{DatabaseError, DatabaseResult};
use ftsearch_config::DatabaseConfig;

/// Create database connection pool
///
/// # Errors
///
/// Returns an error if:
/// - Database server is unreachable or refuses connections
/// - Authentication credentials are invalid
/// - Connection timeout is exceeded
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    config
        .create_pool()
        .await
        .with_context(|| {
            format!(
                "Failed to create database pool for {}",
                config.safe_connection_string()
            )
        })
}

/// Run all pending embedded migrations
///
/// # Errors
///
/// Returns `DatabaseError::MigrationFailed` if a migration cannot be applied
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|source| DatabaseError::MigrationFailed {
            message: source.to_string(),
            source,
        })?;

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Initialize database (create pool and run migrations when enabled)
///
/// # Errors
///
/// Returns an error if:
/// - Pool creation fails (see `create_pool` errors)
/// - Database migrations fail to run
pub async fn initialize_database(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = create_pool(config).await?;

    if config.auto_migrate {
        run_migrations(&pool)
            .await
            .context("Failed to run database migrations")?;
    }

    Ok(pool)
}
