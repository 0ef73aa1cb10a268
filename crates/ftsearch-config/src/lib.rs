//! Centralized configuration management for ftsearch
//!
//! Configuration follows a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides (`FTSEARCH_*`)
//! 3. Optional TOML file via [`source::TomlFileSource`], overlaid key by key
//! 4. Runtime validation

pub mod error;
pub mod source;
pub mod validation;

pub use error::{ConfigError, ConfigResult};

// =============================================================================
// SAFE DEFAULTS - Work for any environment (dev, staging, prod, test)
// =============================================================================

// Extraction Configuration
const DEFAULT_MAX_TEXT_SIZE: u64 = 4 * 1024 * 1024; // Stored bytes per record
const DEFAULT_MAX_DECODED_SIZE: u64 = 256 * 1024 * 1024; // Decode-time ceiling

// Search Configuration
const DEFAULT_INDEX_NAME: &str = "searcher_records_index";

// Worker Configuration
const DEFAULT_WORKER_CONCURRENCY: usize = 2;
const DEFAULT_WORKER_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_WORKER_VISIBILITY_TIMEOUT_SECS: u64 = 600;
const DEFAULT_WORKER_MAX_RETRIES: u32 = 3;

// Database Configuration (safe local defaults)
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_NAME: &str = "ftsearch";
const DEFAULT_DB_USER: &str = "ftsearch";
const DEFAULT_DB_PASSWORD: &str = "localdev123";
const DEFAULT_DB_SSL_MODE: &str = "disable";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_DB_IDLE_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_AUTO_MIGRATE: bool = true;

// Telemetry Configuration
const DEFAULT_TRACING_LEVEL: &str = "info";
const DEFAULT_JSON_LOGS: bool = false;

use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
};
use std::time::Duration;

/// Parse an environment variable, falling back to `default` when unset or malformed
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Core configuration for the entire ftsearch application
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Text extraction budget and limits
    pub extraction: ExtractionConfig,

    /// Search engine bridge configuration
    pub search: SearchConfig,

    /// Background extraction worker configuration
    pub worker: WorkerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Logging configuration
    pub telemetry: TelemetryConfig,
}

/// Text extraction limits
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExtractionConfig {
    /// Maximum byte length of text stored per searchable record
    pub max_text_size: u64,

    /// Maximum bytes a decoder may produce before the attempt is abandoned
    /// as resource exhaustion. Must be at least `max_text_size`.
    pub max_decoded_size: u64,
}

impl ExtractionConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            max_text_size: env_or("FTSEARCH_EXTRACTION_MAX_TEXT_SIZE", DEFAULT_MAX_TEXT_SIZE),
            max_decoded_size: env_or(
                "FTSEARCH_EXTRACTION_MAX_DECODED_SIZE",
                DEFAULT_MAX_DECODED_SIZE,
            ),
        }
    }
}

impl validation::Validate for ExtractionConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.max_text_size, 1, u64::from(u32::MAX), "max_text_size")?;
        if self.max_decoded_size < self.max_text_size {
            return Err(ConfigError::Generic {
                message: format!(
                    "max_decoded_size ({}) must be >= max_text_size ({})",
                    self.max_decoded_size, self.max_text_size
                ),
            });
        }
        Ok(())
    }
}

/// PGroonga bridge configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchConfig {
    /// Name of the PGroonga index over `searcher_records`
    pub index_name: String,
}

impl SearchConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            index_name: std::env::var("FTSEARCH_SEARCH_INDEX_NAME")
                .unwrap_or_else(|_| DEFAULT_INDEX_NAME.to_string()),
        }
    }
}

impl validation::Validate for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_identifier(&self.index_name, "index_name")
    }
}

/// Background worker configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorkerConfig {
    /// Number of extraction jobs processed concurrently
    pub concurrency: usize,

    /// How often to poll the queue when it is empty (milliseconds)
    pub poll_interval_ms: u64,

    /// Seconds a claimed job stays invisible before another worker may retry it
    pub visibility_timeout_secs: u64,

    /// Attempts before a job is marked failed
    pub max_retries: u32,
}

impl WorkerConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            concurrency: env_or("FTSEARCH_WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY),
            poll_interval_ms: env_or(
                "FTSEARCH_WORKER_POLL_INTERVAL_MS",
                DEFAULT_WORKER_POLL_INTERVAL_MS,
            ),
            visibility_timeout_secs: env_or(
                "FTSEARCH_WORKER_VISIBILITY_TIMEOUT_SECS",
                DEFAULT_WORKER_VISIBILITY_TIMEOUT_SECS,
            ),
            max_retries: env_or("FTSEARCH_WORKER_MAX_RETRIES", DEFAULT_WORKER_MAX_RETRIES),
        }
    }
}

impl validation::Validate for WorkerConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_range(self.concurrency as u64, 1, 256, "concurrency")?;
        validation::validate_range(self.poll_interval_ms, 10, 60_000, "poll_interval_ms")?;
        validation::validate_range(
            self.visibility_timeout_secs,
            1,
            86_400,
            "visibility_timeout_secs",
        )?;
        validation::validate_range(u64::from(self.max_retries), 0, 100, "max_retries")?;
        Ok(())
    }
}

/// Database configuration - comprehensive `PostgreSQL` configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    /// Database host
    pub host: String,

    /// Database port
    pub port: u16,

    /// Database name
    pub database: String,

    /// Username for authentication
    pub username: String,

    /// Password for authentication (use environment variables for security)
    pub password: String,

    /// SSL mode for connections ("disable", "prefer", "require")
    pub ssl_mode: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Minimum number of connections in pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub timeout_seconds: u64,

    /// Idle timeout in seconds
    pub idle_timeout_seconds: u64,

    /// Enable migrations on startup
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        let host = std::env::var("FTSEARCH_DATABASE_HOST")
            .or_else(|_| std::env::var("DB_HOST"))
            .unwrap_or_else(|_| DEFAULT_DB_HOST.to_string());

        let port = std::env::var("FTSEARCH_DATABASE_PORT")
            .or_else(|_| std::env::var("DB_PORT"))
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_DB_PORT);

        let database = std::env::var("FTSEARCH_DATABASE_NAME")
            .or_else(|_| std::env::var("DB_NAME"))
            .unwrap_or_else(|_| DEFAULT_DB_NAME.to_string());

        let username = std::env::var("FTSEARCH_DATABASE_USERNAME")
            .or_else(|_| std::env::var("DB_USER"))
            .unwrap_or_else(|_| DEFAULT_DB_USER.to_string());

        let password = std::env::var("FTSEARCH_DATABASE_PASSWORD")
            .or_else(|_| std::env::var("DB_PASSWORD"))
            .unwrap_or_else(|_| {
                tracing::warn!(
                    "Using default database password - set FTSEARCH_DATABASE_PASSWORD or DB_PASSWORD"
                );
                DEFAULT_DB_PASSWORD.to_string()
            });

        let ssl_mode = std::env::var("FTSEARCH_DATABASE_SSL_MODE")
            .or_else(|_| std::env::var("DB_SSLMODE"))
            .unwrap_or_else(|_| DEFAULT_DB_SSL_MODE.to_string());

        Self {
            host,
            port,
            database,
            username,
            password,
            ssl_mode,
            max_connections: env_or("FTSEARCH_DATABASE_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            min_connections: env_or("FTSEARCH_DATABASE_MIN_CONNECTIONS", DEFAULT_DB_MIN_CONNECTIONS),
            timeout_seconds: env_or("FTSEARCH_DATABASE_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECONDS),
            idle_timeout_seconds: env_or(
                "FTSEARCH_DATABASE_IDLE_TIMEOUT_SECONDS",
                DEFAULT_DB_IDLE_TIMEOUT_SECONDS,
            ),
            auto_migrate: env_or("FTSEARCH_DATABASE_AUTO_MIGRATE", DEFAULT_AUTO_MIGRATE),
        }
    }

    /// Convert string SSL mode to `PgSslMode`
    fn parse_ssl_mode(&self) -> PgSslMode {
        match self.ssl_mode.as_str() {
            "disable" => PgSslMode::Disable,
            "require" => PgSslMode::Require,
            _ => PgSslMode::Prefer,
        }
    }

    /// Build `PostgreSQL` connection options without exposing the password in a URL
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password)
            .ssl_mode(self.parse_ssl_mode())
            .application_name("ftsearch")
    }

    /// Create a `PostgreSQL` connection pool with proper configuration
    ///
    /// # Errors
    /// Returns an error if connection to database fails
    pub async fn create_pool(&self) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.timeout_seconds))
            .idle_timeout(Duration::from_secs(self.idle_timeout_seconds))
            .connect_with(self.connect_options())
            .await
    }

    /// Get connection info for logging (NO PASSWORD!)
    pub fn safe_connection_string(&self) -> String {
        format!(
            "{}@{}:{}/{} (ssl: {})",
            self.username, self.host, self.port, self.database, self.ssl_mode
        )
    }
}

impl validation::Validate for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::validate_non_empty(&self.host, "host")?;
        validation::validate_non_empty(&self.database, "database")?;
        validation::validate_range(u64::from(self.max_connections), 1, 1000, "max_connections")?;
        validation::validate_range(self.timeout_seconds, 1, 3600, "timeout_seconds")?;
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Generic {
                message: format!(
                    "min_connections ({}) must not exceed max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TelemetryConfig {
    /// Default tracing level when `RUST_LOG` is not set
    pub tracing_level: String,

    /// Emit one JSON object per log line
    pub json_logs: bool,
}

impl TelemetryConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            tracing_level: std::env::var("FTSEARCH_TELEMETRY_TRACING_LEVEL")
                .unwrap_or_else(|_| DEFAULT_TRACING_LEVEL.to_string()),
            json_logs: env_or("FTSEARCH_TELEMETRY_JSON_LOGS", DEFAULT_JSON_LOGS),
        }
    }
}

impl validation::Validate for TelemetryConfig {
    fn validate(&self) -> ConfigResult<()> {
        match self.tracing_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Generic {
                message: format!("Invalid tracing level: {}", self.tracing_level),
            }),
        }
    }
}

impl ApplicationConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            extraction: ExtractionConfig::from_env(),
            search: SearchConfig::from_env(),
            worker: WorkerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            telemetry: TelemetryConfig::from_env(),
        }
    }
}

impl validation::Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.extraction.validate()?;
        self.search.validate()?;
        self.worker.validate()?;
        self.database.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
