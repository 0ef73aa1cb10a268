//! Global initialization utilities for the application

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize the application environment
///
/// Loads environment variables from a `.env` file if one exists in the
/// current directory or any parent.
///
/// Safe to call multiple times - will only run once
pub fn initialize_environment() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
    });
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `default_level` when set. With `json` enabled every
/// event is emitted as one JSON object per line for log aggregators.
/// Returns `false` when a subscriber was already installed.
pub fn initialize_tracing(default_level: &str, json: bool) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    }
}
