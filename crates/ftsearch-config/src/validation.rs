//! Configuration validation framework

use crate::{ConfigError, ConfigResult};
use regex::Regex;

/// Get SQL identifier regex - returns None if regex compilation fails
fn get_identifier_regex() -> Option<&'static Regex> {
    static IDENTIFIER_REGEX: std::sync::OnceLock<Option<Regex>> = std::sync::OnceLock::new();
    IDENTIFIER_REGEX
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").ok())
        .as_ref()
}

/// Trait for validating configuration values
pub trait Validate {
    /// Validate this configuration object
    ///
    /// # Errors
    /// Returns validation errors if the configuration is invalid
    fn validate(&self) -> ConfigResult<()>;
}

/// Validate an unquoted `PostgreSQL` identifier
///
/// # Errors
/// Returns `ConfigError::InvalidIdentifier` if the value is not a plain identifier
pub fn validate_identifier(value: &str, field_name: &str) -> ConfigResult<()> {
    let valid = get_identifier_regex().map_or_else(
        || {
            !value.is_empty()
                && value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        },
        |regex| regex.is_match(value),
    );

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field: field_name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Validate a value is within a range
///
/// # Errors
/// Returns `ConfigError::OutOfRange` if value is outside the specified range
pub fn validate_range(value: u64, min: u64, max: u64, field_name: &str) -> ConfigResult<()> {
    if value < min || value > max {
        Err(ConfigError::OutOfRange {
            field: field_name.to_string(),
            value,
            min,
            max,
        })
    } else {
        Ok(())
    }
}

/// Validate a string is not empty
///
/// # Errors
/// Returns `ConfigError::MissingField` if the string is empty or whitespace-only
pub fn validate_non_empty(value: &str, field_name: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        Err(ConfigError::MissingField {
            field: field_name.to_string(),
        })
    } else {
        Ok(())
    }
}
