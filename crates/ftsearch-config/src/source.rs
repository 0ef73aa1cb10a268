//! Layered configuration sources
//!
//! The environment provides the base configuration. Each source is an
//! overlay on top of it: keys a source sets replace the current values, keys
//! it leaves out keep them. A `[worker]` table holding only `max_retries`
//! therefore leaves `FTSEARCH_WORKER_CONCURRENCY` in effect.

use std::path::{Path, PathBuf};

use toml::{Table, Value};

use crate::validation::Validate;
use crate::{ApplicationConfig, ConfigError, ConfigResult};

/// A configuration layer applied over the values loaded so far
pub trait ConfigurationSource {
    /// Overlay this source onto `config`
    ///
    /// # Errors
    /// Returns an error when the source cannot be read or names unknown keys
    fn apply(&self, config: ApplicationConfig) -> ConfigResult<ApplicationConfig>;

    /// Name used in log lines
    fn name(&self) -> &str;
}

/// TOML file overlay
pub struct TomlFileSource {
    path: PathBuf,
}

impl TomlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigurationSource for TomlFileSource {
    fn apply(&self, config: ApplicationConfig) -> ConfigResult<ApplicationConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        overlay_toml(config, &content)
    }

    fn name(&self) -> &'static str {
        "toml_file"
    }
}

/// Apply the keys set in `content` over `config`
fn overlay_toml(config: ApplicationConfig, content: &str) -> ConfigResult<ApplicationConfig> {
    let overrides: Table = toml::from_str(content)?;

    let Value::Table(mut merged) = Value::try_from(&config)? else {
        return Err(ConfigError::Generic {
            message: "configuration did not serialize to a table".to_string(),
        });
    };
    merge_tables(&mut merged, overrides, "")?;

    let config: ApplicationConfig = Value::Table(merged).try_into()?;
    Ok(config)
}

/// Replace values in `base` key by key, descending into nested tables
fn merge_tables(base: &mut Table, overrides: Table, prefix: &str) -> ConfigResult<()> {
    for (key, value) in overrides {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match (base.get_mut(&key), value) {
            (Some(Value::Table(section)), Value::Table(values)) => {
                merge_tables(section, values, &path)?;
            }
            (Some(slot), value) => *slot = value,
            (None, _) => return Err(ConfigError::UnknownKey { key: path }),
        }
    }
    Ok(())
}

/// Configuration loader that layers sources over the environment
///
/// Sources apply in the order they were added. The first failing source
/// aborts the load, and the final result is validated.
pub struct ConfigurationLoader {
    sources: Vec<Box<dyn ConfigurationSource>>,
}

impl ConfigurationLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigurationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Load `FTSEARCH_*` variables, then overlay every source
    ///
    /// # Errors
    /// Returns the first source failure, or validation errors for the result
    pub fn load(&self) -> ConfigResult<ApplicationConfig> {
        let mut config = ApplicationConfig::from_env();

        for source in &self.sources {
            config = source.apply(config)?;
            tracing::debug!(source = source.name(), "Applied configuration source");
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new()
    }
}
