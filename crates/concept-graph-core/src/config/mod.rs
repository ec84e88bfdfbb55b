//! Configuration management for the Concept Graph system.

mod sub_configs;

#[cfg(test)]
mod tests;

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

pub use sub_configs::{
    CacheConfig, ExtractionConfig, IndexConfig, LoggingConfig, ReasoningConfig, ServerConfig,
    StorageConfig,
};

/// Main configuration structure.
///
/// Every section is optional in TOML; missing sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{CONCEPT_GRAPH_ENV}.toml (environment-specific)
    /// 3. Environment variables with CONCEPT_GRAPH__ prefix,
    ///    e.g. `CONCEPT_GRAPH__SERVER__PORT=9000`
    pub fn load() -> CoreResult<Self> {
        let env = std::env::var("CONCEPT_GRAPH_ENV").unwrap_or_else(|_| "development".to_string());
        debug!(env = %env, "Loading layered configuration");

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                config::Environment::with_prefix("CONCEPT_GRAPH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| CoreError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// FAIL FAST: the first invalid section aborts startup.
    pub fn validate(&self) -> CoreResult<()> {
        if self.storage.data_dir.trim().is_empty() {
            return Err(CoreError::ConfigError(
                "storage.data_dir must not be empty".into(),
            ));
        }
        if self.storage.reconcile_interval_ms == 0 {
            return Err(CoreError::ConfigError(
                "storage.reconcile_interval_ms must be greater than 0".into(),
            ));
        }
        self.server.validate()?;
        self.index.validate()?;
        self.cache.validate()?;
        self.reasoning.validate()?;
        self.extraction.validate()?;
        Ok(())
    }
}
