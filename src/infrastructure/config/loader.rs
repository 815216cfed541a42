use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::EngineConfig;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid worker_count: {0}. Must be between 1 and 100")]
    InvalidWorkerCount(usize),

    #[error("Invalid queue capacity: {0}. Must be at least 1")]
    InvalidQueueCapacity(usize),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error(
        "Invalid backoff configuration: initial_backoff_secs ({0}) must be <= max_backoff_secs ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid monitoring tick_interval_secs: {0}. Cannot be 0")]
    InvalidTickInterval(u64),

    #[error("Invalid default_task_timeout_secs: {0}. Cannot be 0")]
    InvalidTaskTimeout(u64),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. foreman.yaml in the working directory
    /// 3. Environment variables (FOREMAN_* prefix, highest priority)
    pub fn load() -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file("foreman.yaml"))
            .merge(Env::prefixed("FOREMAN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<EngineConfig> {
        let config: EngineConfig = Figment::new()
            .merge(Serialized::defaults(EngineConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
        if config.worker_count == 0 || config.worker_count > 100 {
            return Err(ConfigError::InvalidWorkerCount(config.worker_count));
        }

        if config.queue.capacity == 0 {
            return Err(ConfigError::InvalidQueueCapacity(config.queue.capacity));
        }

        if config.retry.initial_backoff_secs > config.retry.max_backoff_secs {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_secs,
                config.retry.max_backoff_secs,
            ));
        }

        if config.monitoring.tick_interval_secs == 0 {
            return Err(ConfigError::InvalidTickInterval(
                config.monitoring.tick_interval_secs,
            ));
        }

        if config.default_task_timeout_secs == 0 {
            return Err(ConfigError::InvalidTaskTimeout(
                config.default_task_timeout_secs,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}
