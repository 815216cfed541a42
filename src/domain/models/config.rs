use serde::{Deserialize, Serialize};

/// Main configuration structure for the Foreman engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Number of concurrent workers (1-100)
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Default soft execution budget for gateway-created tasks, in seconds
    #[serde(default = "default_task_timeout_secs")]
    pub default_task_timeout_secs: u64,

    /// Task queue configuration
    #[serde(default)]
    pub queue: QueueConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Monitoring loop configuration
    #[serde(default)]
    pub monitoring: MonitoringConfig,

    /// Status store housekeeping configuration
    #[serde(default)]
    pub housekeeping: HousekeepingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

const fn default_worker_count() -> usize {
    10
}

const fn default_task_timeout_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            default_task_timeout_secs: default_task_timeout_secs(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
            monitoring: MonitoringConfig::default(),
            housekeeping: HousekeepingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// What `enqueue` does when the queue is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressurePolicy {
    /// Producer waits until a slot frees up
    Block,
    /// Enqueue fails immediately with a queue-full error
    Reject,
}

/// Task queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Maximum number of queued tasks
    #[serde(default = "default_queue_capacity")]
    pub capacity: usize,

    /// Behavior when the queue is full
    #[serde(default = "default_backpressure")]
    pub backpressure: BackpressurePolicy,
}

const fn default_queue_capacity() -> usize {
    10_000
}

const fn default_backpressure() -> BackpressurePolicy {
    BackpressurePolicy::Reject
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: default_queue_capacity(),
            backpressure: default_backpressure(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Default maximum number of retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff delay in seconds
    #[serde(default = "default_initial_backoff_secs")]
    pub initial_backoff_secs: u64,

    /// Maximum backoff delay in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_secs() -> u64 {
    60
}

const fn default_max_backoff_secs() -> u64 {
    300
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_secs: default_initial_backoff_secs(),
            max_backoff_secs: default_max_backoff_secs(),
        }
    }
}

/// Monitoring loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitoringConfig {
    /// Rule evaluation interval in seconds
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
}

const fn default_tick_interval_secs() -> u64 {
    30
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
        }
    }
}

/// Status store housekeeping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HousekeepingConfig {
    /// How long terminal task records are retained, in hours
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,

    /// Purge pass interval in seconds
    #[serde(default = "default_purge_interval_secs")]
    pub purge_interval_secs: u64,
}

const fn default_retention_hours() -> u64 {
    24
}

const fn default_purge_interval_secs() -> u64 {
    30
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            retention_hours: default_retention_hours(),
            purge_interval_secs: default_purge_interval_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.worker_count, 10);
        assert_eq!(config.default_task_timeout_secs, 300);
        assert_eq!(config.queue.capacity, 10_000);
        assert_eq!(config.queue.backpressure, BackpressurePolicy::Reject);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_backoff_secs, 60);
        assert_eq!(config.retry.max_backoff_secs, 300);
        assert_eq!(config.monitoring.tick_interval_secs, 30);
        assert_eq!(config.housekeeping.retention_hours, 24);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"worker_count": 4, "queue": {"capacity": 64}}"#).unwrap();
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.queue.capacity, 64);
        assert_eq!(config.queue.backpressure, BackpressurePolicy::Reject);
        assert_eq!(config.retry.max_retries, 3);
    }
}
