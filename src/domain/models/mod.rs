//! Domain models for the Foreman engine.

pub mod config;
pub mod queue;
pub mod rule;
pub mod task;
pub mod trigger;

pub use config::{
    BackpressurePolicy, EngineConfig, HousekeepingConfig, LoggingConfig, MonitoringConfig,
    QueueConfig, RetryConfig,
};
pub use queue::PriorityQueue;
pub use rule::{ComparisonOp, MonitoringRule};
pub use task::{Payload, Task, TaskPriority, TaskSource, TaskStatus};
pub use trigger::{FieldRequirement, Trigger};
