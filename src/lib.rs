//! Foreman - Background Task Processing Engine
//!
//! Foreman is a priority-queued, multi-worker task execution system with
//! retry/backoff, trigger-based task creation, and periodic rule-based
//! monitoring. It is in-memory and single-process; transports, storage,
//! and concrete business handlers plug in through injected ports.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Pure business logic and domain models
//! - **Application Layer** (`application`): Engine assembly and worker execution
//! - **Service Layer** (`services`): Queue, gateway, monitor, retry, store
//! - **Infrastructure Layer** (`infrastructure`): Configuration and logging wiring
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use foreman::application::Engine;
//! use foreman::domain::models::{EngineConfig, Trigger};
//! use foreman::domain::ports::NullMetricSource;
//! use foreman::services::{EchoHandler, HandlerRegistry};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut registry = HandlerRegistry::new();
//!     registry.register("echo", Arc::new(EchoHandler));
//!
//!     let mut engine = Engine::new(
//!         EngineConfig::default(),
//!         registry,
//!         Arc::new(NullMetricSource),
//!     );
//!     engine.register_trigger(Trigger::new("ping", "echo")).await;
//!     engine.start().await?;
//!     // ... feed triggers through engine.gateway() ...
//!     engine.stop().await?;
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{Engine, EngineState, EngineStats};
pub use domain::errors::{EngineError, EngineResult};
pub use domain::models::{
    BackpressurePolicy, ComparisonOp, EngineConfig, MonitoringRule, Payload, Task, TaskPriority,
    TaskSource, TaskStatus, Trigger,
};
pub use domain::ports::{
    CompletionProvider, MetricSource, MetricValue, NullMetricSource, TaskHandler,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{HandlerRegistry, StatusStore, TaskFilters, TaskQueue, TriggerGateway};
