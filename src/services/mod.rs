//! Service layer: the engine's coordinating components.

pub mod builtin_handlers;
pub mod gateway;
pub mod monitor;
pub mod queue;
pub mod registry;
pub mod retry;
pub mod status_store;

pub use builtin_handlers::{EchoHandler, SynthesisHandler};
pub use gateway::{TriggerGateway, TriggerReceipt};
pub use monitor::MonitoringEngine;
pub use queue::TaskQueue;
pub use registry::HandlerRegistry;
pub use retry::RetryScheduler;
pub use status_store::{StatusStore, TaskFilters};
