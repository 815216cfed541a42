//! Application layer: engine assembly and worker execution.

pub mod engine;
pub mod worker_pool;

pub use engine::{Engine, EngineState, EngineStats};
pub use worker_pool::WorkerPool;
