//! Task handler port.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::Payload;

/// A processing function for one task type.
///
/// Handlers receive the task's opaque payload and return either a result
/// map or an error. Any returned error is treated as transient and routed
/// through the retry scheduler; handlers are expected to treat the task's
/// timeout budget as advisory and yield periodically.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Execute the handler against a task payload.
    async fn handle(&self, payload: &Payload) -> Result<Payload>;
}
