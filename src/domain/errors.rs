//! Domain errors for the Foreman engine.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the Foreman engine.
///
/// Validation variants (`UnknownTrigger`, `InactiveTrigger`, `MissingField`)
/// are surfaced synchronously to the caller and never create a task.
/// `UnknownTaskType` marks a permanent, non-retryable failure.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Trigger not found: {0}")]
    UnknownTrigger(String),

    #[error("Trigger is inactive: {0}")]
    InactiveTrigger(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    #[error("Task queue is full (capacity {0})")]
    QueueFull(usize),

    #[error("Task not found: {0}")]
    TaskNotFound(Uuid),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Engine is shutting down")]
    ShuttingDown,
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Whether this error belongs to the validation class: reported to the
    /// caller synchronously, no task created, never retried.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownTrigger(_) | Self::InactiveTrigger(_) | Self::MissingField(_)
        )
    }
}
