//! Task domain model.
//!
//! Tasks are discrete units of work produced by triggers and monitoring
//! rules and consumed by the worker pool.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key/value payload handed to a task handler.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Status of a task in the execution pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is enqueued and waiting for a worker
    Pending,
    /// Task is currently being executed
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed with a retryable error
    FailedTransient,
    /// Task is waiting out its backoff delay before re-enqueue
    Retrying,
    /// Task failed and will never be retried
    FailedPermanent,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::FailedTransient => "failed_transient",
            Self::Retrying => "retrying",
            Self::FailedPermanent => "failed_permanent",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" | "complete" => Some(Self::Completed),
            "failed_transient" => Some(Self::FailedTransient),
            "retrying" => Some(Self::Retrying),
            "failed_permanent" | "failed" => Some(Self::FailedPermanent),
            _ => None,
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::FailedPermanent)
    }

    /// Valid transitions from this status.
    pub fn valid_transitions(&self) -> Vec<TaskStatus> {
        match self {
            Self::Pending => vec![Self::Running, Self::FailedPermanent],
            Self::Running => {
                vec![Self::Completed, Self::FailedTransient, Self::FailedPermanent]
            }
            Self::FailedTransient => vec![Self::Retrying, Self::FailedPermanent],
            Self::Retrying => vec![Self::Pending],
            Self::Completed => vec![],
            Self::FailedPermanent => vec![],
        }
    }

    pub fn can_transition_to(&self, new_status: Self) -> bool {
        self.valid_transitions().contains(&new_status)
    }
}

/// Priority level for tasks. Higher values are dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low = 1,
    Medium = 3,
    High = 5,
    Critical = 8,
    Emergency = 10,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
            Self::Emergency => "emergency",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            "emergency" => Some(Self::Emergency),
            _ => None,
        }
    }
}

/// Where a task originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Direct user action
    UserInteraction,
    /// Internal system event
    SystemEvent,
    /// Inbound webhook through the trigger gateway
    ApiWebhook,
    /// Periodic schedule
    ScheduledTask,
    /// Monitoring rule match
    PatternDetection,
    /// Metric threshold breach
    ThresholdBreach,
    /// Upstream third-party API
    ExternalApi,
}

impl Default for TaskSource {
    fn default() -> Self {
        Self::SystemEvent
    }
}

impl TaskSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserInteraction => "user_interaction",
            Self::SystemEvent => "system_event",
            Self::ApiWebhook => "api_webhook",
            Self::ScheduledTask => "scheduled_task",
            Self::PatternDetection => "pattern_detection",
            Self::ThresholdBreach => "threshold_breach",
            Self::ExternalApi => "external_api",
        }
    }
}

/// A discrete unit of schedulable work.
///
/// At most one of `result` / `error` is populated, and only once the task
/// reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: Uuid,
    /// Handler selection key
    pub task_type: String,
    /// Dispatch priority
    pub priority: TaskPriority,
    /// Where this task originated from
    pub source: TaskSource,
    /// Opaque payload passed to the handler
    pub payload: Payload,
    /// Task IDs that must complete before this task may run
    pub dependencies: Vec<Uuid>,
    /// Current status
    pub status: TaskStatus,
    /// Retry count
    pub retry_count: u32,
    /// Maximum retries
    pub max_retries: u32,
    /// Soft execution budget in seconds
    pub timeout_secs: u64,
    /// When created
    pub created_at: DateTime<Utc>,
    /// When execution started
    pub started_at: Option<DateTime<Utc>>,
    /// When a terminal state was reached
    pub completed_at: Option<DateTime<Utc>>,
    /// Handler output, set on `Completed`
    pub result: Option<Payload>,
    /// Failure detail, set on `FailedPermanent`
    pub error: Option<String>,
}

impl Task {
    /// Create a new pending task for the given handler type.
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            priority: TaskPriority::default(),
            source: TaskSource::default(),
            payload: Payload::new(),
            dependencies: Vec::new(),
            status: TaskStatus::default(),
            retry_count: 0,
            max_retries: 3,
            timeout_secs: 300,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// Set priority.
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set task source.
    pub fn with_source(mut self, source: TaskSource) -> Self {
        self.source = source;
        self
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, task_id: Uuid) -> Self {
        if !self.dependencies.contains(&task_id) && task_id != self.id {
            self.dependencies.push(task_id);
        }
        self
    }

    /// Set the retry budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the soft execution budget.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Soft execution budget as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Check if can transition to given status.
    pub fn can_transition_to(&self, new_status: TaskStatus) -> bool {
        self.status.can_transition_to(new_status)
    }

    /// Transition to new status, stamping lifecycle timestamps.
    pub fn transition_to(
        &mut self,
        new_status: TaskStatus,
    ) -> Result<(), crate::domain::EngineError> {
        if !self.can_transition_to(new_status) {
            return Err(crate::domain::EngineError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: new_status.as_str().to_string(),
            });
        }

        self.status = new_status;
        match new_status {
            TaskStatus::Running => self.started_at = Some(Utc::now()),
            TaskStatus::Completed | TaskStatus::FailedPermanent => {
                self.completed_at = Some(Utc::now());
            }
            _ => {}
        }

        Ok(())
    }

    /// Check if task is terminal.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Check if the retry budget allows another attempt.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Record a successful outcome.
    pub fn complete(&mut self, result: Payload) -> Result<(), crate::domain::EngineError> {
        self.transition_to(TaskStatus::Completed)?;
        self.result = Some(result);
        self.error = None;
        Ok(())
    }

    /// Record a permanent failure.
    pub fn fail_permanently(
        &mut self,
        error: impl Into<String>,
    ) -> Result<(), crate::domain::EngineError> {
        self.transition_to(TaskStatus::FailedPermanent)?;
        self.error = Some(error.into());
        self.result = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("project_analysis");
        assert_eq!(task.task_type, "project_analysis");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.retry_count, 0);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::Emergency > TaskPriority::Critical);
        assert!(TaskPriority::Critical > TaskPriority::High);
        assert!(TaskPriority::High > TaskPriority::Medium);
        assert!(TaskPriority::Medium > TaskPriority::Low);
    }

    #[test]
    fn test_task_state_transitions() {
        let mut task = Task::new("billing_summary");

        assert!(task.can_transition_to(TaskStatus::Running));
        task.transition_to(TaskStatus::Running).unwrap();
        assert!(task.started_at.is_some());

        task.transition_to(TaskStatus::Completed).unwrap();
        assert!(task.completed_at.is_some());
        assert!(task.is_terminal());
    }

    #[test]
    fn test_retry_cycle_transitions() {
        let mut task = Task::new("billing_summary");
        task.transition_to(TaskStatus::Running).unwrap();
        task.transition_to(TaskStatus::FailedTransient).unwrap();
        task.transition_to(TaskStatus::Retrying).unwrap();
        task.transition_to(TaskStatus::Pending).unwrap();
        task.transition_to(TaskStatus::Running).unwrap();
        task.transition_to(TaskStatus::FailedTransient).unwrap();
        task.transition_to(TaskStatus::FailedPermanent).unwrap();
        assert!(task.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut task = Task::new("compliance_check");
        task.transition_to(TaskStatus::Running).unwrap();
        task.transition_to(TaskStatus::Completed).unwrap();

        assert!(task.transition_to(TaskStatus::Running).is_err());
        assert!(task.transition_to(TaskStatus::Pending).is_err());
    }

    #[test]
    fn test_outcome_exclusivity() {
        let mut ok_task = Task::new("echo");
        ok_task.transition_to(TaskStatus::Running).unwrap();
        ok_task.complete(Payload::new()).unwrap();
        assert!(ok_task.result.is_some());
        assert!(ok_task.error.is_none());

        let mut failed_task = Task::new("echo");
        failed_task.transition_to(TaskStatus::Running).unwrap();
        failed_task.fail_permanently("handler exploded").unwrap();
        assert!(failed_task.result.is_none());
        assert_eq!(failed_task.error.as_deref(), Some("handler exploded"));
    }

    #[test]
    fn test_task_dependencies() {
        let dep_id = Uuid::new_v4();
        let task = Task::new("report")
            .with_dependency(dep_id)
            .with_dependency(dep_id);

        assert_eq!(task.dependencies, vec![dep_id]);
        assert!(task.has_dependencies());
    }

    #[test]
    fn test_self_dependency_ignored() {
        let task = Task::new("report");
        let id = task.id;
        let task = task.with_dependency(id);
        assert!(!task.has_dependencies());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::FailedTransient,
            TaskStatus::Retrying,
            TaskStatus::FailedPermanent,
        ] {
            assert_eq!(TaskStatus::from_str(status.as_str()), Some(status));
        }
    }
}
