//! Retry scheduling with exponential backoff.
//!
//! Transient task failures land here. While the retry budget lasts, the
//! scheduler computes `min(initial * 2^retry_count, cap)`, parks the task
//! in `Retrying`, and re-enqueues it from a detached timer after the delay
//! (eventual, not exact; the timer holds no shared lock while sleeping).
//! An exhausted budget finalizes the task as permanently failed.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::domain::models::{RetryConfig, Task, TaskStatus};
use crate::services::queue::TaskQueue;
use crate::services::status_store::StatusStore;

/// Routes transient failures back into the queue or to a terminal record.
pub struct RetryScheduler {
    config: RetryConfig,
    queue: Arc<TaskQueue>,
    store: Arc<StatusStore>,
}

impl RetryScheduler {
    pub fn new(config: RetryConfig, queue: Arc<TaskQueue>, store: Arc<StatusStore>) -> Self {
        Self {
            config,
            queue,
            store,
        }
    }

    /// Backoff delay for the given attempt number (after increment).
    ///
    /// Non-decreasing in `retry_count` and capped at the configured
    /// maximum.
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let secs = self
            .config
            .initial_backoff_secs
            .saturating_mul(2_u64.saturating_pow(retry_count))
            .min(self.config.max_backoff_secs);
        Duration::from_secs(secs)
    }

    /// Route a transient failure for a task currently in `Running`.
    ///
    /// Either schedules a delayed re-enqueue (incrementing `retry_count`)
    /// or, when the budget is spent, records a permanent failure.
    pub async fn handle_transient_failure(&self, mut task: Task, cause: String) {
        if let Err(e) = task.transition_to(TaskStatus::FailedTransient) {
            error!(task_id = %task.id, error = %e, "Refusing retry for task not in a retryable state");
            return;
        }

        if !task.can_retry() {
            warn!(
                task_id = %task.id,
                retry_count = task.retry_count,
                "Retry budget exhausted, failing permanently"
            );
            self.finalize_permanent(task, cause).await;
            return;
        }

        task.retry_count += 1;
        let delay = self.backoff_delay(task.retry_count);
        if let Err(e) = task.transition_to(TaskStatus::Retrying) {
            error!(task_id = %task.id, error = %e, "Failed to park task for retry");
            return;
        }
        debug!(
            task_id = %task.id,
            retry_count = task.retry_count,
            delay_secs = delay.as_secs(),
            cause = %cause,
            "Scheduling retry"
        );
        self.store.put(task.clone()).await;

        let queue = Arc::clone(&self.queue);
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if let Err(e) = task.transition_to(TaskStatus::Pending) {
                error!(task_id = %task.id, error = %e, "Failed to restore task to pending");
                return;
            }
            store.put(task.clone()).await;

            let task_id = task.id;
            if let Err(e) = queue.enqueue(task).await {
                // Re-enqueue was rejected (queue saturated); the retry is lost,
                // so record the failure where callers can find it.
                error!(task_id = %task_id, error = %e, "Retry re-enqueue rejected");
                if let Some(mut record) = store.get(task_id).await {
                    record.status = TaskStatus::FailedPermanent;
                    record.completed_at = Some(chrono::Utc::now());
                    record.error = Some(format!("retry re-enqueue failed: {e}"));
                    store.put(record).await;
                }
            }
        });
    }

    /// Record a permanent failure for a task in `FailedTransient`.
    async fn finalize_permanent(&self, mut task: Task, cause: String) {
        if let Err(e) = task.fail_permanently(cause) {
            error!(task_id = %task.id, error = %e, "Failed to finalize task");
            return;
        }
        self.store.put(task).await;
    }
}
