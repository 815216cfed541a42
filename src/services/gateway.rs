//! Trigger gateway.
//!
//! The single intake path for tasks. External callers invoke named
//! triggers with a payload; the gateway validates the payload against the
//! trigger definition, builds a task, records it, and enqueues it. The
//! monitoring engine and programmatic producers reuse the same `submit`
//! path so every task enters the system identically.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::models::{Payload, Task, TaskPriority, TaskSource, Trigger};
use crate::domain::{EngineError, EngineResult};
use crate::services::queue::TaskQueue;
use crate::services::status_store::StatusStore;

/// Successful trigger invocation response.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerReceipt {
    pub status: String,
    pub trigger_id: Uuid,
    pub task_id: Uuid,
}

/// Validates trigger invocations and converts them into queued tasks.
///
/// Trigger definitions are registered at startup; at runtime only their
/// firing statistics mutate, so they sit behind their own `RwLock` rather
/// than contending with the queue.
pub struct TriggerGateway {
    triggers: RwLock<HashMap<String, Trigger>>,
    queue: Arc<TaskQueue>,
    store: Arc<StatusStore>,
    default_max_retries: u32,
    default_timeout_secs: u64,
}

impl TriggerGateway {
    pub fn new(
        queue: Arc<TaskQueue>,
        store: Arc<StatusStore>,
        default_max_retries: u32,
        default_timeout_secs: u64,
    ) -> Self {
        Self {
            triggers: RwLock::new(HashMap::new()),
            queue,
            store,
            default_max_retries,
            default_timeout_secs,
        }
    }

    /// Register a trigger definition. Replaces any definition with the
    /// same name.
    pub async fn register_trigger(&self, trigger: Trigger) {
        self.triggers
            .write()
            .await
            .insert(trigger.name.clone(), trigger);
    }

    /// Snapshot of all registered triggers.
    pub async fn list_triggers(&self) -> Vec<Trigger> {
        self.triggers.read().await.values().cloned().collect()
    }

    /// Task types referenced by registered triggers, for startup
    /// validation against the handler registry.
    pub async fn mapped_task_types(&self) -> Vec<String> {
        self.triggers
            .read()
            .await
            .values()
            .map(|t| t.task_type.clone())
            .collect()
    }

    /// Handle an external trigger invocation.
    ///
    /// Resolves the trigger, validates required payload fields, builds the
    /// mapped task, and enqueues it. On any validation failure no task is
    /// created.
    #[instrument(skip(self, payload), err)]
    pub async fn handle_trigger(
        &self,
        trigger_name: &str,
        payload: Payload,
    ) -> EngineResult<TriggerReceipt> {
        let (trigger_id, task_type) = {
            let triggers = self.triggers.read().await;
            let trigger = triggers
                .get(trigger_name)
                .ok_or_else(|| EngineError::UnknownTrigger(trigger_name.to_string()))?;
            if !trigger.is_active {
                return Err(EngineError::InactiveTrigger(trigger_name.to_string()));
            }

            for field in trigger.required_field_names() {
                if !payload.contains_key(field) {
                    return Err(EngineError::MissingField(field.to_string()));
                }
            }

            (trigger.id, trigger.task_type.clone())
        };

        let task = Task::new(task_type)
            .with_source(TaskSource::ApiWebhook)
            .with_priority(TaskPriority::High)
            .with_payload(payload)
            .with_max_retries(self.default_max_retries)
            .with_timeout_secs(self.default_timeout_secs);
        let task_id = self.submit(task).await?;

        if let Some(trigger) = self.triggers.write().await.get_mut(trigger_name) {
            trigger.record_fired();
        }

        info!(%trigger_id, %task_id, trigger = trigger_name, "Trigger fired");
        Ok(TriggerReceipt {
            status: "success".to_string(),
            trigger_id,
            task_id,
        })
    }

    /// Record a pending task and enqueue it.
    ///
    /// Shared by trigger invocations, the monitoring engine, and direct
    /// programmatic submission. If the queue rejects the task, the record
    /// is removed again so no orphan remains.
    pub async fn submit(&self, task: Task) -> EngineResult<Uuid> {
        let task_id = task.id;
        self.store.put(task.clone()).await;
        if let Err(e) = self.queue.enqueue(task).await {
            self.store.remove(task_id).await;
            return Err(e);
        }
        Ok(task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BackpressurePolicy, QueueConfig, TaskStatus};
    use std::time::Duration;

    fn gateway() -> (Arc<TriggerGateway>, Arc<TaskQueue>, Arc<StatusStore>) {
        let queue = Arc::new(TaskQueue::new(QueueConfig {
            capacity: 16,
            backpressure: BackpressurePolicy::Reject,
        }));
        let store = Arc::new(StatusStore::new());
        let gateway = Arc::new(TriggerGateway::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            3,
            300,
        ));
        (gateway, queue, store)
    }

    fn onboarding_trigger() -> Trigger {
        Trigger::new("client_onboarding", "project_analysis")
            .with_required_field("client_id")
            .with_optional_field("notes")
    }

    fn payload_with(fields: &[(&str, &str)]) -> Payload {
        let mut payload = Payload::new();
        for (key, value) in fields {
            payload.insert((*key).to_string(), serde_json::json!(value));
        }
        payload
    }

    #[tokio::test]
    async fn test_unknown_trigger_creates_no_task() {
        let (gateway, queue, store) = gateway();

        let err = gateway
            .handle_trigger("nope", Payload::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownTrigger(_)));
        assert!(queue.is_empty().await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_inactive_trigger_creates_no_task() {
        let (gateway, queue, _) = gateway();
        gateway
            .register_trigger(onboarding_trigger().with_active(false))
            .await;

        let err = gateway
            .handle_trigger("client_onboarding", payload_with(&[("client_id", "c-1")]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InactiveTrigger(_)));
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn test_missing_required_field_creates_no_task() {
        let (gateway, queue, store) = gateway();
        gateway.register_trigger(onboarding_trigger()).await;

        let err = gateway
            .handle_trigger("client_onboarding", payload_with(&[("notes", "hello")]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingField(f) if f == "client_id"));
        assert!(queue.is_empty().await);
        assert!(store.is_empty().await);

        // Same payload with the field present succeeds and creates exactly one task
        let receipt = gateway
            .handle_trigger(
                "client_onboarding",
                payload_with(&[("notes", "hello"), ("client_id", "c-1")]),
            )
            .await
            .unwrap();
        assert_eq!(receipt.status, "success");
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn test_trigger_builds_task_with_gateway_defaults() {
        let (gateway, queue, store) = gateway();
        gateway.register_trigger(onboarding_trigger()).await;

        let receipt = gateway
            .handle_trigger("client_onboarding", payload_with(&[("client_id", "c-1")]))
            .await
            .unwrap();

        let task = queue.dequeue(Duration::from_millis(50)).await.unwrap();
        assert_eq!(task.id, receipt.task_id);
        assert_eq!(task.task_type, "project_analysis");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.source, TaskSource::ApiWebhook);
        assert_eq!(task.max_retries, 3);
        assert_eq!(task.timeout_secs, 300);
        assert!(store.has_status(task.id, TaskStatus::Pending).await);
    }

    #[tokio::test]
    async fn test_trigger_stats_updated_on_fire() {
        let (gateway, _, _) = gateway();
        gateway.register_trigger(onboarding_trigger()).await;

        gateway
            .handle_trigger("client_onboarding", payload_with(&[("client_id", "c-1")]))
            .await
            .unwrap();
        gateway
            .handle_trigger("client_onboarding", payload_with(&[("client_id", "c-2")]))
            .await
            .unwrap();

        let triggers = gateway.list_triggers().await;
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].trigger_count, 2);
        assert!(triggers[0].last_triggered.is_some());
    }

    #[tokio::test]
    async fn test_rejected_enqueue_leaves_no_record() {
        let queue = Arc::new(TaskQueue::new(QueueConfig {
            capacity: 1,
            backpressure: BackpressurePolicy::Reject,
        }));
        let store = Arc::new(StatusStore::new());
        let gateway = TriggerGateway::new(Arc::clone(&queue), Arc::clone(&store), 3, 300);

        gateway.submit(Task::new("filler")).await.unwrap();
        let err = gateway.submit(Task::new("overflow")).await.unwrap_err();
        assert!(matches!(err, EngineError::QueueFull(1)));
        assert_eq!(store.len().await, 1);
    }
}
