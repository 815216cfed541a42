//! In-memory task status store.
//!
//! Holds the latest record for every task the engine has accepted. Workers
//! and the retry scheduler overwrite records as tasks move through the
//! state machine; a periodic housekeeping pass evicts terminal records
//! older than the retention window so memory stays bounded under load.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{Task, TaskSource, TaskStatus};

/// Filters for listing task records.
#[derive(Debug, Clone, Default)]
pub struct TaskFilters {
    pub status: Option<TaskStatus>,
    pub task_type: Option<String>,
    pub source: Option<TaskSource>,
}

impl TaskFilters {
    fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(ref task_type) = self.task_type {
            if task.task_type != *task_type {
                return false;
            }
        }
        if let Some(source) = self.source {
            if task.source != source {
                return false;
            }
        }
        true
    }
}

/// Thread-safe map of task id to its latest record.
#[derive(Default)]
pub struct StatusStore {
    records: RwLock<HashMap<Uuid, Task>>,
}

impl StatusStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Latest known record for a task.
    pub async fn get(&self, id: Uuid) -> Option<Task> {
        self.records.read().await.get(&id).cloned()
    }

    /// Insert or overwrite a task record.
    pub async fn put(&self, task: Task) {
        self.records.write().await.insert(task.id, task);
    }

    /// Remove a record outright. Used when an accepted task could not be
    /// enqueued after all, so no trace of it should remain.
    pub async fn remove(&self, id: Uuid) -> Option<Task> {
        self.records.write().await.remove(&id)
    }

    /// Records matching the filters, in no particular order.
    pub async fn list(&self, filters: &TaskFilters) -> Vec<Task> {
        self.records
            .read()
            .await
            .values()
            .filter(|task| filters.matches(task))
            .cloned()
            .collect()
    }

    /// Number of records matching the filters.
    pub async fn count(&self, filters: &TaskFilters) -> usize {
        self.records
            .read()
            .await
            .values()
            .filter(|task| filters.matches(task))
            .count()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Whether the given status is the stored status for the task.
    pub async fn has_status(&self, id: Uuid, status: TaskStatus) -> bool {
        self.records
            .read()
            .await
            .get(&id)
            .is_some_and(|task| task.status == status)
    }

    /// Evict terminal records whose completion is older than `retention`.
    ///
    /// Returns the number of records removed. Non-terminal records are
    /// never evicted regardless of age.
    pub async fn purge_expired(&self, retention: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(retention).unwrap_or_else(|_| chrono::Duration::zero());
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, task| {
            if !task.status.is_terminal() {
                return true;
            }
            match task.completed_at {
                Some(completed_at) => completed_at >= cutoff,
                None => true,
            }
        });
        before - records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskPriority;

    fn terminal_task(completed_hours_ago: i64) -> Task {
        let mut task = Task::new("report");
        task.status = TaskStatus::Completed;
        task.completed_at = Some(Utc::now() - chrono::Duration::hours(completed_hours_ago));
        task
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = StatusStore::new();
        let task = Task::new("project_analysis");
        let id = task.id;

        store.put(task).await;
        let fetched = store.get(id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert!(store.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = StatusStore::new();
        let mut task = Task::new("project_analysis");
        let id = task.id;
        store.put(task.clone()).await;

        task.transition_to(TaskStatus::Running).unwrap();
        store.put(task).await;

        assert!(store.has_status(id, TaskStatus::Running).await);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_list_with_filters() {
        let store = StatusStore::new();
        store
            .put(Task::new("billing_summary").with_priority(TaskPriority::High))
            .await;
        store.put(Task::new("compliance_check")).await;

        let all = store.list(&TaskFilters::default()).await;
        assert_eq!(all.len(), 2);

        let billing = store
            .list(&TaskFilters {
                task_type: Some("billing_summary".to_string()),
                ..Default::default()
            })
            .await;
        assert_eq!(billing.len(), 1);
        assert_eq!(billing[0].task_type, "billing_summary");

        let pending = store
            .count(&TaskFilters {
                status: Some(TaskStatus::Pending),
                ..Default::default()
            })
            .await;
        assert_eq!(pending, 2);
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired_terminal_records() {
        let store = StatusStore::new();
        let old = terminal_task(48);
        let fresh = terminal_task(1);
        let pending = Task::new("still_pending");
        let old_id = old.id;
        let fresh_id = fresh.id;
        let pending_id = pending.id;

        store.put(old).await;
        store.put(fresh).await;
        store.put(pending).await;

        let removed = store.purge_expired(Duration::from_secs(24 * 3600)).await;
        assert_eq!(removed, 1);
        assert!(store.get(old_id).await.is_none());
        assert!(store.get(fresh_id).await.is_some());
        assert!(store.get(pending_id).await.is_some());
    }

    #[tokio::test]
    async fn test_purge_keeps_old_non_terminal_records() {
        let store = StatusStore::new();
        let mut stalled = Task::new("stalled");
        stalled.created_at = Utc::now() - chrono::Duration::days(7);
        let id = stalled.id;
        store.put(stalled).await;

        let removed = store.purge_expired(Duration::from_secs(3600)).await;
        assert_eq!(removed, 0);
        assert!(store.get(id).await.is_some());
    }
}
