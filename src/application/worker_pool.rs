//! Fixed-size worker pool.
//!
//! N workers share one queue. Each worker loop dequeues with a short
//! timeout (so it can observe the shutdown signal), gates on dependencies,
//! dispatches to the registered handler, and classifies the outcome:
//! success, transient failure (handed to the retry scheduler), or
//! permanent failure. Handler errors, panics, and soft timeouts are fully
//! contained; they never take down a worker.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::models::{Payload, Task, TaskStatus};
use crate::domain::ports::TaskHandler;
use crate::services::queue::TaskQueue;
use crate::services::registry::HandlerRegistry;
use crate::services::retry::RetryScheduler;
use crate::services::status_store::StatusStore;

/// How long a worker blocks on the queue before re-checking shutdown.
const DEQUEUE_TIMEOUT: Duration = Duration::from_millis(500);

/// Pause after re-enqueueing a dependency-stalled task, so a queue holding
/// only stalled tasks does not spin hot.
const DEFERRAL_PAUSE: Duration = Duration::from_millis(100);

/// Whether a task's dependencies allow it to run.
enum DependencyGate {
    /// All dependencies completed
    Ready,
    /// At least one dependency not yet terminal
    Unmet,
    /// A dependency failed permanently and can never be met
    Failed(Uuid),
}

/// Fixed set of concurrent workers consuming the task queue.
pub struct WorkerPool {
    worker_count: usize,
    queue: Arc<TaskQueue>,
    registry: Arc<HandlerRegistry>,
    store: Arc<StatusStore>,
    retry: Arc<RetryScheduler>,
    tasks_processed: Arc<AtomicU64>,
    tasks_failed: Arc<AtomicU64>,
}

impl WorkerPool {
    pub fn new(
        worker_count: usize,
        queue: Arc<TaskQueue>,
        registry: Arc<HandlerRegistry>,
        store: Arc<StatusStore>,
        retry: Arc<RetryScheduler>,
    ) -> Self {
        Self {
            worker_count,
            queue,
            registry,
            store,
            retry,
            tasks_processed: Arc::new(AtomicU64::new(0)),
            tasks_failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The handler registry this pool dispatches against.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Tasks completed successfully since startup.
    pub fn tasks_processed(&self) -> u64 {
        self.tasks_processed.load(Ordering::Relaxed)
    }

    /// Failure events observed since startup (each transient failure and
    /// each permanent failure counts once).
    pub fn tasks_failed(&self) -> u64 {
        self.tasks_failed.load(Ordering::Relaxed)
    }

    /// Spawn all workers. Each runs until the shutdown signal flips to
    /// true; in-flight tasks finish before the worker exits.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        (0..self.worker_count)
            .map(|worker_id| {
                let queue = Arc::clone(&self.queue);
                let registry = Arc::clone(&self.registry);
                let store = Arc::clone(&self.store);
                let retry = Arc::clone(&self.retry);
                let tasks_processed = Arc::clone(&self.tasks_processed);
                let tasks_failed = Arc::clone(&self.tasks_failed);
                let shutdown = shutdown.clone();

                tokio::spawn(async move {
                    worker_loop(
                        worker_id,
                        queue,
                        registry,
                        store,
                        retry,
                        tasks_processed,
                        tasks_failed,
                        shutdown,
                    )
                    .await;
                })
            })
            .collect()
    }
}

#[allow(clippy::too_many_arguments)]
async fn worker_loop(
    worker_id: usize,
    queue: Arc<TaskQueue>,
    registry: Arc<HandlerRegistry>,
    store: Arc<StatusStore>,
    retry: Arc<RetryScheduler>,
    tasks_processed: Arc<AtomicU64>,
    tasks_failed: Arc<AtomicU64>,
    shutdown: watch::Receiver<bool>,
) {
    debug!(worker_id, "Worker started");

    while !*shutdown.borrow() {
        let Some(task) = queue.dequeue(DEQUEUE_TIMEOUT).await else {
            continue;
        };

        process_task(
            worker_id,
            task,
            &queue,
            &registry,
            &store,
            &retry,
            &tasks_processed,
            &tasks_failed,
        )
        .await;
    }

    debug!(worker_id, "Worker stopped");
}

#[allow(clippy::too_many_arguments)]
async fn process_task(
    worker_id: usize,
    mut task: Task,
    queue: &Arc<TaskQueue>,
    registry: &Arc<HandlerRegistry>,
    store: &Arc<StatusStore>,
    retry: &Arc<RetryScheduler>,
    tasks_processed: &Arc<AtomicU64>,
    tasks_failed: &Arc<AtomicU64>,
) {
    // Dependency gate: stalled tasks go back at the same priority with the
    // retry budget untouched.
    match check_dependencies(store, &task).await {
        DependencyGate::Ready => {}
        DependencyGate::Unmet => {
            debug!(task_id = %task.id, "Dependencies unmet, re-enqueueing");
            if let Err(e) = queue.enqueue(task.clone()).await {
                error!(task_id = %task.id, error = %e, "Failed to re-enqueue deferred task");
                record_permanent_failure(store, task, format!("deferral re-enqueue failed: {e}"))
                    .await;
                tasks_failed.fetch_add(1, Ordering::Relaxed);
            }
            tokio::time::sleep(DEFERRAL_PAUSE).await;
            return;
        }
        DependencyGate::Failed(dep_id) => {
            warn!(task_id = %task.id, %dep_id, "Dependency failed permanently");
            record_permanent_failure(
                store,
                task,
                format!("dependency {dep_id} failed permanently"),
            )
            .await;
            tasks_failed.fetch_add(1, Ordering::Relaxed);
            return;
        }
    }

    if let Err(e) = task.transition_to(TaskStatus::Running) {
        error!(task_id = %task.id, error = %e, "Dequeued task in unexpected state");
        return;
    }
    store.put(task.clone()).await;

    let Some(handler) = registry.get(&task.task_type) else {
        // Retrying cannot help an unregistered type.
        warn!(task_id = %task.id, task_type = %task.task_type, "Unknown task type");
        let task_type = task.task_type.clone();
        record_permanent_failure(store, task, format!("unknown task type: {task_type}")).await;
        tasks_failed.fetch_add(1, Ordering::Relaxed);
        return;
    };

    debug!(worker_id, task_id = %task.id, task_type = %task.task_type, "Executing task");
    match run_handler(handler, &task).await {
        Ok(result) => {
            match task.complete(result) {
                Ok(()) => {
                    tasks_processed.fetch_add(1, Ordering::Relaxed);
                    info!(worker_id, task_id = %task.id, "Task completed");
                }
                Err(e) => error!(task_id = %task.id, error = %e, "Failed to record completion"),
            }
            store.put(task).await;
        }
        Err(cause) => {
            warn!(worker_id, task_id = %task.id, %cause, "Task failed");
            tasks_failed.fetch_add(1, Ordering::Relaxed);
            retry.handle_transient_failure(task, cause).await;
        }
    }
}

/// Invoke the handler inside its own tokio task, bounded by the task's
/// soft timeout.
///
/// The spawn isolates handler panics from the worker; the timeout is
/// cooperative — a handler that never yields cannot be preempted, only
/// abandoned at its next await point.
async fn run_handler(handler: Arc<dyn TaskHandler>, task: &Task) -> Result<Payload, String> {
    let payload = task.payload.clone();
    let budget = task.timeout();
    let mut join = tokio::spawn(async move { handler.handle(&payload).await });

    match tokio::time::timeout(budget, &mut join).await {
        Err(_elapsed) => {
            // Abandon the handler at its next await point; a handler that
            // never yields keeps its tokio task until it returns.
            join.abort();
            Err(format!(
                "soft timeout: execution exceeded {}s budget",
                budget.as_secs()
            ))
        }
        Ok(Err(join_err)) if join_err.is_panic() => Err("handler panicked".to_string()),
        Ok(Err(join_err)) => Err(format!("handler task failed: {join_err}")),
        Ok(Ok(Ok(result))) => Ok(result),
        Ok(Ok(Err(e))) => Err(format!("{e:#}")),
    }
}

async fn check_dependencies(store: &Arc<StatusStore>, task: &Task) -> DependencyGate {
    for dep_id in &task.dependencies {
        match store.get(*dep_id).await {
            Some(dep) if dep.status == TaskStatus::Completed => {}
            Some(dep) if dep.status == TaskStatus::FailedPermanent => {
                return DependencyGate::Failed(*dep_id);
            }
            // Not yet terminal, or not yet submitted: treat as unmet.
            _ => return DependencyGate::Unmet,
        }
    }
    DependencyGate::Ready
}

async fn record_permanent_failure(store: &Arc<StatusStore>, mut task: Task, cause: String) {
    if let Err(e) = task.fail_permanently(cause) {
        error!(task_id = %task.id, error = %e, "Failed to record permanent failure");
        return;
    }
    store.put(task).await;
}
