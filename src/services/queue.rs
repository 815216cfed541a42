//! Bounded, thread-safe task queue.
//!
//! Wraps the ordering core in async coordination: producers enqueue under
//! a short-lived lock, consumers block on dequeue up to a timeout. The
//! queue bound and the full-queue behavior are configurable.

use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::domain::models::{BackpressurePolicy, PriorityQueue, QueueConfig, Task};
use crate::domain::{EngineError, EngineResult};

/// Thread-safe priority queue shared by all producers and workers.
///
/// Ordering contract: strictly priority-first; FIFO within a priority band
/// (stable by enqueue order). A task enqueued once is delivered to exactly
/// one consumer. The internal lock is never held across an await point.
pub struct TaskQueue {
    inner: Mutex<PriorityQueue<Task>>,
    capacity: usize,
    backpressure: BackpressurePolicy,
    /// Signals waiting consumers that an item arrived.
    nonempty: Notify,
    /// Signals blocked producers that a slot freed up.
    vacancy: Notify,
}

impl TaskQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(PriorityQueue::with_capacity(config.capacity.min(1024))),
            capacity: config.capacity,
            backpressure: config.backpressure,
            nonempty: Notify::new(),
            vacancy: Notify::new(),
        }
    }

    /// Number of tasks currently queued.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }

    /// Insert a task, ordered by priority then enqueue time.
    ///
    /// When the queue is at capacity the behavior follows the configured
    /// backpressure policy: `Reject` returns [`EngineError::QueueFull`],
    /// `Block` waits for a consumer to free a slot.
    pub async fn enqueue(&self, mut task: Task) -> EngineResult<()> {
        loop {
            let vacancy = self.vacancy.notified();
            task = {
                let mut queue = self.inner.lock().await;
                if queue.len() < self.capacity {
                    let priority = task.priority as u8;
                    queue.push(task, priority);
                    self.nonempty.notify_one();
                    return Ok(());
                }
                if self.backpressure == BackpressurePolicy::Reject {
                    return Err(EngineError::QueueFull(self.capacity));
                }
                task
            };
            vacancy.await;
        }
    }

    /// Remove and return the highest-priority task, waiting up to `timeout`
    /// when the queue is empty. Returns `None` on timeout.
    pub async fn dequeue(&self, timeout: Duration) -> Option<Task> {
        let deadline = Instant::now() + timeout;
        loop {
            let nonempty = self.nonempty.notified();
            {
                let mut queue = self.inner.lock().await;
                if let Some(task) = queue.pop() {
                    self.vacancy.notify_one();
                    return Some(task);
                }
            }
            if tokio::time::timeout_at(deadline, nonempty).await.is_err() {
                // Deadline hit while waiting; take anything that raced in
                let mut queue = self.inner.lock().await;
                let task = queue.pop();
                if task.is_some() {
                    self.vacancy.notify_one();
                }
                return task;
            }
        }
    }
}
