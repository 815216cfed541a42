//! Engine assembly and lifecycle.
//!
//! One explicit `Engine` value owns the queue, registry, status store,
//! gateway, monitoring loop, and worker pool, and is passed by reference
//! to anything that needs them. `start` validates producer mappings
//! against the registry before any worker runs; `stop` flips the shutdown
//! signal and waits for in-flight work to finish.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::worker_pool::WorkerPool;
use crate::domain::models::{
    EngineConfig, HousekeepingConfig, MonitoringRule, Payload, Task, Trigger,
};
use crate::domain::ports::MetricSource;
use crate::domain::EngineResult;
use crate::services::gateway::{TriggerGateway, TriggerReceipt};
use crate::services::monitor::MonitoringEngine;
use crate::services::queue::TaskQueue;
use crate::services::registry::HandlerRegistry;
use crate::services::retry::RetryScheduler;
use crate::services::status_store::StatusStore;

/// Grace period for background loops to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Engine is stopped
    Stopped,
    /// Engine is starting up
    Starting,
    /// Engine is running and processing tasks
    Running,
    /// Engine is stopping
    Stopping,
}

/// Point-in-time engine statistics
#[derive(Debug, Clone)]
pub struct EngineStats {
    pub state: EngineState,
    pub worker_count: usize,
    pub queued_tasks: usize,
    pub stored_records: usize,
    pub tasks_processed: u64,
    pub tasks_failed: u64,
}

/// The background task processing engine.
pub struct Engine {
    config: EngineConfig,
    queue: Arc<TaskQueue>,
    store: Arc<StatusStore>,
    gateway: Arc<TriggerGateway>,
    monitor: MonitoringEngine,
    pool: WorkerPool,
    state: Arc<RwLock<EngineState>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl Engine {
    /// Assemble an engine from its configuration, a fully populated
    /// handler registry, and a metric source.
    ///
    /// The registry is frozen here: all handler registration must happen
    /// before construction.
    pub fn new(
        config: EngineConfig,
        registry: HandlerRegistry,
        metrics: Arc<dyn MetricSource>,
    ) -> Self {
        let queue = Arc::new(TaskQueue::new(config.queue.clone()));
        let store = Arc::new(StatusStore::new());
        let registry = Arc::new(registry);
        let gateway = Arc::new(TriggerGateway::new(
            Arc::clone(&queue),
            Arc::clone(&store),
            config.retry.max_retries,
            config.default_task_timeout_secs,
        ));
        let monitor = MonitoringEngine::new(&config.monitoring, metrics, Arc::clone(&gateway));
        let retry = Arc::new(RetryScheduler::new(
            config.retry.clone(),
            Arc::clone(&queue),
            Arc::clone(&store),
        ));
        let pool = WorkerPool::new(
            config.worker_count,
            Arc::clone(&queue),
            registry,
            Arc::clone(&store),
            retry,
        );

        Self {
            config,
            queue,
            store,
            gateway,
            monitor,
            pool,
            state: Arc::new(RwLock::new(EngineState::Stopped)),
            shutdown_tx: None,
            handles: Vec::new(),
        }
    }

    /// Register a trigger definition. Intended for startup wiring.
    pub async fn register_trigger(&self, trigger: Trigger) {
        self.gateway.register_trigger(trigger).await;
    }

    /// Register a monitoring rule. Intended for startup wiring.
    pub async fn register_rule(&self, rule: MonitoringRule) {
        self.monitor.register_rule(rule).await;
    }

    /// The trigger gateway, for transports feeding external invocations in.
    pub fn gateway(&self) -> Arc<TriggerGateway> {
        Arc::clone(&self.gateway)
    }

    /// The status store, for task status queries.
    pub fn status_store(&self) -> Arc<StatusStore> {
        Arc::clone(&self.store)
    }

    /// Handle an external trigger invocation.
    pub async fn handle_trigger(
        &self,
        trigger_name: &str,
        payload: Payload,
    ) -> EngineResult<TriggerReceipt> {
        self.gateway.handle_trigger(trigger_name, payload).await
    }

    /// Submit a task directly, bypassing trigger validation.
    pub async fn submit(&self, task: Task) -> EngineResult<Uuid> {
        self.gateway.submit(task).await
    }

    /// Latest known record for a task.
    pub async fn get_task(&self, id: Uuid) -> Option<Task> {
        self.store.get(id).await
    }

    /// Start workers, the monitoring loop, and the housekeeping loop.
    ///
    /// Fails fast when any trigger or rule maps to a task type with no
    /// registered handler.
    pub async fn start(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state != EngineState::Stopped {
                return Ok(());
            }
            *state = EngineState::Starting;
        }

        let mut mapped_types = self.gateway.mapped_task_types().await;
        mapped_types.extend(self.monitor.mapped_task_types().await);
        if let Err(e) = self
            .pool
            .registry()
            .validate_mappings(mapped_types.iter().map(String::as_str))
        {
            *self.state.write().await = EngineState::Stopped;
            return Err(e).context("Producer mappings reference unregistered task types");
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            worker_count = self.config.worker_count,
            queue_capacity = self.config.queue.capacity,
            "Starting engine"
        );

        self.handles = self.pool.spawn(shutdown_rx.clone());
        self.handles.push(self.monitor.start(shutdown_rx.clone()));
        self.handles.push(spawn_housekeeping_loop(
            Arc::clone(&self.store),
            self.config.housekeeping.clone(),
            shutdown_rx,
        ));
        self.shutdown_tx = Some(shutdown_tx);

        *self.state.write().await = EngineState::Running;
        info!("Engine started");
        Ok(())
    }

    /// Cooperative shutdown: signal every loop, let in-flight tasks
    /// finish, and join the background handles within a grace period.
    pub async fn stop(&mut self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if *state == EngineState::Stopped {
                return Ok(());
            }
            *state = EngineState::Stopping;
        }

        info!("Stopping engine");
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }

        let handles = std::mem::take(&mut self.handles);
        let joined = tokio::time::timeout(SHUTDOWN_GRACE, futures::future::join_all(handles)).await;
        match joined {
            Ok(results) => {
                for result in results {
                    if let Err(e) = result {
                        warn!(error = %e, "Background loop ended abnormally");
                    }
                }
            }
            Err(_) => warn!("Shutdown grace period elapsed with loops still running"),
        }

        *self.state.write().await = EngineState::Stopped;
        info!("Engine stopped");
        Ok(())
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> EngineState {
        *self.state.read().await
    }

    /// Point-in-time statistics.
    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            state: *self.state.read().await,
            worker_count: self.config.worker_count,
            queued_tasks: self.queue.len().await,
            stored_records: self.store.len().await,
            tasks_processed: self.pool.tasks_processed(),
            tasks_failed: self.pool.tasks_failed(),
        }
    }
}

/// Periodic eviction of expired terminal records from the status store.
fn spawn_housekeeping_loop(
    store: Arc<StatusStore>,
    config: HousekeepingConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let retention = Duration::from_secs(config.retention_hours * 3600);
        let mut ticker =
            tokio::time::interval(Duration::from_secs(config.purge_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = store.purge_expired(retention).await;
                    if removed > 0 {
                        info!(removed, "Purged expired task records");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ComparisonOp, TaskStatus};
    use crate::domain::ports::{MetricValue, TaskHandler};
    use crate::services::builtin_handlers::EchoHandler;
    use async_trait::async_trait;

    struct ZeroMetrics;

    #[async_trait]
    impl MetricSource for ZeroMetrics {
        async fn get_metric(&self, _target: &str) -> Result<MetricValue> {
            Ok(MetricValue::Scalar(0.0))
        }
    }

    fn echo_registry() -> HandlerRegistry {
        let mut registry = HandlerRegistry::new();
        registry.register("echo", Arc::new(EchoHandler) as Arc<dyn TaskHandler>);
        registry
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let mut engine = Engine::new(
            EngineConfig {
                worker_count: 2,
                ..Default::default()
            },
            echo_registry(),
            Arc::new(ZeroMetrics),
        );
        assert_eq!(engine.state().await, EngineState::Stopped);

        engine.start().await.unwrap();
        assert_eq!(engine.state().await, EngineState::Running);

        // Starting twice is a no-op
        engine.start().await.unwrap();

        engine.stop().await.unwrap();
        assert_eq!(engine.state().await, EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_start_rejects_unmapped_task_types() {
        let mut engine = Engine::new(
            EngineConfig::default(),
            echo_registry(),
            Arc::new(ZeroMetrics),
        );
        engine
            .register_trigger(Trigger::new("orphan", "no_such_handler"))
            .await;

        let err = engine.start().await.unwrap_err();
        assert!(format!("{err:#}").contains("no_such_handler"));
        assert_eq!(engine.state().await, EngineState::Stopped);
    }

    #[tokio::test]
    async fn test_start_rejects_unmapped_rule_types() {
        let mut engine = Engine::new(
            EngineConfig::default(),
            echo_registry(),
            Arc::new(ZeroMetrics),
        );
        engine
            .register_rule(MonitoringRule::new(
                "orphan",
                "x",
                ComparisonOp::Gt,
                1.0,
                "no_such_handler",
            ))
            .await;

        assert!(engine.start().await.is_err());
    }

    #[tokio::test]
    async fn test_trigger_flows_to_completion() {
        let mut engine = Engine::new(
            EngineConfig {
                worker_count: 2,
                ..Default::default()
            },
            echo_registry(),
            Arc::new(ZeroMetrics),
        );
        engine
            .register_trigger(Trigger::new("ping", "echo").with_required_field("message"))
            .await;
        engine.start().await.unwrap();

        let mut payload = Payload::new();
        payload.insert("message".to_string(), serde_json::json!("hello"));
        let receipt = engine.handle_trigger("ping", payload).await.unwrap();

        let mut terminal = None;
        for _ in 0..200 {
            if let Some(task) = engine.get_task(receipt.task_id).await {
                if task.is_terminal() {
                    terminal = Some(task);
                    break;
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        let task = terminal.expect("task never completed");
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(
            task.result.as_ref().unwrap()["message"],
            serde_json::json!("hello")
        );

        let stats = engine.stats().await;
        assert_eq!(stats.tasks_processed, 1);
        engine.stop().await.unwrap();
    }
}
