//! Periodic rule-based monitoring.
//!
//! On a fixed tick, every active rule fetches its target metric from the
//! injected source and compares it against the rule threshold. A satisfied
//! condition produces a task through the trigger gateway's submit path,
//! one per rule per tick for as long as the condition holds.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::{MonitoringConfig, MonitoringRule, Payload, Task, TaskPriority, TaskSource};
use crate::domain::ports::MetricSource;
use crate::services::gateway::TriggerGateway;

/// Evaluates monitoring rules against live metrics on a fixed interval.
#[derive(Clone)]
pub struct MonitoringEngine {
    rules: Arc<RwLock<Vec<MonitoringRule>>>,
    metrics: Arc<dyn MetricSource>,
    gateway: Arc<TriggerGateway>,
    tick_interval: Duration,
}

impl MonitoringEngine {
    pub fn new(
        config: &MonitoringConfig,
        metrics: Arc<dyn MetricSource>,
        gateway: Arc<TriggerGateway>,
    ) -> Self {
        Self {
            rules: Arc::new(RwLock::new(Vec::new())),
            metrics,
            gateway,
            tick_interval: Duration::from_secs(config.tick_interval_secs),
        }
    }

    /// Register a monitoring rule.
    pub async fn register_rule(&self, rule: MonitoringRule) {
        self.rules.write().await.push(rule);
    }

    /// Snapshot of all registered rules.
    pub async fn list_rules(&self) -> Vec<MonitoringRule> {
        self.rules.read().await.clone()
    }

    /// Task types referenced by registered rules, for startup validation
    /// against the handler registry.
    pub async fn mapped_task_types(&self) -> Vec<String> {
        self.rules
            .read()
            .await
            .iter()
            .map(|r| r.action_task_type.clone())
            .collect()
    }

    /// Run one evaluation pass over all active rules.
    ///
    /// `last_checked` is updated for every evaluated rule whether or not
    /// it fired; `trigger_count` only on a fire. A metric fetch failure
    /// skips that rule for the pass without stopping the others.
    pub async fn evaluate_rules(&self) {
        let snapshot = self.rules.read().await.clone();
        let now = Utc::now();
        let mut fired_ids: Vec<Uuid> = Vec::new();
        let mut checked_ids: Vec<Uuid> = Vec::new();

        for rule in snapshot.iter().filter(|r| r.is_active) {
            checked_ids.push(rule.id);

            let value = match self.metrics.get_metric(&rule.target).await {
                Ok(value) => value,
                Err(e) => {
                    warn!(rule = %rule.name, target = %rule.target, error = %e, "Metric fetch failed, skipping rule this tick");
                    continue;
                }
            };

            // Aggregate policy: the rule fires if any constituent satisfies
            // the comparison.
            let observed = value
                .readings()
                .into_iter()
                .find(|v| rule.comparison.evaluate(*v, rule.threshold));

            let Some(observed) = observed else {
                debug!(rule = %rule.name, "Condition not met");
                continue;
            };

            let mut payload = Payload::new();
            payload.insert("rule".to_string(), serde_json::json!(rule.name));
            payload.insert("target".to_string(), serde_json::json!(rule.target));
            payload.insert(
                "comparison".to_string(),
                serde_json::json!(rule.comparison.as_str()),
            );
            payload.insert("threshold".to_string(), serde_json::json!(rule.threshold));
            payload.insert("observed".to_string(), serde_json::json!(observed));

            let task = Task::new(rule.action_task_type.clone())
                .with_source(TaskSource::PatternDetection)
                .with_priority(TaskPriority::High)
                .with_payload(payload);

            match self.gateway.submit(task).await {
                Ok(task_id) => {
                    info!(rule = %rule.name, %task_id, observed, "Monitoring rule fired");
                    fired_ids.push(rule.id);
                }
                Err(e) => {
                    warn!(rule = %rule.name, error = %e, "Failed to submit rule-produced task");
                }
            }
        }

        let mut rules = self.rules.write().await;
        for rule in rules.iter_mut() {
            if checked_ids.contains(&rule.id) {
                rule.last_checked = Some(now);
            }
            if fired_ids.contains(&rule.id) {
                rule.trigger_count += 1;
            }
        }
    }

    /// Start the tick loop. Stops when the shutdown signal flips to true.
    pub fn start(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(engine.tick_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick fires immediately; skip it so rules are first
            // evaluated one full interval after startup.
            ticker.tick().await;

            info!(interval_secs = engine.tick_interval.as_secs(), "Monitoring loop started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        engine.evaluate_rules().await;
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Monitoring loop stopped");
        })
    }
}
