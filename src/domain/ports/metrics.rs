//! Metric source port.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// A metric observation returned by the metric source.
///
/// Aggregate values carry one reading per constituent (e.g. per-queue
/// depths under one target name). Rule evaluation over an aggregate is
/// "true if any constituent satisfies the comparison".
#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Scalar(f64),
    Aggregate(HashMap<String, f64>),
}

impl MetricValue {
    /// Iterate the constituent readings (a scalar has exactly one).
    pub fn readings(&self) -> Vec<f64> {
        match self {
            Self::Scalar(v) => vec![*v],
            Self::Aggregate(map) => map.values().copied().collect(),
        }
    }
}

/// Provider of current metric values, injected into the monitoring engine.
///
/// How values are produced (system counters, database aggregates, ...) is
/// entirely the embedder's concern.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch the current value of the named metric.
    async fn get_metric(&self, target: &str) -> Result<MetricValue>;
}

/// Metric source for deployments with no metrics wired up.
///
/// Every fetch fails, so monitoring rules are skipped each tick (their
/// `last_checked` still advances).
pub struct NullMetricSource;

#[async_trait]
impl MetricSource for NullMetricSource {
    async fn get_metric(&self, target: &str) -> Result<MetricValue> {
        Err(anyhow::anyhow!("no metric source configured for '{target}'"))
    }
}
