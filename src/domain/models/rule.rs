//! Monitoring rule definitions.
//!
//! A monitoring rule is a periodically evaluated condition over a metric.
//! When the condition holds, the rule produces a task of its mapped type.
//! Same lifecycle as triggers: defined at startup, stats-only mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comparison operator applied between a metric value and the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            "==" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            _ => None,
        }
    }

    /// Apply the operator to a single scalar value.
    ///
    /// Equality operators compare exact f64 values; that is the wire
    /// contract for `==` / `!=` rules.
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => value > threshold,
            Self::Lt => value < threshold,
            Self::Eq => value == threshold,
            Self::Ne => value != threshold,
        }
    }
}

/// A periodically evaluated condition over a metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringRule {
    pub id: Uuid,
    pub name: String,
    /// Metric identifier resolved through the metric source
    pub target: String,
    pub threshold: f64,
    pub comparison: ComparisonOp,
    /// Task type produced when the condition holds
    pub action_task_type: String,
    pub is_active: bool,
    /// Last time this rule was evaluated (updated every tick, hit or miss)
    pub last_checked: Option<DateTime<Utc>>,
    pub trigger_count: u64,
    pub created_at: DateTime<Utc>,
}

impl MonitoringRule {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<String>,
        comparison: ComparisonOp,
        threshold: f64,
        action_task_type: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            target: target.into(),
            threshold,
            comparison,
            action_task_type: action_task_type.into(),
            is_active: true,
            last_checked: None,
            trigger_count: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Record an evaluation pass, firing or not.
    pub fn record_checked(&mut self, fired: bool) {
        self.last_checked = Some(Utc::now());
        if fired {
            self.trigger_count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comparison_evaluate() {
        assert!(ComparisonOp::Gt.evaluate(0.9, 0.8));
        assert!(!ComparisonOp::Gt.evaluate(0.5, 0.8));
        assert!(ComparisonOp::Lt.evaluate(0.5, 0.8));
        assert!(ComparisonOp::Eq.evaluate(1.0, 1.0));
        assert!(ComparisonOp::Ne.evaluate(1.0, 2.0));
    }

    #[test]
    fn test_comparison_round_trip() {
        for op in [
            ComparisonOp::Gt,
            ComparisonOp::Lt,
            ComparisonOp::Eq,
            ComparisonOp::Ne,
        ] {
            assert_eq!(ComparisonOp::from_str(op.as_str()), Some(op));
        }
        assert_eq!(ComparisonOp::from_str(">="), None);
    }

    #[test]
    fn test_record_checked() {
        let mut rule = MonitoringRule::new(
            "cpu_pressure",
            "system.cpu_usage",
            ComparisonOp::Gt,
            0.8,
            "capacity_review",
        );

        rule.record_checked(false);
        assert_eq!(rule.trigger_count, 0);
        assert!(rule.last_checked.is_some());

        rule.record_checked(true);
        assert_eq!(rule.trigger_count, 1);
    }
}
