//! Alarm Definitions

use crate::metric::MetricIdentity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default evaluation window for provisioned alarms (seconds)
pub const DEFAULT_PERIOD_SECONDS: u32 = 300;

/// Aggregation applied to datapoints within a period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Sum,
}

/// Comparison between the aggregated value and the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    GreaterThanOrEqualToThreshold,
}

/// Reference to a notification channel owned outside the reconciler
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationTarget(String);

impl NotificationTarget {
    /// Wrap a channel address (e.g. a topic ARN)
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn address(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Alarm to be created for one uncovered metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlarmSpec {
    /// Deterministic alarm name
    pub name: String,
    pub description: String,
    pub metric: MetricIdentity,
    pub statistic: Statistic,
    pub period_seconds: u32,
    pub evaluation_periods: u32,
    pub threshold: f64,
    pub comparison: ComparisonOperator,
    pub actions_enabled: bool,
    /// Notified when the alarm enters the ALARM state
    pub alarm_actions: Vec<NotificationTarget>,
}

impl AlarmSpec {
    /// Threshold-on-sum alarm: fires when the metric sums to at least 1
    /// within a single evaluation period.
    pub fn sum_threshold(metric: MetricIdentity, target: NotificationTarget, period_seconds: u32) -> Self {
        Self {
            name: Self::name_for(&metric),
            description: format!("Alarm for {}/{}", metric.namespace(), metric.name()),
            metric,
            statistic: Statistic::Sum,
            period_seconds,
            evaluation_periods: 1,
            threshold: 1.0,
            comparison: ComparisonOperator::GreaterThanOrEqualToThreshold,
            actions_enabled: true,
            alarm_actions: vec![target],
        }
    }

    /// Alarm name derived from namespace and metric name
    pub fn name_for(metric: &MetricIdentity) -> String {
        format!("{}-{}-Alarm", metric.namespace(), metric.name())
    }
}

/// Existing alarm bound to a metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmSummary {
    pub name: String,
    pub arn: Option<String>,
}

/// Result of a successful alarm creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmHandle {
    pub name: String,
    pub arn: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::Dimension;

    #[test]
    fn test_sum_threshold_shape() {
        let metric = MetricIdentity::new("NS1", "M2", vec![Dimension::new("Queue", "jobs")]).unwrap();
        let target = NotificationTarget::new("arn:aws:sns:us-east-1:000000000000:alerts");
        let spec = AlarmSpec::sum_threshold(metric.clone(), target.clone(), DEFAULT_PERIOD_SECONDS);

        assert_eq!(spec.name, "NS1-M2-Alarm");
        assert_eq!(spec.description, "Alarm for NS1/M2");
        assert_eq!(spec.metric, metric);
        assert_eq!(spec.statistic, Statistic::Sum);
        assert_eq!(spec.evaluation_periods, 1);
        assert_eq!(spec.threshold, 1.0);
        assert_eq!(spec.comparison, ComparisonOperator::GreaterThanOrEqualToThreshold);
        assert!(spec.actions_enabled);
        assert_eq!(spec.alarm_actions, vec![target]);
    }

    #[test]
    fn test_name_ignores_dimensions() {
        let a = MetricIdentity::new("NS", "M", vec![Dimension::new("k", "a")]).unwrap();
        let b = MetricIdentity::new("NS", "M", vec![]).unwrap();
        assert_eq!(AlarmSpec::name_for(&a), AlarmSpec::name_for(&b));
    }
}
