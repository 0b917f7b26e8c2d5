//! CloudWatch Backend
//!
//! Maps the backend trait onto ListMetrics, DescribeAlarmsForMetric and
//! PutMetricAlarm. PutMetricAlarm replaces an alarm with the same name, so
//! repeated creates for one metric converge on a single alarm.

use crate::alarm::{AlarmHandle, AlarmSpec, AlarmSummary, ComparisonOperator, Statistic};
use crate::backend::MonitoringBackend;
use crate::error::BackendError;
use crate::metric::{Dimension, ListMetricsRequest, MetricIdentity, MetricPage, MetricRecord, RawDimension};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_cloudwatch::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatch::types;
use aws_sdk_cloudwatch::Client;
use tracing::{debug, info};

const THROTTLING_CODES: &[&str] = &["Throttling", "ThrottlingException", "RequestLimitExceeded"];

/// CloudWatch-backed monitoring backend
#[derive(Clone)]
pub struct CloudWatchBackend {
    client: Client,
}

impl CloudWatchBackend {
    /// Build a client from the ambient AWS configuration chain
    pub async fn from_env(region: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;
        info!(
            "Created CloudWatch client (region: {})",
            config
                .region()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unset".to_string())
        );
        Self::new(Client::new(&config))
    }

    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MonitoringBackend for CloudWatchBackend {
    async fn list_metrics(&self, request: ListMetricsRequest) -> Result<MetricPage, BackendError> {
        let response = self
            .client
            .list_metrics()
            .set_next_token(request.next_token)
            .set_namespace(request.namespace)
            .send()
            .await
            .map_err(|e| classify("ListMetrics", e))?;

        let records = response
            .metrics()
            .iter()
            .map(|m| MetricRecord {
                namespace: m.namespace().map(str::to_string),
                name: m.metric_name().map(str::to_string),
                dimensions: m
                    .dimensions()
                    .iter()
                    .map(|d| RawDimension {
                        name: d.name().map(str::to_string),
                        value: d.value().map(str::to_string),
                    })
                    .collect(),
            })
            .collect();

        Ok(MetricPage {
            records,
            next_token: response.next_token().map(str::to_string),
        })
    }

    async fn describe_alarms_for(&self, metric: &MetricIdentity) -> Result<Vec<AlarmSummary>, BackendError> {
        let response = self
            .client
            .describe_alarms_for_metric()
            .namespace(metric.namespace())
            .metric_name(metric.name())
            .set_dimensions(Some(to_sdk_dimensions(metric.dimensions())))
            .send()
            .await
            .map_err(|e| classify("DescribeAlarmsForMetric", e))?;

        Ok(response
            .metric_alarms()
            .iter()
            .map(|a| AlarmSummary {
                name: a.alarm_name().unwrap_or_default().to_string(),
                arn: a.alarm_arn().map(str::to_string),
            })
            .collect())
    }

    async fn create_alarm(&self, spec: &AlarmSpec) -> Result<AlarmHandle, BackendError> {
        let period = to_sdk_i32("period", spec.period_seconds)?;
        let evaluation_periods = to_sdk_i32("evaluation_periods", spec.evaluation_periods)?;

        let mut request = self
            .client
            .put_metric_alarm()
            .alarm_name(&spec.name)
            .alarm_description(&spec.description)
            .namespace(spec.metric.namespace())
            .metric_name(spec.metric.name())
            .set_dimensions(Some(to_sdk_dimensions(spec.metric.dimensions())))
            .statistic(to_sdk_statistic(spec.statistic))
            .period(period)
            .evaluation_periods(evaluation_periods)
            .threshold(spec.threshold)
            .comparison_operator(to_sdk_comparison(spec.comparison))
            .actions_enabled(spec.actions_enabled);

        for target in &spec.alarm_actions {
            request = request.alarm_actions(target.address());
        }

        request.send().await.map_err(|e| classify("PutMetricAlarm", e))?;
        debug!("PutMetricAlarm accepted for {}", spec.name);

        Ok(AlarmHandle {
            name: spec.name.clone(),
            arn: None,
        })
    }
}

fn to_sdk_dimensions(dimensions: &[Dimension]) -> Vec<types::Dimension> {
    dimensions
        .iter()
        .map(|d| types::Dimension::builder().name(&d.name).value(&d.value).build())
        .collect()
}

fn to_sdk_i32(field: &str, value: u32) -> Result<i32, BackendError> {
    i32::try_from(value)
        .map_err(|_| BackendError::Rejected(format!("{} {} exceeds the API limit", field, value)))
}

fn to_sdk_statistic(statistic: Statistic) -> types::Statistic {
    match statistic {
        Statistic::Sum => types::Statistic::Sum,
    }
}

fn to_sdk_comparison(comparison: ComparisonOperator) -> types::ComparisonOperator {
    match comparison {
        ComparisonOperator::GreaterThanOrEqualToThreshold => {
            types::ComparisonOperator::GreaterThanOrEqualToThreshold
        }
    }
}

/// Map an SDK failure onto the backend error taxonomy
fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(_) => {
            let code = err.code().unwrap_or_default();
            let message = format!(
                "{} failed ({}): {}",
                operation,
                code,
                err.message().unwrap_or_default()
            );
            if THROTTLING_CODES.contains(&code) {
                BackendError::Throttled(message)
            } else {
                BackendError::Rejected(message)
            }
        }
        _ => BackendError::Unavailable(format!("{} failed: {}", operation, DisplayErrorContext(&err))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_threshold_maps_to_sdk_enums() {
        assert_eq!(to_sdk_statistic(Statistic::Sum), types::Statistic::Sum);
        assert_eq!(
            to_sdk_comparison(ComparisonOperator::GreaterThanOrEqualToThreshold),
            types::ComparisonOperator::GreaterThanOrEqualToThreshold
        );
    }

    #[test]
    fn test_dimensions_keep_order() {
        let dims = to_sdk_dimensions(&[Dimension::new("b", "2"), Dimension::new("a", "1")]);
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0].name(), Some("b"));
        assert_eq!(dims[1].value(), Some("1"));
    }

    #[test]
    fn test_oversized_period_rejected() {
        assert_eq!(to_sdk_i32("period", 300), Ok(300));
        assert!(matches!(
            to_sdk_i32("period", u32::MAX),
            Err(BackendError::Rejected(_))
        ));
    }
}
