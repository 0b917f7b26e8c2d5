//! Monitoring Backend Trait

use crate::alarm::{AlarmHandle, AlarmSpec, AlarmSummary};
use crate::error::BackendError;
use crate::metric::{ListMetricsRequest, MetricIdentity, MetricPage};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations the reconciler consumes from a monitoring backend
#[async_trait]
pub trait MonitoringBackend: Send + Sync {
    /// Fetch one page of the metric catalog
    async fn list_metrics(&self, request: ListMetricsRequest) -> Result<MetricPage, BackendError>;

    /// Alarms bound to exactly this metric identity
    async fn describe_alarms_for(&self, metric: &MetricIdentity) -> Result<Vec<AlarmSummary>, BackendError>;

    /// Create an alarm. Backends may treat an existing name as an upsert or
    /// reject it with `BackendError::AlreadyExists`.
    async fn create_alarm(&self, spec: &AlarmSpec) -> Result<AlarmHandle, BackendError>;
}

#[async_trait]
impl<B: MonitoringBackend + ?Sized> MonitoringBackend for Arc<B> {
    async fn list_metrics(&self, request: ListMetricsRequest) -> Result<MetricPage, BackendError> {
        (**self).list_metrics(request).await
    }

    async fn describe_alarms_for(&self, metric: &MetricIdentity) -> Result<Vec<AlarmSummary>, BackendError> {
        (**self).describe_alarms_for(metric).await
    }

    async fn create_alarm(&self, spec: &AlarmSpec) -> Result<AlarmHandle, BackendError> {
        (**self).create_alarm(spec).await
    }
}
