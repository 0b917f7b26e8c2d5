//! Monitoring Backend Client
//!
//! This crate provides the narrow view of a monitoring backend that the
//! coverage reconciler needs: a paginated metric catalog, alarm lookup by
//! exact metric identity, and alarm creation. It ships a CloudWatch adapter,
//! a rate-limiting decorator and an in-memory backend.

mod alarm;
mod backend;
mod cloudwatch;
mod error;
mod memory;
mod metric;
mod throttle;

pub use alarm::{
    AlarmHandle, AlarmSpec, AlarmSummary, ComparisonOperator, NotificationTarget, Statistic,
    DEFAULT_PERIOD_SECONDS,
};
pub use backend::MonitoringBackend;
pub use cloudwatch::CloudWatchBackend;
pub use error::BackendError;
pub use memory::{DuplicatePolicy, InMemoryBackend};
pub use metric::{
    Dimension, ListMetricsRequest, MalformedRecord, MetricIdentity, MetricPage, MetricRecord,
    RawDimension,
};
pub use throttle::{RateLimitConfig, RateLimitedBackend};
