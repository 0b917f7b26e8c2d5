//! Client-Side Rate Limiting using GCRA Algorithm
//!
//! Wraps any backend so that every call first waits for a permit from a
//! governor rate limiter. Keeps a reconciliation pass inside the backend's
//! API quota instead of relying on throttling errors.

use crate::alarm::{AlarmHandle, AlarmSpec, AlarmSummary};
use crate::backend::MonitoringBackend;
use crate::error::BackendError;
use crate::metric::{ListMetricsRequest, MetricIdentity, MetricPage};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::info;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Wrap the backend in a rate limiter
    pub enabled: bool,
    /// Requests allowed per second (replenishment rate)
    pub per_second: u32,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 10,
            burst_size: 5,
        }
    }
}

impl RateLimitConfig {
    fn quota(&self) -> Quota {
        let per_second = NonZeroU32::new(self.per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.burst_size).unwrap_or(NonZeroU32::MIN);
        Quota::per_second(per_second).allow_burst(burst)
    }
}

/// Backend decorator that paces calls through a shared limiter
pub struct RateLimitedBackend<B> {
    inner: B,
    limiter: DefaultDirectRateLimiter,
}

impl<B: MonitoringBackend> RateLimitedBackend<B> {
    pub fn new(inner: B, config: &RateLimitConfig) -> Self {
        info!(
            "Rate limiting backend calls: {}/s, burst {}",
            config.per_second, config.burst_size
        );
        Self {
            inner,
            limiter: RateLimiter::direct(config.quota()),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: MonitoringBackend> MonitoringBackend for RateLimitedBackend<B> {
    async fn list_metrics(&self, request: ListMetricsRequest) -> Result<MetricPage, BackendError> {
        self.limiter.until_ready().await;
        self.inner.list_metrics(request).await
    }

    async fn describe_alarms_for(&self, metric: &MetricIdentity) -> Result<Vec<AlarmSummary>, BackendError> {
        self.limiter.until_ready().await;
        self.inner.describe_alarms_for(metric).await
    }

    async fn create_alarm(&self, spec: &AlarmSpec) -> Result<AlarmHandle, BackendError> {
        self.limiter.until_ready().await;
        self.inner.create_alarm(spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use crate::metric::MetricRecord;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.per_second, 10);
        assert_eq!(config.burst_size, 5);
    }

    #[test]
    fn test_zero_values_clamped() {
        let config = RateLimitConfig {
            enabled: true,
            per_second: 0,
            burst_size: 0,
        };
        assert_eq!(config.quota().burst_size(), NonZeroU32::MIN);
    }

    #[tokio::test]
    async fn test_calls_pass_through() {
        let inner = InMemoryBackend::new(vec![MetricRecord::new("NS", "M", &[])]);
        let backend = RateLimitedBackend::new(inner, &RateLimitConfig::default());

        let page = backend.list_metrics(ListMetricsRequest::default()).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(backend.inner().list_calls(), 1);
    }

    #[tokio::test]
    async fn test_call_past_burst_waits_for_replenish() {
        let config = RateLimitConfig {
            enabled: true,
            per_second: 20,
            burst_size: 2,
        };
        let backend = RateLimitedBackend::new(InMemoryBackend::new(vec![]), &config);
        let started = std::time::Instant::now();

        for _ in 0..3 {
            backend.list_metrics(ListMetricsRequest::default()).await.unwrap();
        }

        // burst of 2 goes straight through, the third waits one 50ms cell
        assert!(started.elapsed() >= std::time::Duration::from_millis(40));
        assert_eq!(backend.inner().list_calls(), 3);
    }
}
