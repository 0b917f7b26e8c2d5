//! Run Summary and Failure Records

use crate::reconciler::RunPhase;
use chrono::{DateTime, Utc};
use monitoring_client::{BackendError, MetricIdentity};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Pipeline stage a per-metric failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Looking up existing alarms
    Query,
    /// Creating the alarm
    Create,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Query => f.write_str("alarm lookup"),
            Stage::Create => f.write_str("alarm creation"),
        }
    }
}

/// Failure contained to a single metric
#[derive(Debug, Clone, Error, Serialize)]
#[error("{stage} failed for {metric}: {error}")]
pub struct MetricFailure {
    pub metric: MetricIdentity,
    pub stage: Stage,
    pub error: BackendError,
}

impl MetricFailure {
    pub fn query(metric: MetricIdentity, error: BackendError) -> Self {
        Self {
            metric,
            stage: Stage::Query,
            error,
        }
    }

    pub fn create(metric: MetricIdentity, error: BackendError) -> Self {
        Self {
            metric,
            stage: Stage::Create,
            error,
        }
    }
}

/// When a completed run should be reported as failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitPolicy {
    /// Every completed run succeeds
    #[default]
    AlwaysSucceed,
    /// Fail when listing failed, or uncovered metrics remain and not a
    /// single alarm was created (or planned, in a dry run)
    RequireProgress,
}

/// Totals for one reconciliation run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub phase: RunPhase,
    /// Valid metrics listed from the catalog
    pub discovered: usize,
    /// Catalog records dropped for missing identity fields
    pub malformed: usize,
    /// Metrics with at least one alarm
    pub covered: usize,
    /// Metrics with no alarm
    pub uncovered: usize,
    /// Alarms created
    pub created: usize,
    /// Alarms planned but not submitted (dry run)
    pub planned: usize,
    /// Alarm creations that failed
    pub failed: usize,
    /// Alarm lookups that failed
    pub query_failures: usize,
    /// Why listing yielded nothing, if it failed
    pub listing_error: Option<BackendError>,
    pub failures: Vec<MetricFailure>,
}

impl RunSummary {
    /// Whether the run passes `policy`
    pub fn meets(&self, policy: ExitPolicy) -> bool {
        match policy {
            ExitPolicy::AlwaysSucceed => true,
            ExitPolicy::RequireProgress => {
                self.listing_error.is_none()
                    && (self.uncovered == 0 || self.created + self.planned > 0)
            }
        }
    }

    /// Log totals and every contained failure
    pub fn log(&self) {
        for failure in &self.failures {
            warn!("Run {}: {}", self.run_id, failure);
        }
        if let Some(err) = &self.listing_error {
            warn!("Run {}: metric listing failed: {}", self.run_id, err);
        }
        info!(
            "Run {} complete in {}ms: discovered={} uncovered={} created={} failed={} (malformed={}, query_failures={}, planned={})",
            self.run_id,
            (self.finished_at - self.started_at).num_milliseconds(),
            self.discovered,
            self.uncovered,
            self.created,
            self.failed,
            self.malformed,
            self.query_failures,
            self.planned,
        );
    }

    /// Publish totals through the metrics facade
    pub fn record_metrics(&self) {
        metrics::counter!("alarm_reconciler_metrics_discovered_total").increment(self.discovered as u64);
        metrics::counter!("alarm_reconciler_metrics_uncovered_total").increment(self.uncovered as u64);
        metrics::counter!("alarm_reconciler_alarms_created_total").increment(self.created as u64);
        metrics::counter!("alarm_reconciler_alarms_failed_total").increment(self.failed as u64);
        metrics::counter!("alarm_reconciler_query_failures_total").increment(self.query_failures as u64);
        if self.listing_error.is_some() {
            metrics::counter!("alarm_reconciler_listing_failures_total").increment(1);
        }
    }
}
