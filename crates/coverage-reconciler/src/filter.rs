//! Coverage Filter

use crate::deadline::with_deadline;
use crate::summary::MetricFailure;
use futures::stream::{self, StreamExt};
use monitoring_client::{MetricIdentity, MonitoringBackend};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Metrics split by alarm coverage
#[derive(Debug, Default)]
pub struct FilterOutcome {
    /// Metrics with no alarm bound to them, in input order
    pub uncovered: Vec<MetricIdentity>,
    /// Number of metrics with at least one alarm
    pub covered: usize,
    /// Lookups that failed; these metrics are in neither set
    pub failures: Vec<MetricFailure>,
    /// Names of the alarms found on covered metrics
    pub alarm_names: HashSet<String>,
}

enum Coverage {
    Covered(Vec<String>),
    Uncovered(MetricIdentity),
}

/// Finds metrics that have no alarm bound to them
pub struct CoverageFilter<'a, B> {
    backend: &'a B,
    call_timeout: Duration,
    concurrency: usize,
}

impl<'a, B: MonitoringBackend> CoverageFilter<'a, B> {
    pub fn new(backend: &'a B, call_timeout: Duration, concurrency: usize) -> Self {
        Self {
            backend,
            call_timeout,
            concurrency: concurrency.max(1),
        }
    }

    /// Keep the metrics with zero matching alarms.
    ///
    /// A metric whose lookup fails is left out: unknown coverage is never
    /// treated as missing coverage.
    pub async fn filter_uncovered(&self, metrics: Vec<MetricIdentity>) -> FilterOutcome {
        let total = metrics.len();
        let results: Vec<_> = stream::iter(metrics)
            .map(|metric| self.check(metric))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut outcome = FilterOutcome::default();
        for result in results {
            match result {
                Ok(Coverage::Covered(names)) => {
                    outcome.covered += 1;
                    outcome.alarm_names.extend(names);
                }
                Ok(Coverage::Uncovered(metric)) => outcome.uncovered.push(metric),
                Err(failure) => outcome.failures.push(failure),
            }
        }

        info!(
            "Checked {} metrics: {} uncovered, {} covered, {} lookups failed",
            total,
            outcome.uncovered.len(),
            outcome.covered,
            outcome.failures.len()
        );
        outcome
    }

    async fn check(&self, metric: MetricIdentity) -> Result<Coverage, MetricFailure> {
        match with_deadline(self.call_timeout, self.backend.describe_alarms_for(&metric)).await {
            Ok(alarms) if alarms.is_empty() => {
                debug!("No alarm bound to {}", metric);
                Ok(Coverage::Uncovered(metric))
            }
            Ok(alarms) => {
                debug!("{} covered by {} alarm(s)", metric, alarms.len());
                Ok(Coverage::Covered(alarms.into_iter().map(|a| a.name).collect()))
            }
            Err(e) => {
                warn!("Alarm lookup failed for {}, skipping: {}", metric, e);
                Err(MetricFailure::query(metric, e))
            }
        }
    }
}
