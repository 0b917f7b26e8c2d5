//! Reconciliation Run

use crate::config::ReconcilerConfig;
use crate::filter::CoverageFilter;
use crate::lister::MetricLister;
use crate::provisioner::AlarmProvisioner;
use crate::summary::RunSummary;
use chrono::Utc;
use monitoring_client::{MonitoringBackend, NotificationTarget};
use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Phase of a reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Listing,
    Filtering,
    Provisioning,
    Done,
}

impl RunPhase {
    /// Next phase; `Done` is terminal
    pub fn next(self) -> Self {
        match self {
            RunPhase::Idle => RunPhase::Listing,
            RunPhase::Listing => RunPhase::Filtering,
            RunPhase::Filtering => RunPhase::Provisioning,
            RunPhase::Provisioning | RunPhase::Done => RunPhase::Done,
        }
    }
}

/// Lists, filters and provisions in one pass
pub struct Reconciler<B> {
    backend: B,
    target: NotificationTarget,
    config: ReconcilerConfig,
}

impl<B: MonitoringBackend> Reconciler<B> {
    /// Create a reconciler. `target` is only referenced by created alarms;
    /// it is never created or checked.
    pub fn new(backend: B, target: NotificationTarget, config: ReconcilerConfig) -> Self {
        info!(
            "Creating reconciler (notification target: {}, concurrency: {}, dry run: {})",
            target,
            config.concurrency(),
            config.dry_run
        );
        Self {
            backend,
            target,
            config,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn lister(&self) -> MetricLister<'_, B> {
        MetricLister::new(
            &self.backend,
            self.config.namespace.clone(),
            self.config.call_timeout(),
        )
    }

    pub fn filter(&self) -> CoverageFilter<'_, B> {
        CoverageFilter::new(&self.backend, self.config.call_timeout(), self.config.concurrency())
    }

    pub fn provisioner(&self) -> AlarmProvisioner<'_, B> {
        AlarmProvisioner::new(
            &self.backend,
            &self.target,
            self.config.alarm_period_seconds,
            self.config.call_timeout(),
            self.config.concurrency(),
        )
        .dry_run(self.config.dry_run)
    }

    /// Run one reconciliation pass.
    ///
    /// Always reaches `RunPhase::Done`; listing and per-metric failures are
    /// reported in the summary rather than returned.
    pub async fn run(&self) -> RunSummary {
        let run_id = Uuid::new_v4();
        let summary = self
            .run_phases(run_id)
            .instrument(info_span!("reconcile", %run_id))
            .await;
        summary.record_metrics();
        summary.log();
        summary
    }

    async fn run_phases(&self, run_id: Uuid) -> RunSummary {
        let started_at = Utc::now();
        let mut phase = RunPhase::Idle;

        phase = advance(phase);
        let inventory = self.lister().list_all_metrics().await;
        let discovered = inventory.metrics.len();

        phase = advance(phase);
        let coverage = self.filter().filter_uncovered(inventory.metrics).await;
        let uncovered = coverage.uncovered.len();

        phase = advance(phase);
        let provisioned = self
            .provisioner()
            .taken_names(coverage.alarm_names)
            .provision(coverage.uncovered)
            .await;

        phase = advance(phase);

        let mut failures = coverage.failures;
        let query_failures = failures.len();
        let failed = provisioned.failures.len();
        failures.extend(provisioned.failures);

        RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            phase,
            discovered,
            malformed: inventory.malformed,
            covered: coverage.covered,
            uncovered,
            created: provisioned.created.len(),
            planned: provisioned.planned.len(),
            failed,
            query_failures,
            listing_error: inventory.error,
            failures,
        }
    }
}

fn advance(phase: RunPhase) -> RunPhase {
    let next = phase.next();
    debug!("Phase {:?} -> {:?}", phase, next);
    next
}
