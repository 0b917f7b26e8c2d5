//! Alarm Provisioner

use crate::deadline::with_deadline;
use crate::summary::MetricFailure;
use futures::stream::{self, StreamExt};
use monitoring_client::{AlarmHandle, AlarmSpec, BackendError, MetricIdentity, MonitoringBackend, NotificationTarget};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};

/// Result of provisioning alarms for a batch of metrics
#[derive(Debug, Default)]
pub struct ProvisionOutcome {
    /// Alarms the backend accepted
    pub created: Vec<AlarmHandle>,
    /// Alarms built but not submitted (dry run)
    pub planned: Vec<AlarmSpec>,
    pub failures: Vec<MetricFailure>,
}

/// Creates one threshold alarm per uncovered metric
pub struct AlarmProvisioner<'a, B> {
    backend: &'a B,
    target: &'a NotificationTarget,
    period_seconds: u32,
    call_timeout: Duration,
    concurrency: usize,
    dry_run: bool,
    taken_names: HashSet<String>,
}

impl<'a, B: MonitoringBackend> AlarmProvisioner<'a, B> {
    pub fn new(
        backend: &'a B,
        target: &'a NotificationTarget,
        period_seconds: u32,
        call_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            backend,
            target,
            period_seconds,
            call_timeout,
            concurrency: concurrency.max(1),
            dry_run: false,
            taken_names: HashSet::new(),
        }
    }

    /// Build alarm definitions without submitting them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Alarm names already bound to other metrics; specs carrying one of
    /// them are not submitted
    pub fn taken_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.taken_names.extend(names);
        self
    }

    /// Alarm definition for one metric, bound to the notification target
    pub fn build_spec(&self, metric: MetricIdentity) -> AlarmSpec {
        AlarmSpec::sum_threshold(metric, self.target.clone(), self.period_seconds)
    }

    /// Submit one alarm per metric. A failed creation is logged and does not
    /// stop the rest of the batch; nothing already created is rolled back.
    ///
    /// Alarm names derive from namespace and metric name only, so metrics
    /// that differ by dimensions share a name. Only the first metric to claim
    /// a name is submitted; the rest fail with `AlreadyExists` instead of
    /// replacing that alarm.
    pub async fn provision(&self, metrics: Vec<MetricIdentity>) -> ProvisionOutcome {
        let mut outcome = ProvisionOutcome::default();
        let mut claimed = self.taken_names.clone();
        let mut specs = Vec::with_capacity(metrics.len());

        for metric in metrics {
            let spec = self.build_spec(metric);
            if claimed.insert(spec.name.clone()) {
                specs.push(spec);
            } else {
                warn!("Alarm name {} already claimed, not creating it for {}", spec.name, spec.metric);
                outcome
                    .failures
                    .push(MetricFailure::create(spec.metric, BackendError::AlreadyExists(spec.name)));
            }
        }

        if self.dry_run {
            for spec in &specs {
                info!(
                    "Dry run: would create alarm {} on {} notifying {}",
                    spec.name, spec.metric, self.target
                );
            }
            outcome.planned = specs;
            return outcome;
        }

        let results: Vec<_> = stream::iter(specs)
            .map(|spec| self.submit(spec))
            .buffered(self.concurrency)
            .collect()
            .await;

        for result in results {
            match result {
                Ok(handle) => outcome.created.push(handle),
                Err(failure) => outcome.failures.push(failure),
            }
        }

        info!(
            "Provisioned {} alarms ({} failed)",
            outcome.created.len(),
            outcome.failures.len()
        );
        outcome
    }

    async fn submit(&self, spec: AlarmSpec) -> Result<AlarmHandle, MetricFailure> {
        match with_deadline(self.call_timeout, self.backend.create_alarm(&spec)).await {
            Ok(handle) => {
                info!("Created alarm {} for metric {}", handle.name, spec.metric);
                Ok(handle)
            }
            Err(e) => {
                warn!("Failed to create alarm {} for metric {}: {}", spec.name, spec.metric, e);
                Err(MetricFailure::create(spec.metric, e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::Stage;
    use monitoring_client::{ComparisonOperator, Dimension, DuplicatePolicy, InMemoryBackend, Statistic};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn metric(ns: &str, name: &str) -> MetricIdentity {
        MetricIdentity::new(ns, name, vec![]).unwrap()
    }

    fn target() -> NotificationTarget {
        NotificationTarget::new("arn:aws:sns:eu-west-1:000000000000:alarms")
    }

    #[tokio::test]
    async fn test_alarm_shape() {
        let backend = InMemoryBackend::new(vec![]);
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 60, TIMEOUT, 2);

        let outcome = provisioner.provision(vec![metric("NS", "Errors")]).await;

        assert_eq!(outcome.created.len(), 1);
        let submitted = backend.submitted();
        assert_eq!(submitted.len(), 1);
        let spec = &submitted[0];
        assert_eq!(spec.name, "NS-Errors-Alarm");
        assert_eq!(spec.statistic, Statistic::Sum);
        assert_eq!(spec.period_seconds, 60);
        assert_eq!(spec.evaluation_periods, 1);
        assert_eq!(spec.threshold, 1.0);
        assert_eq!(spec.comparison, ComparisonOperator::GreaterThanOrEqualToThreshold);
        assert!(spec.actions_enabled);
        assert_eq!(spec.alarm_actions, vec![target.clone()]);
    }

    #[tokio::test]
    async fn test_rerun_against_upsert_backend_keeps_one_alarm() {
        let backend = InMemoryBackend::new(vec![]).with_duplicate_policy(DuplicatePolicy::Upsert);
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 1);

        let first = provisioner.provision(vec![metric("NS", "M")]).await;
        let second = provisioner.provision(vec![metric("NS", "M")]).await;

        assert_eq!(first.created.len(), 1);
        assert_eq!(second.created.len(), 1);
        assert_eq!(backend.alarm_count(), 1);
    }

    #[tokio::test]
    async fn test_rerun_against_rejecting_backend_isolates_failure() {
        let backend = InMemoryBackend::new(vec![]).with_duplicate_policy(DuplicatePolicy::Reject);
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 1);

        let first = provisioner.provision(vec![metric("NS", "M")]).await;
        let second = provisioner.provision(vec![metric("NS", "M")]).await;

        assert_eq!(first.created.len(), 1);
        assert!(second.created.is_empty());
        assert_eq!(second.failures.len(), 1);
        assert_eq!(second.failures[0].stage, Stage::Create);
        assert_eq!(
            second.failures[0].error,
            BackendError::AlreadyExists("NS-M-Alarm".into())
        );
        assert_eq!(backend.alarm_count(), 1);
    }

    #[tokio::test]
    async fn test_create_failure_does_not_stop_batch() {
        let backend = InMemoryBackend::new(vec![]).fail_create(metric("NS", "B"));
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 3);

        let outcome = provisioner
            .provision(vec![metric("NS", "A"), metric("NS", "B"), metric("NS", "C")])
            .await;

        let names: Vec<_> = outcome.created.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["NS-A-Alarm", "NS-C-Alarm"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].metric, metric("NS", "B"));
        assert_eq!(backend.submitted().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_deadline_is_per_metric_failure() {
        let backend = InMemoryBackend::new(vec![]).delay(metric("NS", "Slow"), Duration::from_secs(30));
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, Duration::from_millis(500), 2);

        let outcome = provisioner
            .provision(vec![metric("NS", "Slow"), metric("NS", "Fast")])
            .await;

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.failures[0].error, BackendError::Timeout(500));
    }

    #[tokio::test]
    async fn test_dry_run_submits_nothing() {
        let backend = InMemoryBackend::new(vec![]);
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 2).dry_run(true);

        let outcome = provisioner.provision(vec![metric("NS", "A"), metric("NS", "B")]).await;

        assert_eq!(outcome.planned.len(), 2);
        assert!(outcome.created.is_empty());
        assert!(backend.submitted().is_empty());
    }

    fn lambda_errors(function: &str) -> MetricIdentity {
        MetricIdentity::new("AWS/Lambda", "Errors", vec![Dimension::new("FunctionName", function)]).unwrap()
    }

    #[tokio::test]
    async fn test_shared_alarm_name_created_once() {
        let backend = InMemoryBackend::new(vec![]).with_duplicate_policy(DuplicatePolicy::Upsert);
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 3);

        let outcome = provisioner
            .provision(vec![lambda_errors("a"), lambda_errors("b"), lambda_errors("c")])
            .await;

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.failures.len(), 2);
        let skipped: Vec<_> = outcome.failures.iter().map(|f| f.metric.clone()).collect();
        assert_eq!(skipped, vec![lambda_errors("b"), lambda_errors("c")]);
        assert!(outcome
            .failures
            .iter()
            .all(|f| f.error == BackendError::AlreadyExists("AWS/Lambda-Errors-Alarm".into())));
        assert_eq!(backend.submitted().len(), 1);
        assert_eq!(backend.submitted()[0].metric, lambda_errors("a"));
    }

    #[tokio::test]
    async fn test_taken_name_not_overwritten() {
        let backend = InMemoryBackend::new(vec![]);
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 2)
            .taken_names(vec!["AWS/Lambda-Errors-Alarm".to_string()]);

        let outcome = provisioner.provision(vec![lambda_errors("b"), metric("NS", "Other")]).await;

        assert_eq!(outcome.created.len(), 1);
        assert_eq!(outcome.created[0].name, "NS-Other-Alarm");
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].metric, lambda_errors("b"));
        assert_eq!(backend.submitted().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_creates_bounded_by_concurrency() {
        let metrics: Vec<_> = (0..20).map(|i| metric("NS", &format!("M{}", i))).collect();
        let backend = InMemoryBackend::new(vec![]).with_latency(Duration::from_millis(10));
        let target = target();
        let provisioner = AlarmProvisioner::new(&backend, &target, 300, TIMEOUT, 3);

        let outcome = provisioner.provision(metrics).await;

        assert_eq!(outcome.created.len(), 20);
        assert_eq!(backend.peak_in_flight(), 3);
    }
}
