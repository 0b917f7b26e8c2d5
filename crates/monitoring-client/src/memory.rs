//! In-Memory Monitoring Backend
//!
//! Deterministic backend for tests and local dry runs. Serves a fixed
//! catalog in pages, keeps created alarms in memory, and can be told to fail
//! or stall on specific pages and metrics. Tracks how many lookups and
//! creates are in flight at once.

use crate::alarm::{AlarmHandle, AlarmSpec, AlarmSummary};
use crate::backend::MonitoringBackend;
use crate::error::BackendError;
use crate::metric::{ListMetricsRequest, MetricIdentity, MetricPage, MetricRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

const TOKEN_PREFIX: &str = "page-";

/// How `create_alarm` treats a name that already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    /// Replace the existing alarm (CloudWatch PutMetricAlarm semantics)
    Upsert,
    /// Fail with `BackendError::AlreadyExists`
    Reject,
}

#[derive(Debug, Clone)]
struct StoredAlarm {
    name: String,
    metric: MetricIdentity,
}

/// In-memory monitoring backend
pub struct InMemoryBackend {
    catalog: Vec<MetricRecord>,
    page_size: usize,
    duplicate_policy: DuplicatePolicy,
    alarms: Mutex<Vec<StoredAlarm>>,
    submitted: Mutex<Vec<AlarmSpec>>,
    list_calls: AtomicUsize,
    failing_pages: HashSet<usize>,
    failing_describe: HashSet<MetricIdentity>,
    failing_create: HashSet<MetricIdentity>,
    delays: HashMap<MetricIdentity, Duration>,
    latency: Option<Duration>,
    page_delays: HashMap<usize, Duration>,
    repeating_pages: HashSet<usize>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Decrements the in-flight count when a call finishes or is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemoryBackend {
    /// Create a backend serving `catalog`, 100 records per page
    pub fn new(catalog: Vec<MetricRecord>) -> Self {
        Self {
            catalog,
            page_size: 100,
            duplicate_policy: DuplicatePolicy::Upsert,
            alarms: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            list_calls: AtomicUsize::new(0),
            failing_pages: HashSet::new(),
            failing_describe: HashSet::new(),
            failing_create: HashSet::new(),
            delays: HashMap::new(),
            latency: None,
            page_delays: HashMap::new(),
            repeating_pages: HashSet::new(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Set the number of records per catalog page (minimum 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Seed an existing alarm bound to `metric`
    pub fn with_alarm(mut self, metric: MetricIdentity, name: impl Into<String>) -> Self {
        if let Ok(alarms) = self.alarms.get_mut() {
            alarms.push(StoredAlarm {
                name: name.into(),
                metric,
            });
        }
        self
    }

    /// Fail the fetch of catalog page `index` (zero-based)
    pub fn fail_page(mut self, index: usize) -> Self {
        self.failing_pages.insert(index);
        self
    }

    /// Fail alarm lookups for `metric`
    pub fn fail_describe(mut self, metric: MetricIdentity) -> Self {
        self.failing_describe.insert(metric);
        self
    }

    /// Fail alarm creation for `metric`
    pub fn fail_create(mut self, metric: MetricIdentity) -> Self {
        self.failing_create.insert(metric);
        self
    }

    /// Stall lookups and creations for `metric` by `delay`
    pub fn delay(mut self, metric: MetricIdentity, delay: Duration) -> Self {
        self.delays.insert(metric, delay);
        self
    }

    /// Stall every lookup and creation by `latency` unless a per-metric
    /// delay is set
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Stall the fetch of catalog page `index` by `delay`
    pub fn delay_page(mut self, index: usize, delay: Duration) -> Self {
        self.page_delays.insert(index, delay);
        self
    }

    /// Answer page `index` with its own continuation token instead of the next one
    pub fn repeat_token_at_page(mut self, index: usize) -> Self {
        self.repeating_pages.insert(index);
        self
    }

    /// Highest number of lookups and creates observed running at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Number of `list_metrics` calls served
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Every create request received, in arrival order
    pub fn submitted(&self) -> Vec<AlarmSpec> {
        self.submitted.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Number of alarms currently stored
    pub fn alarm_count(&self) -> usize {
        self.alarms.lock().map(|a| a.len()).unwrap_or(0)
    }

    fn parse_token(token: Option<&str>) -> Result<usize, BackendError> {
        match token {
            None => Ok(0),
            Some(t) => t
                .strip_prefix(TOKEN_PREFIX)
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| BackendError::Rejected(format!("Invalid continuation token: {}", t))),
        }
    }

    async fn stall(&self, metric: &MetricIdentity) {
        if let Some(delay) = self.delays.get(metric).copied().or(self.latency) {
            tokio::time::sleep(delay).await;
        }
    }

    fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlight(&self.in_flight)
    }
}

#[async_trait]
impl MonitoringBackend for InMemoryBackend {
    async fn list_metrics(&self, request: ListMetricsRequest) -> Result<MetricPage, BackendError> {
        self.list_calls.fetch_add(1, Ordering::Relaxed);
        let page = Self::parse_token(request.next_token.as_deref())?;

        if let Some(delay) = self.page_delays.get(&page) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing_pages.contains(&page) {
            return Err(BackendError::Unavailable(format!("Page {} unavailable", page)));
        }

        let matching: Vec<&MetricRecord> = self
            .catalog
            .iter()
            .filter(|r| match &request.namespace {
                Some(ns) => r.namespace.as_deref() == Some(ns.as_str()),
                None => true,
            })
            .collect();

        let start = page * self.page_size;
        let end = (start + self.page_size).min(matching.len());
        let records = matching
            .get(start..end)
            .map(|slice| slice.iter().map(|r| (*r).clone()).collect())
            .unwrap_or_default();
        let next_token = if self.repeating_pages.contains(&page) {
            Some(format!("{}{}", TOKEN_PREFIX, page))
        } else {
            (end < matching.len()).then(|| format!("{}{}", TOKEN_PREFIX, page + 1))
        };

        debug!("Serving catalog page {} ({} records)", page, end.saturating_sub(start));
        Ok(MetricPage { records, next_token })
    }

    async fn describe_alarms_for(&self, metric: &MetricIdentity) -> Result<Vec<AlarmSummary>, BackendError> {
        let _guard = self.enter();
        self.stall(metric).await;

        if self.failing_describe.contains(metric) {
            return Err(BackendError::Unavailable(format!("Lookup failed for {}", metric)));
        }

        let alarms = self
            .alarms
            .lock()
            .map_err(|e| BackendError::Unavailable(format!("Lock error: {}", e)))?;

        Ok(alarms
            .iter()
            .filter(|a| &a.metric == metric)
            .map(|a| AlarmSummary {
                name: a.name.clone(),
                arn: None,
            })
            .collect())
    }

    async fn create_alarm(&self, spec: &AlarmSpec) -> Result<AlarmHandle, BackendError> {
        let _guard = self.enter();
        self.stall(&spec.metric).await;

        self.submitted
            .lock()
            .map_err(|e| BackendError::Unavailable(format!("Lock error: {}", e)))?
            .push(spec.clone());

        if self.failing_create.contains(&spec.metric) {
            return Err(BackendError::Rejected(format!("Create refused for {}", spec.name)));
        }

        let mut alarms = self
            .alarms
            .lock()
            .map_err(|e| BackendError::Unavailable(format!("Lock error: {}", e)))?;

        let stored = StoredAlarm {
            name: spec.name.clone(),
            metric: spec.metric.clone(),
        };
        match alarms.iter().position(|a| a.name == spec.name) {
            Some(_) if self.duplicate_policy == DuplicatePolicy::Reject => {
                return Err(BackendError::AlreadyExists(spec.name.clone()));
            }
            Some(index) => alarms[index] = stored,
            None => alarms.push(stored),
        }

        Ok(AlarmHandle {
            name: spec.name.clone(),
            arn: Some(format!("arn:memory:alarm:{}", spec.name)),
        })
    }
}
