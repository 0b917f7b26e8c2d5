//! Reconciler configuration

use crate::summary::ExitPolicy;
use monitoring_client::DEFAULT_PERIOD_SECONDS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Maximum in-flight lookups or creations
    pub max_concurrency: usize,

    /// Deadline for every individual backend call (milliseconds)
    pub call_timeout_ms: u64,

    /// Evaluation period of provisioned alarms (seconds)
    pub alarm_period_seconds: u32,

    /// Restrict discovery to one namespace
    pub namespace: Option<String>,

    /// Log planned alarms without creating them
    pub dry_run: bool,

    /// When a completed run counts as a failure
    pub exit_policy: ExitPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            call_timeout_ms: 10_000,
            alarm_period_seconds: DEFAULT_PERIOD_SECONDS,
            namespace: None,
            dry_run: false,
            exit_policy: ExitPolicy::AlwaysSucceed,
        }
    }
}

impl ReconcilerConfig {
    /// Sequential lookups and creations
    pub fn sequential() -> Self {
        Self {
            max_concurrency: 1,
            ..Default::default()
        }
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Worker count, never below one
    pub fn concurrency(&self) -> usize {
        self.max_concurrency.max(1)
    }
}
