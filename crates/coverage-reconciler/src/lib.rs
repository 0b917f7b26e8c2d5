//! Alarm Coverage Reconciler
//!
//! One-shot pass over a monitoring backend:
//! - Lists every metric in the catalog
//! - Keeps the metrics that no alarm is bound to
//! - Creates a threshold-on-sum alarm for each, wired to a shared
//!   notification target
//!
//! Failures are contained per metric and reported in the run summary.

mod config;
mod deadline;
mod filter;
mod lister;
mod provisioner;
mod reconciler;
mod summary;

pub use config::ReconcilerConfig;
pub use filter::{CoverageFilter, FilterOutcome};
pub use lister::{Inventory, MetricLister};
pub use provisioner::{AlarmProvisioner, ProvisionOutcome};
pub use reconciler::{Reconciler, RunPhase};
pub use summary::{ExitPolicy, MetricFailure, RunSummary, Stage};
