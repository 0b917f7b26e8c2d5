//! Alarm Reconciler Runner
//!
//! Wires settings, logging and the CloudWatch backend around a single
//! reconciliation run.

mod settings;

pub use settings::{load_settings, AwsSettings, LoggingSettings, Settings, CONFIG_PATH_ENV};

use coverage_reconciler::{Reconciler, RunSummary};
use monitoring_client::{CloudWatchBackend, MonitoringBackend, RateLimitedBackend};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> anyhow::Result<()> {
    let level: Level = settings.level.parse()?;
    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);

    if settings.json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Run one reconciliation pass against CloudWatch
pub async fn run(settings: &Settings) -> anyhow::Result<RunSummary> {
    let cloudwatch = CloudWatchBackend::from_env(settings.aws.region.clone()).await;

    let backend: Arc<dyn MonitoringBackend> = if settings.rate_limit.enabled {
        Arc::new(RateLimitedBackend::new(cloudwatch, &settings.rate_limit))
    } else {
        Arc::new(cloudwatch)
    };

    reconcile_with(backend, settings).await
}

/// Run one reconciliation pass against `backend`
pub async fn reconcile_with<B: MonitoringBackend>(
    backend: B,
    settings: &Settings,
) -> anyhow::Result<RunSummary> {
    let target = settings.notification_target()?;
    let reconciler = Reconciler::new(backend, target, settings.reconciler.clone());

    info!("Starting alarm coverage reconciliation");
    Ok(reconciler.run().await)
}
