//! Alarm Reconciler - Main Entry Point

use runner::{init_logging, load_settings, run, CONFIG_PATH_ENV};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_PATH_ENV).ok())
        .map(PathBuf::from);

    let settings = load_settings(config_path.as_deref())?;
    init_logging(&settings.logging)?;

    info!("=== Alarm Reconciler v{} ===", env!("CARGO_PKG_VERSION"));

    let summary = run(&settings).await?;
    println!("{}", serde_json::to_string(&summary)?);

    if summary.meets(settings.reconciler.exit_policy) {
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Run {} did not meet exit policy {:?}", summary.run_id, settings.reconciler.exit_policy);
        Ok(ExitCode::FAILURE)
    }
}
