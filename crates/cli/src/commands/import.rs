//! Import control commands.
//!
//! `start`, `catchup` and `cancel` only touch the import state and the task
//! queue; the work itself happens in `printbridge worker`. `product` imports
//! one product inline, which is handy for retrying a single `error` mapping.

use printbridge_core::SupplierProductId;
use printbridge_sync::SyncConfig;

use super::{CliError, pipeline, print_json};

/// Start a full import.
pub async fn start(config: &SyncConfig, force: bool, initial: bool) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;

    if pipeline.scheduler.start(force, initial).await {
        tracing::info!(
            force,
            initial,
            "Import scheduled; run `printbridge worker` to process it"
        );
    } else {
        tracing::warn!("Import not started: one is already in progress (use --force to restart)");
    }
    Ok(())
}

/// Start a catch-up import unless one is running.
pub async fn catchup(config: &SyncConfig) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;

    if pipeline.scheduler.schedule_catchup().await {
        tracing::info!("Catch-up import scheduled");
    } else {
        tracing::info!("Import already in progress, catch-up skipped");
    }
    Ok(())
}

/// Cancel the running import.
pub async fn cancel(config: &SyncConfig) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;

    let cancelled = pipeline.scheduler.cancel().await;
    tracing::info!(cancelled, "Import cancelled");
    Ok(())
}

/// Print import statistics as JSON.
pub async fn stats(config: &SyncConfig) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;
    print_json(&pipeline.scheduler.stats().await)
}

/// Import a single product inline.
pub async fn product(config: &SyncConfig, supplier_id: &SupplierProductId) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;

    let local_id = pipeline.scheduler.sync_product(supplier_id).await?;
    tracing::info!(%supplier_id, %local_id, "Product imported");
    Ok(())
}
