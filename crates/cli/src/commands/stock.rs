//! Stock reconciliation command.

use printbridge_sync::SyncConfig;

use super::{CliError, pipeline, print_json};

/// Reconcile stock for every synced product and print the report.
pub async fn sync(config: &SyncConfig) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;
    let report = pipeline.stock.synchronize_all().await;
    print_json(&report)
}
