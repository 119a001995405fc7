//! Mapping inspection commands.

use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use printbridge_sync::SyncConfig;

use super::{CliError, pipeline, print_json};

/// List mappings as JSON.
pub async fn list(
    config: &SyncConfig,
    status: Option<SyncStatus>,
    limit: i64,
    offset: i64,
) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;
    let records = pipeline
        .mappings
        .list_by_status(status, limit, offset)
        .await;
    print_json(&records)
}

/// Print the local product ID for a supplier product.
pub async fn local(config: &SyncConfig, supplier_id: &SupplierProductId) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;
    let local_id = pipeline.mappings.get_local_id(supplier_id).await;
    print_json(&serde_json::json!({
        "supplier_product_id": supplier_id,
        "local_product_id": local_id,
    }))
}

/// Print the supplier product ID for a local product.
pub async fn supplier(config: &SyncConfig, local_id: ProductId) -> Result<(), CliError> {
    let (pipeline, _) = pipeline(config).await?;
    let supplier_id = pipeline.mappings.get_supplier_id(local_id).await;
    print_json(&serde_json::json!({
        "supplier_product_id": supplier_id,
        "local_product_id": local_id,
    }))
}
