//! Stock reconciliation.
//!
//! Pushes supplier-reported quantities into local stock for every synced
//! mapping. A write happens only when the quantity actually changed.

use std::collections::HashMap;
use std::sync::Arc;

use printbridge_core::{ProductId, ShopId, StockStatus, SyncStatus, VariationId};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{CatalogError, CatalogStore, ProductKind};
use crate::error::SyncError;
use crate::mapping::{IdMappingStore, MappingRecord};
use crate::printify::SupplierApi;

/// Counts from one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StockSyncReport {
    /// Stock writes issued.
    pub updated: u64,
    /// Mappings visited.
    pub processed: u64,
    /// Writes that left a product or variation out of stock.
    pub out_of_stock: u64,
    /// Writes that left a product or variation in stock.
    pub in_stock: u64,
    /// Mappings that failed.
    pub errors: u64,
}

impl StockSyncReport {
    fn record_write(&mut self, quantity: i64) {
        self.updated += 1;
        match StockStatus::from_quantity(quantity) {
            StockStatus::InStock => self.in_stock += 1,
            StockStatus::OutOfStock => self.out_of_stock += 1,
        }
    }
}

/// Reconciles local stock with the supplier.
#[derive(Clone)]
pub struct StockReconciler {
    supplier: Arc<dyn SupplierApi>,
    catalog: Arc<dyn CatalogStore>,
    mappings: IdMappingStore,
    shop_id: ShopId,
}

impl StockReconciler {
    /// Create a new stock reconciler.
    #[must_use]
    pub fn new(
        supplier: Arc<dyn SupplierApi>,
        catalog: Arc<dyn CatalogStore>,
        mappings: IdMappingStore,
        shop_id: ShopId,
    ) -> Self {
        Self {
            supplier,
            catalog,
            mappings,
            shop_id,
        }
    }

    /// Reconcile every synced mapping. Per-mapping failures are counted, never fatal.
    #[instrument(skip(self))]
    pub async fn synchronize_all(&self) -> StockSyncReport {
        let mut report = StockSyncReport::default();

        let mappings = match self.mappings.list_all(Some(SyncStatus::Synced)).await {
            Ok(mappings) => mappings,
            Err(e) => {
                error!(error = %e, "Failed to load synced mappings");
                report.errors += 1;
                return report;
            }
        };

        for mapping in &mappings {
            report.processed += 1;
            if let Err(e) = self.synchronize_one(mapping, &mut report).await {
                report.errors += 1;
                warn!(
                    supplier_id = %mapping.supplier_product_id,
                    local_id = %mapping.local_product_id,
                    error = %e,
                    "Stock sync failed for product"
                );
            }
        }

        info!(
            processed = report.processed,
            updated = report.updated,
            in_stock = report.in_stock,
            out_of_stock = report.out_of_stock,
            errors = report.errors,
            outcome = "success",
            "Stock sync finished"
        );
        report
    }

    async fn synchronize_one(
        &self,
        mapping: &MappingRecord,
        report: &mut StockSyncReport,
    ) -> Result<(), SyncError> {
        let product = self
            .supplier
            .get_product(self.shop_id, &mapping.supplier_product_id)
            .await?;
        let local_id = mapping.local_product_id;

        let Some(local) = self.catalog.get_product(local_id).await? else {
            // Orphans are removed by post-import validation
            warn!(local_id = %local_id, "Mapped product no longer exists");
            return Err(CatalogError::NotFound(format!("product {local_id}")).into());
        };

        match local.kind {
            ProductKind::Simple => {
                let Some(variant) = product.variants.first() else {
                    debug!(local_id = %local_id, "Supplier product has no variants");
                    return Ok(());
                };
                self.apply(
                    local_id,
                    None,
                    local.stock_quantity,
                    variant.stock_quantity(),
                    report,
                )
                .await?;
            }
            ProductKind::Variable => {
                let quantities: HashMap<_, _> = product
                    .variants
                    .iter()
                    .map(|v| (v.id, v.stock_quantity()))
                    .collect();

                for variation in self.catalog.list_variations(local_id).await? {
                    let Some(variant_id) = variation.supplier_variant_id() else {
                        continue;
                    };
                    let Some(&quantity) = quantities.get(&variant_id) else {
                        debug!(
                            variation_id = %variation.id,
                            variant_id = %variant_id,
                            "Variant no longer offered by supplier"
                        );
                        continue;
                    };
                    self.apply(
                        local_id,
                        Some(variation.id),
                        variation.stock_quantity,
                        quantity,
                        report,
                    )
                    .await?;
                }
            }
        }

        Ok(())
    }

    async fn apply(
        &self,
        product: ProductId,
        variation: Option<VariationId>,
        current: Option<i64>,
        quantity: i64,
        report: &mut StockSyncReport,
    ) -> Result<(), SyncError> {
        if current == Some(quantity) {
            return Ok(());
        }
        self.catalog.set_stock(product, variation, quantity).await?;
        report.record_write(quantity);
        debug!(
            local_id = %product,
            variation_id = ?variation.map(|v| v.as_i64()),
            quantity,
            "Stock updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_write_splits_by_status() {
        let mut report = StockSyncReport::default();
        report.record_write(5);
        report.record_write(0);
        report.record_write(-2);
        assert_eq!(report.updated, 3);
        assert_eq!(report.in_stock, 1);
        assert_eq!(report.out_of_stock, 2);
    }
}
