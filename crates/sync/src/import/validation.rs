//! Post-import consistency validation.
//!
//! Two corrective passes over the mapping table, run after every completed
//! import:
//!
//! 1. Orphan cleanup: rows whose local product no longer exists are deleted.
//! 2. Drift repair: local products whose supplier-ID metadata disagrees with
//!    their mapping row get the metadata overwritten. The row is never touched.
//!
//! Both passes are idempotent and never fail the import; problems are logged.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::catalog::{CatalogStore, MetaMap, meta};
use crate::mapping::IdMappingStore;

/// Runs the post-import consistency passes.
#[derive(Clone)]
pub struct ImportValidator {
    mappings: IdMappingStore,
    catalog: Arc<dyn CatalogStore>,
}

impl ImportValidator {
    /// Create a new validator.
    #[must_use]
    pub fn new(mappings: IdMappingStore, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { mappings, catalog }
    }

    /// Run orphan cleanup and drift repair over every mapping.
    #[instrument(skip(self))]
    pub async fn run(&self) {
        // Snapshot first so deletions do not shift the pages being read
        let records = match self.mappings.list_all(None).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Validation skipped, mappings unavailable");
                return;
            }
        };

        let mut orphans = 0_u64;
        let mut repaired = 0_u64;

        for record in &records {
            let supplier_id = &record.supplier_product_id;
            let local_id = record.local_product_id;

            match self.catalog.product_exists(local_id).await {
                Ok(true) => {}
                Ok(false) => {
                    if self.mappings.remove(supplier_id).await {
                        orphans += 1;
                        warn!(
                            supplier_id = %supplier_id,
                            local_id = %local_id,
                            "Removed orphaned mapping"
                        );
                    }
                    continue;
                }
                Err(e) => {
                    warn!(
                        supplier_id = %supplier_id,
                        local_id = %local_id,
                        error = %e,
                        "Could not check product existence"
                    );
                    continue;
                }
            }

            match self
                .catalog
                .get_meta(local_id, meta::SUPPLIER_PRODUCT_ID)
                .await
            {
                Ok(Some(stored)) if stored == supplier_id.as_str() => {}
                Ok(stored) => {
                    let entries = MetaMap::from([(
                        meta::SUPPLIER_PRODUCT_ID.to_string(),
                        supplier_id.to_string(),
                    )]);
                    match self.catalog.set_meta(local_id, &entries).await {
                        Ok(()) => {
                            repaired += 1;
                            warn!(
                                supplier_id = %supplier_id,
                                local_id = %local_id,
                                stored = stored.as_deref().unwrap_or(""),
                                "Repaired drifted supplier ID metadata"
                            );
                        }
                        Err(e) => warn!(
                            supplier_id = %supplier_id,
                            local_id = %local_id,
                            error = %e,
                            "Failed to repair metadata"
                        ),
                    }
                }
                Err(e) => warn!(
                    supplier_id = %supplier_id,
                    local_id = %local_id,
                    error = %e,
                    "Could not read product metadata"
                ),
            }
        }

        info!(
            checked = records.len(),
            orphans, repaired, "Post-import validation finished"
        );
    }
}
