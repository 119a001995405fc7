//! Bidirectional supplier/local product ID mapping.
//!
//! The mapping table is the authoritative lookup. Local product metadata
//! carries the supplier ID as well and is scanned only when the table has no
//! row; a hit there is written back so the next lookup is a table read.
//!
//! Storage failures never escape this module: operations return `bool` or
//! `Option` and log the underlying error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::{CatalogStore, MetaMap, meta};
use crate::db::RepositoryError;

/// Page size used when walking the whole table.
const SCAN_PAGE_SIZE: i64 = 500;

/// One persisted mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingRecord {
    pub supplier_product_id: SupplierProductId,
    pub local_product_id: ProductId,
    pub sync_status: SyncStatus,
    pub last_synced: DateTime<Utc>,
}

/// Mapping counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub synced: u64,
    pub pending: u64,
    pub error: u64,
    pub total: u64,
}

impl StatusCounts {
    /// Add `count` mappings in `status`.
    pub const fn add(&mut self, status: SyncStatus, count: u64) {
        match status {
            SyncStatus::Synced => self.synced += count,
            SyncStatus::Pending => self.pending += count,
            SyncStatus::Error => self.error += count,
        }
        self.total += count;
    }
}

/// Row-level mapping persistence.
#[async_trait]
pub trait MappingRepository: Send + Sync {
    /// Insert or replace the row for `supplier_id`, stamping `last_synced`.
    async fn upsert(
        &self,
        supplier_id: &SupplierProductId,
        local_id: ProductId,
        status: SyncStatus,
    ) -> Result<(), RepositoryError>;

    async fn find_by_supplier(
        &self,
        supplier_id: &SupplierProductId,
    ) -> Result<Option<MappingRecord>, RepositoryError>;

    async fn find_by_local(
        &self,
        local_id: ProductId,
    ) -> Result<Option<MappingRecord>, RepositoryError>;

    /// Set status and `last_synced`. Returns the updated row, or `None` if
    /// there is no row for `supplier_id`.
    async fn update_status(
        &self,
        supplier_id: &SupplierProductId,
        status: SyncStatus,
    ) -> Result<Option<MappingRecord>, RepositoryError>;

    /// Rows ordered by `last_synced` descending; `status = None` lists all.
    async fn list(
        &self,
        status: Option<SyncStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MappingRecord>, RepositoryError>;

    /// Delete the row for `supplier_id`. Returns whether a row existed.
    async fn delete(&self, supplier_id: &SupplierProductId) -> Result<bool, RepositoryError>;

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError>;
}

/// Mapping service over the repository and the local catalog.
#[derive(Clone)]
pub struct IdMappingStore {
    repo: Arc<dyn MappingRepository>,
    catalog: Arc<dyn CatalogStore>,
}

impl IdMappingStore {
    /// Create a new mapping store.
    #[must_use]
    pub fn new(repo: Arc<dyn MappingRepository>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self { repo, catalog }
    }

    /// Upsert the mapping and mirror the supplier ID into the local product's metadata.
    ///
    /// A local product belongs to at most one supplier product: a row that
    /// maps another supplier ID onto `local_id` is removed first.
    ///
    /// Returns `false` if the mapping row could not be written. A failed
    /// metadata mirror is logged but does not fail the call, since the row
    /// is authoritative and validation repairs the metadata later.
    #[instrument(skip(self), fields(supplier_id = %supplier_id, local_id = %local_id))]
    pub async fn map_supplier_to_local(
        &self,
        supplier_id: &SupplierProductId,
        local_id: ProductId,
        status: SyncStatus,
    ) -> bool {
        self.release_local(supplier_id, local_id).await;

        if let Err(e) = self.repo.upsert(supplier_id, local_id, status).await {
            error!(error = %e, "Failed to upsert product mapping");
            return false;
        }

        let entries = MetaMap::from([(
            meta::SUPPLIER_PRODUCT_ID.to_string(),
            supplier_id.to_string(),
        )]);
        if let Err(e) = self.catalog.set_meta(local_id, &entries).await {
            warn!(error = %e, "Failed to mirror supplier ID into product metadata");
        }

        true
    }

    /// Drop rows that map a different supplier product onto `local_id`.
    async fn release_local(&self, supplier_id: &SupplierProductId, local_id: ProductId) {
        loop {
            let previous = match self.repo.find_by_local(local_id).await {
                Ok(Some(record)) if record.supplier_product_id != *supplier_id => record,
                Ok(_) => return,
                Err(e) => {
                    error!(error = %e, "Failed to look up existing mapping for local product");
                    return;
                }
            };

            warn!(
                previous_supplier_id = %previous.supplier_product_id,
                "Local product was mapped to another supplier product, replacing mapping"
            );
            match self.repo.delete(&previous.supplier_product_id).await {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    error!(error = %e, "Failed to remove previous mapping");
                    return;
                }
            }
        }
    }

    /// Local product ID for a supplier product.
    ///
    /// Falls back to a metadata scan and writes a hit back into the table.
    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    pub async fn get_local_id(&self, supplier_id: &SupplierProductId) -> Option<ProductId> {
        match self.repo.find_by_supplier(supplier_id).await {
            Ok(Some(record)) => return Some(record.local_product_id),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Mapping lookup failed, trying metadata"),
        }

        let local_id = match self
            .catalog
            .find_by_meta(meta::SUPPLIER_PRODUCT_ID, supplier_id.as_str())
            .await
        {
            Ok(found) => found?,
            Err(e) => {
                error!(error = %e, "Metadata lookup failed");
                return None;
            }
        };

        info!(local_id = %local_id, "Recovered mapping from product metadata");
        self.write_back(supplier_id, local_id).await;
        Some(local_id)
    }

    /// Supplier product ID for a local product.
    ///
    /// Falls back to the product's metadata and writes a hit back into the table.
    #[instrument(skip(self), fields(local_id = %local_id))]
    pub async fn get_supplier_id(&self, local_id: ProductId) -> Option<SupplierProductId> {
        match self.repo.find_by_local(local_id).await {
            Ok(Some(record)) => return Some(record.supplier_product_id),
            Ok(None) => {}
            Err(e) => error!(error = %e, "Mapping lookup failed, trying metadata"),
        }

        let value = match self
            .catalog
            .get_meta(local_id, meta::SUPPLIER_PRODUCT_ID)
            .await
        {
            Ok(value) => value?,
            Err(e) => {
                error!(error = %e, "Metadata lookup failed");
                return None;
            }
        };

        let supplier_id = SupplierProductId::new(value.trim());
        if !supplier_id.is_valid() {
            return None;
        }

        info!(supplier_id = %supplier_id, "Recovered mapping from product metadata");
        self.write_back(&supplier_id, local_id).await;
        Some(supplier_id)
    }

    async fn write_back(&self, supplier_id: &SupplierProductId, local_id: ProductId) {
        self.release_local(supplier_id, local_id).await;
        if let Err(e) = self
            .repo
            .upsert(supplier_id, local_id, SyncStatus::Synced)
            .await
        {
            warn!(
                error = %e,
                supplier_id = %supplier_id,
                local_id = %local_id,
                "Failed to write back recovered mapping"
            );
        }
    }

    /// Update the status and timestamp of an existing mapping, mirroring both
    /// into the local product's metadata.
    ///
    /// Returns `false` if there is no mapping for `supplier_id`.
    #[instrument(skip(self), fields(supplier_id = %supplier_id, status = %status))]
    pub async fn update_status(&self, supplier_id: &SupplierProductId, status: SyncStatus) -> bool {
        let record = match self.repo.update_status(supplier_id, status).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No mapping to update");
                return false;
            }
            Err(e) => {
                error!(error = %e, "Failed to update mapping status");
                return false;
            }
        };

        let entries = MetaMap::from([
            (meta::SYNC_STATUS.to_string(), status.to_string()),
            (
                meta::LAST_SYNCED.to_string(),
                record.last_synced.to_rfc3339(),
            ),
        ]);
        if let Err(e) = self
            .catalog
            .set_meta(record.local_product_id, &entries)
            .await
        {
            warn!(
                error = %e,
                local_id = %record.local_product_id,
                "Failed to mirror status into product metadata"
            );
        }

        true
    }

    /// Mappings in `status` (all when `None`), newest sync first.
    pub async fn list_by_status(
        &self,
        status: Option<SyncStatus>,
        limit: i64,
        offset: i64,
    ) -> Vec<MappingRecord> {
        match self.repo.list(status, limit, offset).await {
            Ok(records) => records,
            Err(e) => {
                error!(error = %e, "Failed to list mappings");
                Vec::new()
            }
        }
    }

    /// Every mapping in `status` (all when `None`).
    ///
    /// Unlike the other operations this surfaces the storage error, so callers
    /// walking the whole table can tell "empty" from "unavailable".
    ///
    /// # Errors
    ///
    /// Returns the repository error of the first page that fails.
    pub async fn list_all(
        &self,
        status: Option<SyncStatus>,
    ) -> Result<Vec<MappingRecord>, RepositoryError> {
        let mut all = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.repo.list(status, SCAN_PAGE_SIZE, offset).await?;
            let len = i64::try_from(page.len()).unwrap_or(SCAN_PAGE_SIZE);
            all.extend(page);
            if len < SCAN_PAGE_SIZE {
                return Ok(all);
            }
            offset += len;
        }
    }

    /// Delete the mapping for `supplier_id`.
    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    pub async fn remove(&self, supplier_id: &SupplierProductId) -> bool {
        match self.repo.delete(supplier_id).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(error = %e, "Failed to delete mapping");
                false
            }
        }
    }

    /// Mapping counts per status (zeroes if storage is unavailable).
    pub async fn status_counts(&self) -> StatusCounts {
        match self.repo.count_by_status().await {
            Ok(counts) => counts,
            Err(e) => {
                error!(error = %e, "Failed to count mappings");
                StatusCounts::default()
            }
        }
    }
}
