//! In-memory stand-ins for the `PostgreSQL` repositories.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use printbridge_sync::db::RepositoryError;
use printbridge_sync::import::{ImportState, ImportStateStore};
use printbridge_sync::mapping::{MappingRecord, MappingRepository, StatusCounts};

use crate::lock;

/// Mapping table kept in memory. Can be switched offline to simulate an
/// unreachable database.
#[derive(Default)]
pub struct MemoryMappings {
    rows: Mutex<BTreeMap<SupplierProductId, MappingRecord>>,
    offline: AtomicBool,
}

impl MemoryMappings {
    #[must_use]
    pub fn row(&self, supplier_id: &str) -> Option<MappingRecord> {
        lock(&self.rows)
            .get(&SupplierProductId::new(supplier_id))
            .cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.rows).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop a row behind the sync engine's back.
    pub fn forget(&self, supplier_id: &str) {
        lock(&self.rows).remove(&SupplierProductId::new(supplier_id));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), RepositoryError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "mapping store offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl MappingRepository for MemoryMappings {
    async fn upsert(
        &self,
        supplier_id: &SupplierProductId,
        local_id: ProductId,
        status: SyncStatus,
    ) -> Result<(), RepositoryError> {
        self.check()?;
        lock(&self.rows).insert(
            supplier_id.clone(),
            MappingRecord {
                supplier_product_id: supplier_id.clone(),
                local_product_id: local_id,
                sync_status: status,
                last_synced: Utc::now(),
            },
        );
        Ok(())
    }

    async fn find_by_supplier(
        &self,
        supplier_id: &SupplierProductId,
    ) -> Result<Option<MappingRecord>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.rows).get(supplier_id).cloned())
    }

    async fn find_by_local(
        &self,
        local_id: ProductId,
    ) -> Result<Option<MappingRecord>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.rows)
            .values()
            .filter(|r| r.local_product_id == local_id)
            .max_by_key(|r| r.last_synced)
            .cloned())
    }

    async fn update_status(
        &self,
        supplier_id: &SupplierProductId,
        status: SyncStatus,
    ) -> Result<Option<MappingRecord>, RepositoryError> {
        self.check()?;
        Ok(lock(&self.rows).get_mut(supplier_id).map(|row| {
            row.sync_status = status;
            row.last_synced = Utc::now();
            row.clone()
        }))
    }

    async fn list(
        &self,
        status: Option<SyncStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MappingRecord>, RepositoryError> {
        self.check()?;
        let mut rows: Vec<MappingRecord> = lock(&self.rows)
            .values()
            .filter(|r| status.is_none_or(|s| r.sync_status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.last_synced.cmp(&a.last_synced));
        Ok(rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn delete(&self, supplier_id: &SupplierProductId) -> Result<bool, RepositoryError> {
        self.check()?;
        Ok(lock(&self.rows).remove(supplier_id).is_some())
    }

    async fn count_by_status(&self) -> Result<StatusCounts, RepositoryError> {
        self.check()?;
        let mut counts = StatusCounts::default();
        for row in lock(&self.rows).values() {
            counts.add(row.sync_status, 1);
        }
        Ok(counts)
    }
}

/// Import state kept in memory.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<ImportState>>,
}

impl MemoryStateStore {
    #[must_use]
    pub fn current(&self) -> ImportState {
        lock(&self.state).clone().unwrap_or_default()
    }
}

#[async_trait]
impl ImportStateStore for MemoryStateStore {
    async fn load(&self) -> Result<ImportState, RepositoryError> {
        Ok(self.current())
    }

    async fn save(&self, state: &ImportState) -> Result<(), RepositoryError> {
        *lock(&self.state) = Some(state.clone());
        Ok(())
    }
}
