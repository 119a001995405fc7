//! Integration tests for the supplier-to-local ID mapping.
//!
//! The mapping table is authoritative, but product metadata carries a copy
//! of the supplier ID so lookups survive a lost or stale table.

use std::sync::Arc;

use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use printbridge_integration_tests::{MemoryCatalog, MemoryMappings};
use printbridge_sync::catalog::{MetaMap, meta};
use printbridge_sync::mapping::IdMappingStore;

fn store() -> (IdMappingStore, Arc<MemoryMappings>, Arc<MemoryCatalog>) {
    let repo = Arc::new(MemoryMappings::default());
    let catalog = Arc::new(MemoryCatalog::default());
    let store = IdMappingStore::new(repo.clone(), catalog.clone());
    (store, repo, catalog)
}

fn supplier_meta(id: &str) -> MetaMap {
    MetaMap::from([(meta::SUPPLIER_PRODUCT_ID.to_string(), id.to_string())])
}

// =============================================================================
// Mapping writes
// =============================================================================

#[tokio::test]
async fn test_mapping_twice_leaves_one_row() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);
    let supplier = SupplierProductId::new("P1");

    assert!(
        store
            .map_supplier_to_local(&supplier, local, SyncStatus::Pending)
            .await
    );
    assert!(
        store
            .map_supplier_to_local(&supplier, local, SyncStatus::Synced)
            .await
    );

    assert_eq!(repo.len(), 1);
    let row = repo.row("P1").unwrap();
    assert_eq!(row.local_product_id, local);
    assert_eq!(row.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_remapping_local_product_replaces_previous_supplier() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);
    let old = SupplierProductId::new("A");
    let new = SupplierProductId::new("B");

    assert!(
        store
            .map_supplier_to_local(&old, local, SyncStatus::Synced)
            .await
    );
    assert!(
        store
            .map_supplier_to_local(&new, local, SyncStatus::Synced)
            .await
    );

    assert_eq!(repo.len(), 1);
    assert!(repo.row("A").is_none());
    assert_eq!(repo.row("B").unwrap().local_product_id, local);
    assert_eq!(store.get_supplier_id(local).await, Some(new));
    assert_eq!(store.get_local_id(&old).await, None);
    assert_eq!(
        catalog.product(local).unwrap().product.supplier_product_id(),
        Some("B")
    );
}

#[tokio::test]
async fn test_mapping_keeps_rows_for_other_local_products() {
    let (store, repo, catalog) = store();
    let first = catalog.insert_simple(MetaMap::new(), 0);
    let second = catalog.insert_simple(MetaMap::new(), 0);

    store
        .map_supplier_to_local(&SupplierProductId::new("A"), first, SyncStatus::Synced)
        .await;
    store
        .map_supplier_to_local(&SupplierProductId::new("B"), second, SyncStatus::Synced)
        .await;

    assert_eq!(repo.len(), 2);
    assert_eq!(repo.row("A").unwrap().local_product_id, first);
}

#[tokio::test]
async fn test_mapping_mirrors_supplier_id_into_metadata() {
    let (store, _repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);

    store
        .map_supplier_to_local(&SupplierProductId::new("P7"), local, SyncStatus::Synced)
        .await;

    let product = catalog.product(local).unwrap();
    assert_eq!(product.product.supplier_product_id(), Some("P7"));
}

#[tokio::test]
async fn test_mapping_fails_when_table_unavailable() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);
    repo.set_offline(true);

    let mapped = store
        .map_supplier_to_local(&SupplierProductId::new("P1"), local, SyncStatus::Synced)
        .await;

    assert!(!mapped);
}

#[tokio::test]
async fn test_mapping_survives_missing_local_product() {
    let (store, repo, _catalog) = store();

    // Metadata mirror fails, the row is still written
    let mapped = store
        .map_supplier_to_local(
            &SupplierProductId::new("P1"),
            ProductId::new(999),
            SyncStatus::Synced,
        )
        .await;

    assert!(mapped);
    assert!(repo.row("P1").is_some());
}

// =============================================================================
// Lookups
// =============================================================================

#[tokio::test]
async fn test_lookups_after_mapping() {
    let (store, _repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);
    let supplier = SupplierProductId::new("P1");
    store
        .map_supplier_to_local(&supplier, local, SyncStatus::Synced)
        .await;

    assert_eq!(store.get_local_id(&supplier).await, Some(local));
    assert_eq!(store.get_supplier_id(local).await, Some(supplier));
}

#[tokio::test]
async fn test_local_lookup_falls_back_to_metadata_and_writes_back() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(supplier_meta("P5"), 0);
    assert!(repo.is_empty());

    let found = store.get_local_id(&SupplierProductId::new("P5")).await;

    assert_eq!(found, Some(local));
    let row = repo.row("P5").unwrap();
    assert_eq!(row.local_product_id, local);
    assert_eq!(row.sync_status, SyncStatus::Synced);
}

#[tokio::test]
async fn test_supplier_lookup_falls_back_to_metadata_and_writes_back() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(supplier_meta(" P6 "), 0);

    let found = store.get_supplier_id(local).await;

    assert_eq!(found, Some(SupplierProductId::new("P6")));
    assert_eq!(repo.row("P6").unwrap().local_product_id, local);
}

#[tokio::test]
async fn test_lookup_misses_everywhere() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);

    assert_eq!(
        store.get_local_id(&SupplierProductId::new("nope")).await,
        None
    );
    assert_eq!(store.get_supplier_id(local).await, None);
    assert_eq!(store.get_supplier_id(ProductId::new(12345)).await, None);
    assert!(repo.is_empty());
}

#[tokio::test]
async fn test_lookup_uses_metadata_while_table_offline() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(supplier_meta("P9"), 0);
    repo.set_offline(true);

    assert_eq!(
        store.get_local_id(&SupplierProductId::new("P9")).await,
        Some(local)
    );
}

// =============================================================================
// Status, listing and removal
// =============================================================================

#[tokio::test]
async fn test_update_status_requires_existing_row() {
    let (store, _repo, _catalog) = store();

    let updated = store
        .update_status(&SupplierProductId::new("ghost"), SyncStatus::Error)
        .await;

    assert!(!updated);
}

#[tokio::test]
async fn test_update_status_mirrors_into_metadata() {
    let (store, repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);
    let supplier = SupplierProductId::new("P1");
    store
        .map_supplier_to_local(&supplier, local, SyncStatus::Synced)
        .await;

    assert!(store.update_status(&supplier, SyncStatus::Error).await);

    assert_eq!(repo.row("P1").unwrap().sync_status, SyncStatus::Error);
    let product = catalog.product(local).unwrap();
    assert_eq!(
        product.product.meta.get(meta::SYNC_STATUS).map(String::as_str),
        Some("error")
    );
    assert!(product.product.meta.contains_key(meta::LAST_SYNCED));
}

#[tokio::test]
async fn test_list_by_status_filters_and_pages() {
    let (store, _repo, catalog) = store();
    for (id, status) in [
        ("P1", SyncStatus::Synced),
        ("P2", SyncStatus::Error),
        ("P3", SyncStatus::Synced),
        ("P4", SyncStatus::Synced),
    ] {
        let local = catalog.insert_simple(MetaMap::new(), 0);
        store
            .map_supplier_to_local(&SupplierProductId::new(id), local, status)
            .await;
    }

    assert_eq!(store.list_by_status(None, 10, 0).await.len(), 4);
    assert_eq!(
        store
            .list_by_status(Some(SyncStatus::Synced), 10, 0)
            .await
            .len(),
        3
    );
    assert_eq!(
        store
            .list_by_status(Some(SyncStatus::Synced), 2, 2)
            .await
            .len(),
        1
    );

    let errors = store.list_by_status(Some(SyncStatus::Error), 10, 0).await;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].supplier_product_id.as_str(), "P2");

    let counts = store.status_counts().await;
    assert_eq!((counts.synced, counts.error, counts.total), (3, 1, 4));
}

#[tokio::test]
async fn test_remove_reports_whether_row_existed() {
    let (store, _repo, catalog) = store();
    let local = catalog.insert_simple(MetaMap::new(), 0);
    let supplier = SupplierProductId::new("P1");
    store
        .map_supplier_to_local(&supplier, local, SyncStatus::Synced)
        .await;

    assert!(store.remove(&supplier).await);
    assert!(!store.remove(&supplier).await);
}
