//! Integration tests for the consistency pass run after each import.

#![allow(clippy::unwrap_used)]

use printbridge_core::{ProductId, SupplierProductId, SyncStatus};
use printbridge_integration_tests::TestContext;
use printbridge_sync::catalog::meta;
use printbridge_sync::import::ImportValidator;
use printbridge_sync::mapping::IdMappingStore;

fn validator(ctx: &TestContext) -> ImportValidator {
    let mappings = IdMappingStore::new(ctx.mappings.clone(), ctx.catalog.clone());
    ImportValidator::new(mappings, ctx.catalog.clone())
}

async fn import_plain(ctx: &TestContext, count: usize) {
    ctx.supplier.add_plain(count);
    for n in 1..=count {
        ctx.pipeline
            .scheduler
            .sync_product(&SupplierProductId::new(format!("P{n}")))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_orphaned_mappings_are_removed() {
    let ctx = TestContext::new();
    import_plain(&ctx, 3).await;
    let gone = ctx.mappings.row("P2").unwrap().local_product_id;
    ctx.catalog.remove_product(gone);

    validator(&ctx).run().await;

    assert_eq!(ctx.mappings.len(), 2);
    assert!(ctx.mappings.row("P2").is_none());
    assert!(ctx.mappings.row("P1").is_some());
}

#[tokio::test]
async fn test_drifted_metadata_is_repaired() {
    let ctx = TestContext::new();
    import_plain(&ctx, 1).await;
    let local = ctx.mappings.row("P1").unwrap().local_product_id;
    ctx.catalog
        .put_meta(local, meta::SUPPLIER_PRODUCT_ID, "somebody-else");

    validator(&ctx).run().await;

    let product = ctx.catalog.product(local).unwrap();
    assert_eq!(product.product.supplier_product_id(), Some("P1"));
    assert_eq!(ctx.mappings.len(), 1);
}

#[tokio::test]
async fn test_consistent_state_is_untouched() {
    let ctx = TestContext::new();
    import_plain(&ctx, 2).await;
    let before = ctx.mappings.row("P1").unwrap();

    validator(&ctx).run().await;

    assert_eq!(ctx.mappings.len(), 2);
    assert_eq!(ctx.mappings.row("P1").unwrap(), before);
}

#[tokio::test]
async fn test_validation_runs_when_import_completes() {
    let ctx = TestContext::new();
    ctx.supplier.add_plain(2);
    ctx.pipeline
        .mappings
        .map_supplier_to_local(
            &SupplierProductId::new("retired"),
            ProductId::new(9_999),
            SyncStatus::Synced,
        )
        .await;
    assert!(ctx.mappings.row("retired").is_some());

    ctx.pipeline.scheduler.start(false, false).await;
    ctx.drain().await;

    assert!(ctx.mappings.row("retired").is_none());
    assert_eq!(ctx.mappings.len(), 2);
}

#[tokio::test]
async fn test_validation_skips_when_mappings_unavailable() {
    let ctx = TestContext::new();
    import_plain(&ctx, 1).await;
    let local = ctx.mappings.row("P1").unwrap().local_product_id;
    ctx.catalog.remove_product(local);
    ctx.mappings.set_offline(true);

    validator(&ctx).run().await;

    ctx.mappings.set_offline(false);
    assert!(ctx.mappings.row("P1").is_some());
}
