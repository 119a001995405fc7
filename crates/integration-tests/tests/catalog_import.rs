//! Integration tests for writing supplier products into the catalog.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::BTreeSet;

use printbridge_core::{StockStatus, SupplierProductId, SyncStatus};
use printbridge_integration_tests::{QueuedStatus, TestContext, fixtures};
use printbridge_sync::SyncError;
use printbridge_sync::catalog::meta;

fn sizes(ctx: &TestContext, id: printbridge_core::ProductId) -> BTreeSet<String> {
    ctx.catalog
        .product(id)
        .unwrap()
        .variations
        .values()
        .filter_map(|v| v.option("Size").map(str::to_string))
        .collect()
}

// =============================================================================
// Fresh import
// =============================================================================

#[tokio::test]
async fn test_import_creates_variable_product_with_stock() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    assert_eq!(ctx.catalog.product_count(), 1);
    let product = ctx.catalog.product(local).unwrap();
    assert_eq!(product.product.name, "Classic Tee");

    // Only enabled variants become variations
    let variations = product.variation_list();
    assert_eq!(variations.len(), 2);

    let small = variations
        .iter()
        .find(|v| v.option("Size") == Some("S"))
        .unwrap();
    assert_eq!(small.option("Color"), Some("Red"));
    assert_eq!(small.stock_quantity, 5);
    assert_eq!(small.stock_status(), StockStatus::InStock);
    assert_eq!(small.draft.regular_price.to_plain_string(), "20.00");
    assert_eq!(small.draft.sku.as_deref(), Some("P1-S-RED"));

    let medium = variations
        .iter()
        .find(|v| v.option("Size") == Some("M"))
        .unwrap();
    assert_eq!(medium.stock_quantity, 0);
    assert_eq!(medium.stock_status(), StockStatus::OutOfStock);
    assert_eq!(medium.draft.regular_price.to_plain_string(), "22.00");
    assert_eq!(
        medium
            .draft
            .meta
            .get(meta::SUPPLIER_VARIANT_ID)
            .map(String::as_str),
        Some("102")
    );
}

#[tokio::test]
async fn test_import_writes_product_metadata_and_taxonomy() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    let product = ctx.catalog.product(local).unwrap();
    let meta_value = |key: &str| product.product.meta.get(key).cloned();
    assert_eq!(meta_value(meta::SUPPLIER_PRODUCT_ID).as_deref(), Some("P1"));
    assert_eq!(meta_value(meta::BLUEPRINT_ID).as_deref(), Some("6"));
    assert_eq!(meta_value(meta::PRINT_PROVIDER_ID).as_deref(), Some("99"));
    assert_eq!(meta_value(meta::SHOP_ID).as_deref(), Some("42"));
    assert_eq!(
        meta_value(meta::PRINT_PROVIDER_NAME).as_deref(),
        Some("Monster Digital")
    );
    assert_eq!(meta_value(meta::IS_SYNCED).as_deref(), Some("1"));
    assert!(meta_value(meta::LAST_SYNCED).is_some());

    assert_eq!(ctx.catalog.category_names(), vec!["T-Shirts".to_string()]);
    // "Summer" appears twice in the fixture
    assert_eq!(product.draft.tag_ids.len(), 2);

    // Disabled L / Red contributes no term
    assert_eq!(
        ctx.catalog.attribute_terms("Size"),
        BTreeSet::from(["M".to_string(), "S".to_string()])
    );

    let defaults: Vec<_> = product
        .draft
        .default_attributes
        .iter()
        .map(|a| (a.name.as_str(), a.option.as_str()))
        .collect();
    assert!(defaults.contains(&("Size", "S")));
    assert!(defaults.contains(&("Color", "Red")));
}

#[tokio::test]
async fn test_import_maps_and_registers_product() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    let row = ctx.mappings.row("P1").unwrap();
    assert_eq!(row.local_product_id, local);
    assert_eq!(row.sync_status, SyncStatus::Synced);

    let registered = ctx.supplier.registered();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].0.as_str(), "P1");
    assert_eq!(registered[0].1, local);
    assert_eq!(registered[0].2, format!("https://shop.test/?p={local}"));
}

#[tokio::test]
async fn test_import_schedules_images_separately() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    // Nothing attached until the media tasks run
    assert!(ctx.catalog.product(local).unwrap().images.is_empty());
    assert_eq!(ctx.queue.named("import_featured_image").len(), 1);
    assert_eq!(ctx.queue.named("import_gallery_image").len(), 1);
    assert_eq!(ctx.queue.named("import_variation_image").len(), 2);

    ctx.drain().await;

    let product = ctx.catalog.product(local).unwrap();
    assert_eq!(
        product.images,
        vec![
            "https://images.printify.test/P1/front.png".to_string(),
            "https://images.printify.test/P1/back.png".to_string(),
        ]
    );
    for variation in product.variation_list() {
        assert_eq!(
            variation.image.as_deref(),
            Some("https://images.printify.test/P1/front.png")
        );
    }
}

#[tokio::test]
async fn test_late_featured_image_keeps_gallery() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    let front = "https://images.printify.test/P1/front.png";
    let back = "https://images.printify.test/P1/back.png";
    ctx.pipeline.media.import_gallery(local, back, 1).await;
    ctx.pipeline.media.import_featured(local, front).await;

    assert_eq!(
        ctx.catalog.product(local).unwrap().images,
        vec![front.to_string(), back.to_string()]
    );
}

#[tokio::test]
async fn test_image_task_for_deleted_product_is_skipped() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    ctx.catalog.remove_product(local);
    ctx.drain().await;

    // Skipped media tasks still complete
    assert_eq!(
        ctx.queue
            .count("import_featured_image", QueuedStatus::Done),
        1
    );
    assert_eq!(ctx.catalog.product_count(), 0);
}

// =============================================================================
// Re-import
// =============================================================================

#[tokio::test]
async fn test_reimport_updates_same_product() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let first = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    let mut renamed = fixtures::tee_shirt("P1");
    renamed.title = "Classic Tee v2".to_string();
    ctx.supplier.add(renamed);
    let second = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.catalog.product_count(), 1);
    assert_eq!(
        ctx.catalog.product(first).unwrap().product.name,
        "Classic Tee v2"
    );
    assert_eq!(ctx.mappings.len(), 1);
}

#[tokio::test]
async fn test_reimport_replaces_variations() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt_three_sizes("P1"));

    let local = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();
    let before: BTreeSet<_> = ctx
        .catalog
        .product(local)
        .unwrap()
        .variations
        .keys()
        .copied()
        .collect();
    assert_eq!(before.len(), 3);

    // L / Red is disabled again
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    let product = ctx.catalog.product(local).unwrap();
    assert_eq!(product.variations.len(), 2);
    assert!(product.variations.keys().all(|v| !before.contains(v)));
    assert_eq!(
        sizes(&ctx, local),
        BTreeSet::from(["M".to_string(), "S".to_string()])
    );
}

#[tokio::test]
async fn test_reimport_recreates_deleted_product() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let first = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();
    ctx.catalog.remove_product(first);

    let second = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    assert_ne!(first, second);
    assert_eq!(ctx.catalog.product_count(), 1);
    assert_eq!(ctx.mappings.row("P1").unwrap().local_product_id, second);
}

#[tokio::test]
async fn test_import_adopts_product_found_by_metadata() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt("P1"));

    let first = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();
    ctx.mappings.forget("P1");

    let second = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.catalog.product_count(), 1);
}

// =============================================================================
// Variant shapes
// =============================================================================

#[tokio::test]
async fn test_product_without_enabled_variants_has_no_variations() {
    let ctx = TestContext::new();
    let mut product = fixtures::plain_product("P1");
    for variant in &mut product.variants {
        variant.is_enabled = false;
    }
    ctx.supplier.add(product);

    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    let stored = ctx.catalog.product(local).unwrap();
    assert_eq!(stored.product.name, "Product P1");
    assert!(stored.variations.is_empty());
    assert!(ctx.queue.named("import_variation_image").is_empty());
    assert_eq!(
        ctx.mappings.row("P1").unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn test_variants_without_options_become_flat_variations() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::flat_product("P1"));

    let local = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await
        .unwrap();

    let stored = ctx.catalog.product(local).unwrap();
    assert!(stored.draft.attributes.is_empty());
    assert!(stored.draft.default_attributes.is_empty());

    let variations = stored.variation_list();
    assert_eq!(variations.len(), 2);
    assert!(variations.iter().all(|v| v.draft.attributes.is_empty()));

    let prices: BTreeSet<String> = variations
        .iter()
        .map(|v| v.draft.regular_price.to_plain_string())
        .collect();
    assert_eq!(
        prices,
        BTreeSet::from(["12.00".to_string(), "18.00".to_string()])
    );
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failed_variations_roll_back_new_product() {
    let ctx = TestContext::new();
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    ctx.catalog.fail_variations(true);

    let result = ctx
        .pipeline
        .scheduler
        .sync_product(&SupplierProductId::new("P1"))
        .await;

    assert!(matches!(result, Err(SyncError::Catalog(_))));
    assert_eq!(ctx.catalog.product_count(), 0);
    assert!(ctx.mappings.row("P1").is_none());
    assert!(ctx.queue.all().is_empty());
}

#[tokio::test]
async fn test_failed_update_keeps_product_and_marks_error() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    let local = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    let before: BTreeSet<_> = ctx
        .catalog
        .product(local)
        .unwrap()
        .variations
        .keys()
        .copied()
        .collect();

    let mut renamed = fixtures::tee_shirt("P1");
    renamed.title = "Renamed Tee".to_string();
    ctx.supplier.add(renamed);
    ctx.catalog.fail_variations(true);
    let result = ctx.pipeline.scheduler.sync_product(&id).await;

    assert!(result.is_err());
    let product = ctx.catalog.product(local).unwrap();
    assert_eq!(product.product.name, "Classic Tee");
    assert_eq!(product.variations.len(), 2);
    assert!(product.variations.keys().all(|v| before.contains(v)));
    assert_eq!(
        ctx.mappings.row("P1").unwrap().sync_status,
        SyncStatus::Error
    );
}

#[tokio::test]
async fn test_partial_variation_failure_discards_new_variations() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    let local = ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    // Second of three new variations is rejected
    let mut grown = fixtures::tee_shirt_three_sizes("P1");
    grown.title = "Classic Tee v2".to_string();
    ctx.supplier.add(grown);
    ctx.catalog.fail_variations_after(1);
    let result = ctx.pipeline.scheduler.sync_product(&id).await;

    assert!(matches!(result, Err(SyncError::Catalog(_))));
    let product = ctx.catalog.product(local).unwrap();
    assert_eq!(product.product.name, "Classic Tee");
    assert_eq!(product.variations.len(), 2);
    assert_eq!(
        sizes(&ctx, local),
        BTreeSet::from(["M".to_string(), "S".to_string()])
    );

    // The next successful run replaces them as usual
    ctx.catalog.fail_variations(false);
    ctx.pipeline.scheduler.sync_product(&id).await.unwrap();
    assert_eq!(ctx.catalog.product(local).unwrap().variations.len(), 3);
    assert_eq!(
        ctx.mappings.row("P1").unwrap().sync_status,
        SyncStatus::Synced
    );
}

#[tokio::test]
async fn test_supplier_failure_marks_error() {
    let ctx = TestContext::new();
    let id = SupplierProductId::new("P1");
    ctx.supplier.add(fixtures::tee_shirt("P1"));
    ctx.pipeline.scheduler.sync_product(&id).await.unwrap();

    ctx.supplier.break_product("P1");
    let result = ctx.pipeline.scheduler.sync_product(&id).await;

    assert!(matches!(result, Err(SyncError::Supplier(_))));
    assert_eq!(
        ctx.mappings.row("P1").unwrap().sync_status,
        SyncStatus::Error
    );
}
