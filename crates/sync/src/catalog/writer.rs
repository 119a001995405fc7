//! Writes supplier products into the local catalog.
//!
//! All derived data (taxonomy terms, attributes, defaults, metadata) is
//! resolved before the product itself is touched. Variations are replaced
//! wholesale on every update so the local set always matches the supplier's.
//! The old set is only removed once the new one is in place.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use printbridge_core::{
    AttributeId, CurrencyCode, Price, ProductId, SupplierVariantId, SyncStatus, VariationId,
};
use tracing::{debug, error, info, instrument, warn};

use super::attributes::{extract_attributes, variant_selections};
use super::{
    AttributeSelection, CatalogStore, MetaMap, ProductAttribute, ProductDraft, VariationDraft, meta,
};
use crate::config::ImportSettings;
use crate::error::SyncError;
use crate::mapping::IdMappingStore;
use crate::printify::{PrintifyProduct, SupplierApi, Variant};
use crate::queue::{Task, TaskQueue};

/// Creates and updates local products from supplier payloads.
#[derive(Clone)]
pub struct CatalogWriter {
    catalog: Arc<dyn CatalogStore>,
    mappings: IdMappingStore,
    supplier: Arc<dyn SupplierApi>,
    queue: Arc<dyn TaskQueue>,
    settings: ImportSettings,
    currency: CurrencyCode,
}

impl CatalogWriter {
    /// Create a new catalog writer.
    #[must_use]
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        mappings: IdMappingStore,
        supplier: Arc<dyn SupplierApi>,
        queue: Arc<dyn TaskQueue>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            catalog,
            mappings,
            supplier,
            queue,
            settings,
            currency: CurrencyCode::default(),
        }
    }

    /// Create or update the local product for a supplier product.
    ///
    /// Returns the local product ID. On error a newly created product is
    /// deleted again and an existing product is left as it was before the
    /// call, with its previous variations. The caller records the error status.
    ///
    /// # Errors
    ///
    /// Returns an error if any catalog write fails or the mapping cannot be recorded.
    #[instrument(skip(self, product), fields(supplier_id = %product.id))]
    pub async fn import_or_update(
        &self,
        product: &PrintifyProduct,
    ) -> Result<ProductId, SyncError> {
        if !product.id.is_valid() {
            return Err(SyncError::InvalidProduct("blank product ID".to_string()));
        }

        let existing = self.resolve_existing(product).await?;
        let now = Utc::now();

        let variants: Vec<&Variant> = product.enabled_variants().collect();
        if variants.is_empty() {
            warn!("Supplier product has no enabled variants, importing without variations");
        }

        let attribute_ids = self.ensure_attributes(product).await?;
        let draft = self.build_draft(product, &variants, &attribute_ids, now).await?;

        let (local_id, variations, created) = match existing {
            Some(id) => {
                let variations = self
                    .update_existing(id, product, &variants, &attribute_ids, &draft)
                    .await?;
                (id, variations, false)
            }
            None => {
                let (id, variations) = self
                    .create_new(product, &variants, &attribute_ids, &draft)
                    .await?;
                (id, variations, true)
            }
        };

        if !self
            .mappings
            .map_supplier_to_local(&product.id, local_id, SyncStatus::Synced)
            .await
        {
            return Err(SyncError::Mapping(product.id.clone()));
        }

        self.schedule_images(local_id, product, &variations).await;
        self.register_external(product, local_id).await;

        info!(
            local_id = %local_id,
            created,
            variations = variations.len(),
            "Supplier product written to catalog"
        );
        Ok(local_id)
    }

    /// Mapped local ID, if the product it points to still exists.
    async fn resolve_existing(
        &self,
        product: &PrintifyProduct,
    ) -> Result<Option<ProductId>, SyncError> {
        let Some(local_id) = self.mappings.get_local_id(&product.id).await else {
            return Ok(None);
        };
        if self.catalog.product_exists(local_id).await? {
            return Ok(Some(local_id));
        }
        warn!(local_id = %local_id, "Mapped product no longer exists, creating a new one");
        Ok(None)
    }

    /// Ensure every extracted attribute and its terms exist.
    async fn ensure_attributes(
        &self,
        product: &PrintifyProduct,
    ) -> Result<BTreeMap<String, (AttributeId, Vec<String>)>, SyncError> {
        let mut ensured = BTreeMap::new();
        for (name, values) in extract_attributes(product) {
            let id = self.catalog.ensure_attribute(&name).await?;
            let terms: Vec<String> = values.into_iter().collect();
            self.catalog.ensure_attribute_terms(id, &terms).await?;
            debug!(attribute = %name, attribute_id = %id, terms = terms.len(), "Attribute ensured");
            ensured.insert(name, (id, terms));
        }
        Ok(ensured)
    }

    async fn build_draft(
        &self,
        product: &PrintifyProduct,
        variants: &[&Variant],
        attributes: &BTreeMap<String, (AttributeId, Vec<String>)>,
        now: DateTime<Utc>,
    ) -> Result<ProductDraft, SyncError> {
        let mut category_ids = Vec::new();
        if let Some(product_type) = product
            .product_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        {
            category_ids.push(self.catalog.ensure_category(product_type).await?);
        }

        let tag_names: BTreeSet<&str> = product
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let mut tag_ids = Vec::with_capacity(tag_names.len());
        for name in tag_names {
            tag_ids.push(self.catalog.ensure_tag(name).await?);
        }

        let default_variant = variants
            .iter()
            .find(|v| v.is_default)
            .or_else(|| variants.first());
        let default_attributes = default_variant
            .map(|v| selections(product, v, attributes))
            .unwrap_or_default();

        Ok(ProductDraft {
            name: product.title.clone(),
            description: product.description.clone(),
            sku: product.sku.clone().filter(|s| !s.trim().is_empty()),
            category_ids,
            tag_ids,
            attributes: attributes
                .iter()
                .map(|(name, (id, options))| ProductAttribute {
                    id: *id,
                    name: name.clone(),
                    options: options.clone(),
                })
                .collect(),
            default_attributes,
            meta: self.product_meta(product, now),
        })
    }

    fn product_meta(&self, product: &PrintifyProduct, now: DateTime<Utc>) -> MetaMap {
        let shop_id = product.shop_id.unwrap_or(self.settings.shop_id);
        let mut entries = MetaMap::from([
            (
                meta::SUPPLIER_PRODUCT_ID.to_string(),
                product.id.to_string(),
            ),
            (meta::SHOP_ID.to_string(), shop_id.to_string()),
            (meta::LAST_SYNCED.to_string(), now.to_rfc3339()),
            (meta::IS_SYNCED.to_string(), "1".to_string()),
            (
                meta::SYNC_STATUS.to_string(),
                SyncStatus::Synced.to_string(),
            ),
        ]);
        if let Some(id) = product.blueprint_id {
            entries.insert(meta::BLUEPRINT_ID.to_string(), id.to_string());
        }
        if let Some(id) = product.print_provider_id {
            entries.insert(meta::PRINT_PROVIDER_ID.to_string(), id.to_string());
        }
        if let Some(name) = &product.print_provider_name {
            entries.insert(meta::PRINT_PROVIDER_NAME.to_string(), name.clone());
        }
        entries
    }

    async fn create_new(
        &self,
        product: &PrintifyProduct,
        variants: &[&Variant],
        attributes: &BTreeMap<String, (AttributeId, Vec<String>)>,
        draft: &ProductDraft,
    ) -> Result<(ProductId, HashMap<SupplierVariantId, VariationId>), SyncError> {
        let local_id = self.catalog.create_product(draft).await?;

        let mut variations = HashMap::with_capacity(variants.len());
        let mut written = self
            .create_variations(local_id, product, variants, attributes, &mut variations)
            .await;
        if written.is_ok() && !variations.is_empty() {
            written = self
                .catalog
                .sync_price_range(local_id)
                .await
                .map_err(SyncError::from);
        }
        if let Err(e) = written {
            self.rollback(local_id).await;
            return Err(e);
        }
        Ok((local_id, variations))
    }

    /// Replace the variations of an existing product.
    ///
    /// New variations are written before the product fields. The previous
    /// variations are only deleted once both succeeded.
    async fn update_existing(
        &self,
        local_id: ProductId,
        product: &PrintifyProduct,
        variants: &[&Variant],
        attributes: &BTreeMap<String, (AttributeId, Vec<String>)>,
        draft: &ProductDraft,
    ) -> Result<HashMap<SupplierVariantId, VariationId>, SyncError> {
        let stale = self.catalog.list_variations(local_id).await?;

        let mut variations = HashMap::with_capacity(variants.len());
        let mut written = self
            .create_variations(local_id, product, variants, attributes, &mut variations)
            .await;
        if written.is_ok() {
            written = self
                .catalog
                .update_product(local_id, draft)
                .await
                .map_err(SyncError::from);
        }
        if let Err(e) = written {
            self.discard_variations(local_id, variations.values().copied())
                .await;
            return Err(e);
        }

        for variation in &stale {
            self.catalog.delete_variation(local_id, variation.id).await?;
        }
        debug!(deleted = stale.len(), "Removed superseded variations");

        if !variations.is_empty() {
            self.catalog.sync_price_range(local_id).await?;
        }
        Ok(variations)
    }

    /// Create one variation per enabled variant, recording each as it is written.
    async fn create_variations(
        &self,
        local_id: ProductId,
        product: &PrintifyProduct,
        variants: &[&Variant],
        attributes: &BTreeMap<String, (AttributeId, Vec<String>)>,
        created: &mut HashMap<SupplierVariantId, VariationId>,
    ) -> Result<(), SyncError> {
        for variant in variants {
            let draft = VariationDraft {
                sku: variant.sku.clone().filter(|s| !s.trim().is_empty()),
                regular_price: Price::from_cents(variant.price, self.currency),
                attributes: selections(product, variant, attributes),
                stock_quantity: variant.stock_quantity(),
                meta: MetaMap::from([(
                    meta::SUPPLIER_VARIANT_ID.to_string(),
                    variant.id.to_string(),
                )]),
            };
            let variation_id = self.catalog.create_variation(local_id, &draft).await?;
            created.insert(variant.id, variation_id);
        }
        Ok(())
    }

    async fn discard_variations(
        &self,
        local_id: ProductId,
        variations: impl Iterator<Item = VariationId>,
    ) {
        for variation in variations {
            if let Err(e) = self.catalog.delete_variation(local_id, variation).await {
                warn!(
                    local_id = %local_id,
                    variation_id = %variation,
                    error = %e,
                    "Failed to discard new variation"
                );
            }
        }
    }

    async fn rollback(&self, local_id: ProductId) {
        match self.catalog.delete_product(local_id).await {
            Ok(()) => info!(local_id = %local_id, "Rolled back partially created product"),
            Err(e) => {
                error!(
                    local_id = %local_id,
                    error = %e,
                    "Failed to roll back partially created product"
                );
            }
        }
    }

    /// Queue featured, gallery and variation image imports. Failures are logged only.
    async fn schedule_images(
        &self,
        local_id: ProductId,
        product: &PrintifyProduct,
        variations: &HashMap<SupplierVariantId, VariationId>,
    ) {
        let now = Utc::now();
        let mut tasks = Vec::new();

        let featured = product.featured_image();
        if let Some(image) = featured {
            tasks.push((
                now,
                Task::ImportFeaturedImage {
                    product_id: local_id,
                    src: image.src.clone(),
                },
            ));
        }

        let mut seen: BTreeSet<&str> = featured.map(|i| i.src.as_str()).into_iter().collect();
        let stagger = chrono::Duration::from_std(self.settings.gallery_stagger)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let mut position: u32 = 0;
        for image in &product.images {
            if !seen.insert(image.src.as_str()) {
                continue;
            }
            position += 1;
            tasks.push((
                now + stagger * i32::try_from(position).unwrap_or(i32::MAX),
                Task::ImportGalleryImage {
                    product_id: local_id,
                    src: image.src.clone(),
                    position,
                },
            ));
        }

        for variant in product.enabled_variants() {
            let Some(variation_id) = variations.get(&variant.id) else {
                continue;
            };
            if let Some(image) = product
                .images
                .iter()
                .find(|img| img.variant_ids.contains(&variant.id))
            {
                tasks.push((
                    now,
                    Task::ImportVariationImage {
                        product_id: local_id,
                        variation_id: *variation_id,
                        src: image.src.clone(),
                    },
                ));
            }
        }

        for (run_at, task) in &tasks {
            if let Err(e) = self.queue.schedule(*run_at, task).await {
                warn!(
                    local_id = %local_id,
                    task = task.name(),
                    error = %e,
                    "Failed to schedule image import"
                );
            }
        }
        debug!(local_id = %local_id, scheduled = tasks.len(), "Image imports scheduled");
    }

    /// Tell the supplier which local product this became. Best-effort.
    async fn register_external(&self, product: &PrintifyProduct, local_id: ProductId) {
        let handle = match self.catalog.get_product(local_id).await {
            Ok(Some(local)) => local.permalink.unwrap_or_else(|| local_id.to_string()),
            _ => local_id.to_string(),
        };
        let shop_id = product.shop_id.unwrap_or(self.settings.shop_id);

        if let Err(e) = self
            .supplier
            .register_external_product(shop_id, &product.id, local_id, &handle)
            .await
        {
            warn!(
                local_id = %local_id,
                error = %e,
                "Failed to register external product with supplier"
            );
        }
    }
}

/// A variant's selections with their local attribute IDs.
fn selections(
    product: &PrintifyProduct,
    variant: &Variant,
    attributes: &BTreeMap<String, (AttributeId, Vec<String>)>,
) -> Vec<AttributeSelection> {
    variant_selections(product, variant)
        .into_iter()
        .filter_map(|(name, option)| {
            attributes.get(&name).map(|(id, _)| AttributeSelection {
                id: *id,
                name,
                option,
            })
        })
        .collect()
}
