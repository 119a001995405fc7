//! Local catalog capability interface and the writer that fills it.
//!
//! [`CatalogStore`] is everything the sync engine needs from the store it
//! publishes into: product and variation CRUD, metadata, taxonomy terms,
//! stock fields and image attachment. The WooCommerce adapter implements it
//! over REST; tests implement it in memory.

pub mod attributes;
pub mod writer;

use std::collections::BTreeMap;

use async_trait::async_trait;
use printbridge_core::{
    AttributeId, CategoryId, Price, ProductId, SupplierVariantId, TagId, VariationId,
};
use thiserror::Error;

pub use attributes::{AttributeSet, extract_attributes, variant_selections};
pub use writer::CatalogWriter;

/// Metadata keys written onto local products and variations.
pub mod meta {
    /// Supplier product ID (the fallback lookup key).
    pub const SUPPLIER_PRODUCT_ID: &str = "_printify_product_id";
    pub const BLUEPRINT_ID: &str = "_printify_blueprint_id";
    pub const SHOP_ID: &str = "_printify_shop_id";
    pub const PRINT_PROVIDER_ID: &str = "_printify_print_provider_id";
    pub const PRINT_PROVIDER_NAME: &str = "_printify_print_provider_name";
    pub const LAST_SYNCED: &str = "_printify_last_synced";
    pub const IS_SYNCED: &str = "_printify_is_synced";
    pub const SYNC_STATUS: &str = "_printify_sync_status";
    /// Supplier variant ID, stored on each variation.
    pub const SUPPLIER_VARIANT_ID: &str = "_printify_variant_id";
}

/// Key/value metadata attached to a product or variation.
pub type MetaMap = BTreeMap<String, String>;

/// Errors returned by a [`CatalogStore`].
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product, variation or term does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store rejected the data.
    #[error("invalid catalog data: {0}")]
    Invalid(String),

    /// Transport or storage failure in the backing store.
    #[error("catalog backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Shape of a local product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductKind {
    /// Single SKU, stock held on the product itself.
    Simple,
    /// Parent of variations, stock held per variation.
    #[default]
    Variable,
}

/// Where an attached product image goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    /// Main product image, always first.
    Featured,
    /// Gallery image at a 1-based position after the featured one.
    Gallery(u32),
}

impl ImageSlot {
    /// Insertion index into an image list of length `len`.
    #[must_use]
    pub fn index(self, len: usize) -> usize {
        match self {
            Self::Featured => 0,
            Self::Gallery(position) => usize::try_from(position).map_or(len, |p| p.min(len)),
        }
    }
}

/// An attribute declared on a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductAttribute {
    pub id: AttributeId,
    pub name: String,
    /// Every value used by at least one variation.
    pub options: Vec<String>,
}

/// One attribute value picked by a variation (or as the product default).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelection {
    pub id: AttributeId,
    pub name: String,
    pub option: String,
}

/// Full product data to write on create or update.
#[derive(Debug, Clone, Default)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub sku: Option<String>,
    pub category_ids: Vec<CategoryId>,
    pub tag_ids: Vec<TagId>,
    pub attributes: Vec<ProductAttribute>,
    pub default_attributes: Vec<AttributeSelection>,
    pub meta: MetaMap,
}

/// Data for one variation.
#[derive(Debug, Clone)]
pub struct VariationDraft {
    pub sku: Option<String>,
    pub regular_price: Price,
    /// Empty for a flat variation.
    pub attributes: Vec<AttributeSelection>,
    pub stock_quantity: i64,
    pub meta: MetaMap,
}

/// A product as read back from the store.
#[derive(Debug, Clone)]
pub struct LocalProduct {
    pub id: ProductId,
    pub name: String,
    pub kind: ProductKind,
    pub sku: Option<String>,
    /// `None` when the product does not manage stock.
    pub stock_quantity: Option<i64>,
    /// Public URL, if the store exposes one.
    pub permalink: Option<String>,
    pub meta: MetaMap,
}

impl LocalProduct {
    /// Supplier product ID stored in metadata.
    #[must_use]
    pub fn supplier_product_id(&self) -> Option<&str> {
        self.meta.get(meta::SUPPLIER_PRODUCT_ID).map(String::as_str)
    }
}

/// A variation as read back from the store.
#[derive(Debug, Clone)]
pub struct LocalVariation {
    pub id: VariationId,
    pub sku: Option<String>,
    pub stock_quantity: Option<i64>,
    pub meta: MetaMap,
}

impl LocalVariation {
    /// Supplier variant this variation was created from.
    #[must_use]
    pub fn supplier_variant_id(&self) -> Option<SupplierVariantId> {
        self.meta
            .get(meta::SUPPLIER_VARIANT_ID)
            .and_then(|v| v.trim().parse::<i64>().ok())
            .map(SupplierVariantId::new)
    }
}

/// Local catalog operations the sync engine depends on.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Whether a product with this ID exists.
    async fn product_exists(&self, id: ProductId) -> Result<bool, CatalogError>;

    /// Load a product, or `None` if it does not exist.
    async fn get_product(&self, id: ProductId) -> Result<Option<LocalProduct>, CatalogError>;

    /// Create a variable product and return its ID.
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, CatalogError>;

    /// Overwrite an existing product's fields, attributes and metadata.
    async fn update_product(&self, id: ProductId, draft: &ProductDraft)
    -> Result<(), CatalogError>;

    /// Permanently delete a product and its variations.
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError>;

    /// Read one metadata value.
    async fn get_meta(&self, id: ProductId, key: &str) -> Result<Option<String>, CatalogError>;

    /// Upsert metadata entries by key.
    async fn set_meta(&self, id: ProductId, entries: &MetaMap) -> Result<(), CatalogError>;

    /// Find a product whose metadata `key` equals `value`.
    async fn find_by_meta(&self, key: &str, value: &str) -> Result<Option<ProductId>, CatalogError>;

    /// Get or create a product category by name.
    async fn ensure_category(&self, name: &str) -> Result<CategoryId, CatalogError>;

    /// Get or create a product tag by name.
    async fn ensure_tag(&self, name: &str) -> Result<TagId, CatalogError>;

    /// Get or create a global attribute by name.
    async fn ensure_attribute(&self, name: &str) -> Result<AttributeId, CatalogError>;

    /// Register any missing terms for an attribute.
    async fn ensure_attribute_terms(
        &self,
        attribute: AttributeId,
        terms: &[String],
    ) -> Result<(), CatalogError>;

    /// All variations of a product.
    async fn list_variations(&self, product: ProductId)
    -> Result<Vec<LocalVariation>, CatalogError>;

    /// Create a variation and return its ID.
    async fn create_variation(
        &self,
        product: ProductId,
        draft: &VariationDraft,
    ) -> Result<VariationId, CatalogError>;

    /// Permanently delete a variation.
    async fn delete_variation(
        &self,
        product: ProductId,
        variation: VariationId,
    ) -> Result<(), CatalogError>;

    /// Write a stock quantity to a product (`variation = None`) or one of its
    /// variations. Stock status follows from the quantity.
    async fn set_stock(
        &self,
        product: ProductId,
        variation: Option<VariationId>,
        quantity: i64,
    ) -> Result<(), CatalogError>;

    /// Recompute a variable product's price range from its variations.
    async fn sync_price_range(&self, product: ProductId) -> Result<(), CatalogError>;

    /// Attach an image by URL at `slot`. Images already attached are kept.
    async fn attach_product_image(
        &self,
        product: ProductId,
        src: &str,
        slot: ImageSlot,
    ) -> Result<(), CatalogError>;

    /// Attach an image by URL to one variation.
    async fn attach_variation_image(
        &self,
        product: ProductId,
        variation: VariationId,
        src: &str,
    ) -> Result<(), CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supplier_variant_id_from_meta() {
        let mut meta = MetaMap::new();
        meta.insert(meta::SUPPLIER_VARIANT_ID.to_string(), "12100".to_string());
        let variation = LocalVariation {
            id: VariationId::new(1),
            sku: None,
            stock_quantity: Some(3),
            meta,
        };
        assert_eq!(
            variation.supplier_variant_id(),
            Some(SupplierVariantId::new(12100))
        );
    }

    #[test]
    fn test_supplier_variant_id_missing_or_garbage() {
        let mut variation = LocalVariation {
            id: VariationId::new(1),
            sku: None,
            stock_quantity: None,
            meta: MetaMap::new(),
        };
        assert_eq!(variation.supplier_variant_id(), None);

        variation
            .meta
            .insert(meta::SUPPLIER_VARIANT_ID.to_string(), "abc".to_string());
        assert_eq!(variation.supplier_variant_id(), None);
    }

    #[test]
    fn test_image_slot_index() {
        assert_eq!(ImageSlot::Featured.index(3), 0);
        assert_eq!(ImageSlot::Gallery(1).index(3), 1);
        // Earlier images not attached yet
        assert_eq!(ImageSlot::Gallery(4).index(2), 2);
        assert_eq!(ImageSlot::Gallery(2).index(0), 0);
    }

    #[test]
    fn test_catalog_error_display() {
        let err = CatalogError::NotFound("product 7".to_string());
        assert_eq!(err.to_string(), "not found: product 7");
    }
}
