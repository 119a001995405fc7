//! In-memory WooCommerce stand-in.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use printbridge_core::{AttributeId, CategoryId, ProductId, StockStatus, TagId, VariationId};
use printbridge_sync::catalog::{
    CatalogError, CatalogStore, ImageSlot, LocalProduct, LocalVariation, MetaMap, ProductDraft,
    ProductKind, VariationDraft,
};

use crate::lock;

/// A product as held by [`MemoryCatalog`].
#[derive(Debug, Clone)]
pub struct StoredProduct {
    pub product: LocalProduct,
    pub draft: ProductDraft,
    pub variations: BTreeMap<VariationId, StoredVariation>,
    /// Featured image first, then the gallery.
    pub images: Vec<String>,
}

impl StoredProduct {
    /// Variations ordered by creation.
    #[must_use]
    pub fn variation_list(&self) -> Vec<&StoredVariation> {
        self.variations.values().collect()
    }
}

#[derive(Debug, Clone)]
pub struct StoredVariation {
    pub id: VariationId,
    pub draft: VariationDraft,
    pub stock_quantity: i64,
    pub image: Option<String>,
}

impl StoredVariation {
    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_quantity(self.stock_quantity)
    }

    /// Option chosen for attribute `name`, if any.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&str> {
        self.draft
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.option.as_str())
    }
}

#[derive(Default)]
struct CatalogState {
    next_id: i64,
    products: BTreeMap<ProductId, StoredProduct>,
    categories: BTreeMap<String, CategoryId>,
    tags: BTreeMap<String, TagId>,
    attributes: BTreeMap<String, AttributeId>,
    terms: BTreeMap<AttributeId, BTreeSet<String>>,
}

impl CatalogState {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn product_mut(&mut self, id: ProductId) -> Result<&mut StoredProduct, CatalogError> {
        self.products
            .get_mut(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("product {id}")))
    }
}

/// Catalog kept in memory. Counts stock writes and can be told to fail
/// variation creation.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
    stock_writes: AtomicUsize,
    /// Variations still allowed before `create_variation` starts failing.
    variation_budget: Mutex<Option<usize>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<StoredProduct> {
        lock(&self.state).products.get(&id).cloned()
    }

    #[must_use]
    pub fn product_count(&self) -> usize {
        lock(&self.state).products.len()
    }

    /// Number of `set_stock` calls so far.
    #[must_use]
    pub fn stock_writes(&self) -> usize {
        self.stock_writes.load(Ordering::SeqCst)
    }

    /// Make every `create_variation` fail until reset.
    pub fn fail_variations(&self, fail: bool) {
        *lock(&self.variation_budget) = fail.then_some(0);
    }

    /// Let `allowed` more variations through, then fail the rest.
    pub fn fail_variations_after(&self, allowed: usize) {
        *lock(&self.variation_budget) = Some(allowed);
    }

    /// Delete a product behind the sync engine's back.
    pub fn remove_product(&self, id: ProductId) {
        lock(&self.state).products.remove(&id);
    }

    /// Overwrite one metadata entry behind the sync engine's back.
    pub fn put_meta(&self, id: ProductId, key: &str, value: &str) {
        if let Some(product) = lock(&self.state).products.get_mut(&id) {
            product
                .product
                .meta
                .insert(key.to_string(), value.to_string());
        }
    }

    /// Insert a simple product with managed stock.
    pub fn insert_simple(&self, meta: MetaMap, stock_quantity: i64) -> ProductId {
        let mut state = lock(&self.state);
        let id = ProductId::new(state.allocate());
        state.products.insert(
            id,
            StoredProduct {
                product: LocalProduct {
                    id,
                    name: format!("Simple {id}"),
                    kind: ProductKind::Simple,
                    sku: None,
                    stock_quantity: Some(stock_quantity),
                    permalink: None,
                    meta,
                },
                draft: ProductDraft::default(),
                variations: BTreeMap::new(),
                images: Vec::new(),
            },
        );
        id
    }

    /// Names of every category created so far.
    #[must_use]
    pub fn category_names(&self) -> Vec<String> {
        lock(&self.state).categories.keys().cloned().collect()
    }

    /// Terms registered for attribute `name`.
    #[must_use]
    pub fn attribute_terms(&self, name: &str) -> BTreeSet<String> {
        let state = lock(&self.state);
        state
            .attributes
            .get(name)
            .and_then(|id| state.terms.get(id))
            .cloned()
            .unwrap_or_default()
    }
}

fn get_or_insert<T: Copy>(
    map: &mut BTreeMap<String, T>,
    name: &str,
    make: impl FnOnce() -> T,
) -> T {
    *map.entry(name.to_string()).or_insert_with(make)
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn product_exists(&self, id: ProductId) -> Result<bool, CatalogError> {
        Ok(lock(&self.state).products.contains_key(&id))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<LocalProduct>, CatalogError> {
        Ok(lock(&self.state)
            .products
            .get(&id)
            .map(|p| p.product.clone()))
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, CatalogError> {
        let mut state = lock(&self.state);
        let id = ProductId::new(state.allocate());
        state.products.insert(
            id,
            StoredProduct {
                product: LocalProduct {
                    id,
                    name: draft.name.clone(),
                    kind: ProductKind::Variable,
                    sku: draft.sku.clone(),
                    stock_quantity: None,
                    permalink: Some(format!("https://shop.test/?p={id}")),
                    meta: draft.meta.clone(),
                },
                draft: draft.clone(),
                variations: BTreeMap::new(),
                images: Vec::new(),
            },
        );
        Ok(id)
    }

    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<(), CatalogError> {
        let mut state = lock(&self.state);
        let stored = state.product_mut(id)?;
        stored.product.name.clone_from(&draft.name);
        stored.product.sku.clone_from(&draft.sku);
        stored
            .product
            .meta
            .extend(draft.meta.iter().map(|(k, v)| (k.clone(), v.clone())));
        stored.draft = draft.clone();
        Ok(())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        lock(&self.state)
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound(format!("product {id}")))
    }

    async fn get_meta(&self, id: ProductId, key: &str) -> Result<Option<String>, CatalogError> {
        let state = lock(&self.state);
        let product = state
            .products
            .get(&id)
            .ok_or_else(|| CatalogError::NotFound(format!("product {id}")))?;
        Ok(product.product.meta.get(key).cloned())
    }

    async fn set_meta(&self, id: ProductId, entries: &MetaMap) -> Result<(), CatalogError> {
        let mut state = lock(&self.state);
        let stored = state.product_mut(id)?;
        stored
            .product
            .meta
            .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn find_by_meta(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<ProductId>, CatalogError> {
        Ok(lock(&self.state)
            .products
            .values()
            .find(|p| p.product.meta.get(key).is_some_and(|v| v == value))
            .map(|p| p.product.id))
    }

    async fn ensure_category(&self, name: &str) -> Result<CategoryId, CatalogError> {
        let mut state = lock(&self.state);
        let next = state.allocate();
        Ok(get_or_insert(&mut state.categories, name, || {
            CategoryId::new(next)
        }))
    }

    async fn ensure_tag(&self, name: &str) -> Result<TagId, CatalogError> {
        let mut state = lock(&self.state);
        let next = state.allocate();
        Ok(get_or_insert(&mut state.tags, name, || TagId::new(next)))
    }

    async fn ensure_attribute(&self, name: &str) -> Result<AttributeId, CatalogError> {
        let mut state = lock(&self.state);
        let next = state.allocate();
        Ok(get_or_insert(&mut state.attributes, name, || {
            AttributeId::new(next)
        }))
    }

    async fn ensure_attribute_terms(
        &self,
        attribute: AttributeId,
        terms: &[String],
    ) -> Result<(), CatalogError> {
        lock(&self.state)
            .terms
            .entry(attribute)
            .or_default()
            .extend(terms.iter().cloned());
        Ok(())
    }

    async fn list_variations(
        &self,
        product: ProductId,
    ) -> Result<Vec<LocalVariation>, CatalogError> {
        let state = lock(&self.state);
        let stored = state
            .products
            .get(&product)
            .ok_or_else(|| CatalogError::NotFound(format!("product {product}")))?;
        Ok(stored
            .variations
            .values()
            .map(|v| LocalVariation {
                id: v.id,
                sku: v.draft.sku.clone(),
                stock_quantity: Some(v.stock_quantity),
                meta: v.draft.meta.clone(),
            })
            .collect())
    }

    async fn create_variation(
        &self,
        product: ProductId,
        draft: &VariationDraft,
    ) -> Result<VariationId, CatalogError> {
        let rejected = match lock(&self.variation_budget).as_mut() {
            Some(remaining) if *remaining == 0 => true,
            Some(remaining) => {
                *remaining -= 1;
                false
            }
            None => false,
        };
        if rejected {
            return Err(CatalogError::Invalid("variation rejected".to_string()));
        }
        let mut state = lock(&self.state);
        let id = VariationId::new(state.allocate());
        state.product_mut(product)?.variations.insert(
            id,
            StoredVariation {
                id,
                draft: draft.clone(),
                stock_quantity: draft.stock_quantity,
                image: None,
            },
        );
        Ok(id)
    }

    async fn delete_variation(
        &self,
        product: ProductId,
        variation: VariationId,
    ) -> Result<(), CatalogError> {
        lock(&self.state)
            .product_mut(product)?
            .variations
            .remove(&variation)
            .map(|_| ())
            .ok_or_else(|| CatalogError::NotFound(format!("variation {variation}")))
    }

    async fn set_stock(
        &self,
        product: ProductId,
        variation: Option<VariationId>,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        self.stock_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = lock(&self.state);
        let stored = state.product_mut(product)?;
        match variation {
            Some(variation) => {
                let entry = stored
                    .variations
                    .get_mut(&variation)
                    .ok_or_else(|| CatalogError::NotFound(format!("variation {variation}")))?;
                entry.stock_quantity = quantity;
            }
            None => stored.product.stock_quantity = Some(quantity),
        }
        Ok(())
    }

    async fn sync_price_range(&self, product: ProductId) -> Result<(), CatalogError> {
        lock(&self.state).product_mut(product).map(|_| ())
    }

    async fn attach_product_image(
        &self,
        product: ProductId,
        src: &str,
        slot: ImageSlot,
    ) -> Result<(), CatalogError> {
        let mut state = lock(&self.state);
        let images = &mut state.product_mut(product)?.images;
        images.insert(slot.index(images.len()), src.to_string());
        Ok(())
    }

    async fn attach_variation_image(
        &self,
        product: ProductId,
        variation: VariationId,
        src: &str,
    ) -> Result<(), CatalogError> {
        let mut state = lock(&self.state);
        let entry = state
            .product_mut(product)?
            .variations
            .get_mut(&variation)
            .ok_or_else(|| CatalogError::NotFound(format!("variation {variation}")))?;
        entry.image = Some(src.to_string());
        Ok(())
    }
}
