//! Printify stand-in.

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use printbridge_core::{ProductId, ShopId, SupplierProductId};
use printbridge_sync::printify::{PrintifyError, PrintifyProduct, ProductPage, SupplierApi};

use crate::lock;

/// Serves a fixed product list with Printify's paging. Counts listing calls
/// and remembers external-product registrations.
#[derive(Default)]
pub struct FakeSupplier {
    products: Mutex<Vec<PrintifyProduct>>,
    broken: Mutex<BTreeSet<SupplierProductId>>,
    registered: Mutex<Vec<(SupplierProductId, ProductId, String)>>,
    list_calls: AtomicUsize,
    listing_down: AtomicBool,
}

impl FakeSupplier {
    /// Add a product, replacing any product with the same ID.
    pub fn add(&self, product: PrintifyProduct) {
        let mut products = lock(&self.products);
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    /// Add `count` plain products with IDs `P1`, `P2`, ...
    pub fn add_plain(&self, count: usize) {
        for n in 1..=count {
            self.add(crate::fixtures::plain_product(&format!("P{n}")));
        }
    }

    /// Make `get_product` fail for `id`.
    pub fn break_product(&self, id: &str) {
        lock(&self.broken).insert(SupplierProductId::new(id));
    }

    /// Make `get_products` fail.
    pub fn set_listing_down(&self, down: bool) {
        self.listing_down.store(down, Ordering::SeqCst);
    }

    /// Number of `get_products` calls so far.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn registered(&self) -> Vec<(SupplierProductId, ProductId, String)> {
        lock(&self.registered).clone()
    }
}

#[async_trait]
impl SupplierApi for FakeSupplier {
    async fn get_products(
        &self,
        _shop_id: ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, PrintifyError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.listing_down.load(Ordering::SeqCst) {
            return Err(PrintifyError::Api {
                status: 503,
                message: "Service Unavailable".to_string(),
            });
        }

        let products = lock(&self.products);
        let limit = limit.max(1) as usize;
        let total = products.len();
        let start = (page.max(1) as usize - 1) * limit;
        let data = products.iter().skip(start).take(limit).cloned().collect();

        Ok(ProductPage {
            current_page: page,
            last_page: u32::try_from(total.div_ceil(limit).max(1)).unwrap_or(u32::MAX),
            data,
        })
    }

    async fn get_product(
        &self,
        _shop_id: ShopId,
        product_id: &SupplierProductId,
    ) -> Result<PrintifyProduct, PrintifyError> {
        if lock(&self.broken).contains(product_id) {
            return Err(PrintifyError::Api {
                status: 500,
                message: "Internal Server Error".to_string(),
            });
        }
        lock(&self.products)
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
            .ok_or_else(|| PrintifyError::NotFound(format!("product {product_id}")))
    }

    async fn register_external_product(
        &self,
        _shop_id: ShopId,
        product_id: &SupplierProductId,
        local_id: ProductId,
        handle: &str,
    ) -> Result<(), PrintifyError> {
        lock(&self.registered).push((product_id.clone(), local_id, handle.to_string()));
        Ok(())
    }
}
