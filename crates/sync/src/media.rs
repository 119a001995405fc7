//! Image import tasks.
//!
//! Images are attached from their supplier URLs after the product data is
//! written, one task per image. A failed attachment is logged and dropped.

use std::sync::Arc;

use printbridge_core::{ProductId, VariationId};
use tracing::{debug, instrument, warn};

use crate::catalog::{CatalogError, CatalogStore, ImageSlot};

/// Attaches supplier images to local products and variations.
#[derive(Clone)]
pub struct MediaImporter {
    catalog: Arc<dyn CatalogStore>,
}

impl MediaImporter {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    #[instrument(skip(self, src), fields(local_id = %product))]
    pub async fn import_featured(&self, product: ProductId, src: &str) {
        let result = self.attach(product, src, ImageSlot::Featured).await;
        log_outcome(result, "featured", src);
    }

    /// Gallery images keep their supplier order whichever task runs first.
    #[instrument(skip(self, src), fields(local_id = %product))]
    pub async fn import_gallery(&self, product: ProductId, src: &str, position: u32) {
        let result = self.attach(product, src, ImageSlot::Gallery(position)).await;
        log_outcome(result, "gallery", src);
    }

    #[instrument(skip(self, src), fields(local_id = %product, variation_id = %variation))]
    pub async fn import_variation(&self, product: ProductId, variation: VariationId, src: &str) {
        let result = match self.catalog.product_exists(product).await {
            Ok(true) => self
                .catalog
                .attach_variation_image(product, variation, src)
                .await
                .map(|()| true),
            Ok(false) => Ok(false),
            Err(e) => Err(e),
        };
        log_outcome(result, "variation", src);
    }

    /// Attach unless the product was deleted since the task was scheduled.
    async fn attach(
        &self,
        product: ProductId,
        src: &str,
        slot: ImageSlot,
    ) -> Result<bool, CatalogError> {
        if !self.catalog.product_exists(product).await? {
            return Ok(false);
        }
        self.catalog.attach_product_image(product, src, slot).await?;
        Ok(true)
    }
}

fn log_outcome(result: Result<bool, CatalogError>, kind: &str, src: &str) {
    match result {
        Ok(true) => debug!(kind, src, "Image attached"),
        Ok(false) => debug!(kind, src, "Product gone, image skipped"),
        Err(e) => warn!(kind, src, error = %e, "Image import failed"),
    }
}
