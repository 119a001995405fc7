//! Printify (supplier) API integration.
//!
//! Provides the [`SupplierApi`] seam the import pipeline talks to, plus the
//! REST implementation in [`client`].
//!
//! # Architecture
//!
//! - Product list and detail are plain REST v1 calls with a bearer token
//! - Blueprint and print-provider titles are looked up best-effort and cached
//! - Publishing an external ID tells Printify which local product a supplier product became

pub mod client;
pub mod types;

pub use client::PrintifyClient;
pub use types::*;

use async_trait::async_trait;
use printbridge_core::{ProductId, ShopId, SupplierProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the Printify API.
#[derive(Debug, Error)]
pub enum PrintifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Printify returned a non-success status.
    #[error("Printify API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Printify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Supplier operations the sync pipeline depends on.
#[async_trait]
pub trait SupplierApi: Send + Sync {
    /// Fetch one page of the shop's products.
    async fn get_products(
        &self,
        shop_id: ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, PrintifyError>;

    /// Fetch full detail for one product.
    async fn get_product(
        &self,
        shop_id: ShopId,
        product_id: &SupplierProductId,
    ) -> Result<PrintifyProduct, PrintifyError>;

    /// Tell the supplier which local product a supplier product was published as.
    async fn register_external_product(
        &self,
        shop_id: ShopId,
        product_id: &SupplierProductId,
        local_id: ProductId,
        handle: &str,
    ) -> Result<(), PrintifyError>;
}
