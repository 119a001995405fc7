//! Printify REST API client.
//!
//! Provides typed access to the product endpoints the import pipeline needs.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use printbridge_core::{BlueprintId, PrintProviderId, ProductId, ShopId, SupplierProductId};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::types::{
    Blueprint, ExternalProduct, PrintProvider, PrintifyProduct, ProductPage, PublishingSucceeded,
};
use super::{PrintifyError, SupplierApi};
use crate::config::PrintifyConfig;

/// Fallback when a 429 carries no usable `Retry-After` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Catalog titles rarely change; cache them for the lifetime of a worker.
const TITLE_CACHE_TTL: Duration = Duration::from_secs(6 * 60 * 60);

fn title_cache<K>() -> Cache<K, String>
where
    K: Hash + Eq + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(1_000)
        .time_to_live(TITLE_CACHE_TTL)
        .build()
}

/// Printify REST API client.
///
/// Cheap to clone; clones share the HTTP connection pool and title caches.
#[derive(Clone)]
pub struct PrintifyClient {
    inner: Arc<PrintifyClientInner>,
}

struct PrintifyClientInner {
    client: reqwest::Client,
    base_url: Url,
    api_token: SecretString,
    blueprint_titles: Cache<BlueprintId, String>,
    provider_titles: Cache<PrintProviderId, String>,
}

impl PrintifyClient {
    /// Create a new Printify API client.
    ///
    /// # Errors
    ///
    /// Returns `PrintifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &PrintifyConfig) -> Result<Self, PrintifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("printbridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(PrintifyClientInner {
                client,
                base_url: config.api_url.clone(),
                api_token: config.api_token.clone(),
                blueprint_titles: title_cache(),
                provider_titles: title_cache(),
            }),
        })
    }

    // =========================================================================
    // Catalog lookups
    // =========================================================================

    /// Get the title of a catalog blueprint (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the blueprint cannot be fetched.
    pub async fn blueprint_title(&self, id: BlueprintId) -> Result<String, PrintifyError> {
        if let Some(title) = self.inner.blueprint_titles.get(&id).await {
            return Ok(title);
        }
        let blueprint: Blueprint = self
            .get_json(&format!("catalog/blueprints/{id}.json"))
            .await?;
        self.inner
            .blueprint_titles
            .insert(blueprint.id, blueprint.title.clone())
            .await;
        Ok(blueprint.title)
    }

    /// Get the title of a print provider (cached).
    ///
    /// # Errors
    ///
    /// Returns an error if the print provider cannot be fetched.
    pub async fn print_provider_title(&self, id: PrintProviderId) -> Result<String, PrintifyError> {
        if let Some(title) = self.inner.provider_titles.get(&id).await {
            return Ok(title);
        }
        let provider: PrintProvider = self
            .get_json(&format!("catalog/print_providers/{id}.json"))
            .await?;
        self.inner
            .provider_titles
            .insert(provider.id, provider.title.clone())
            .await;
        Ok(provider.title)
    }

    /// Fill in product type and print provider name. Lookup failures are not fatal.
    async fn enrich(&self, product: &mut PrintifyProduct) {
        if product.product_type.is_none()
            && let Some(blueprint_id) = product.blueprint_id
        {
            match self.blueprint_title(blueprint_id).await {
                Ok(title) => product.product_type = Some(title),
                Err(e) => warn!(
                    blueprint_id = %blueprint_id,
                    error = %e,
                    "Blueprint lookup failed"
                ),
            }
        }

        if product.print_provider_name.is_none()
            && let Some(provider_id) = product.print_provider_id
        {
            match self.print_provider_title(provider_id).await {
                Ok(title) => product.print_provider_name = Some(title),
                Err(e) => warn!(
                    print_provider_id = %provider_id,
                    error = %e,
                    "Print provider lookup failed"
                ),
            }
        }
    }

    // =========================================================================
    // HTTP plumbing
    // =========================================================================

    fn url(&self, path: &str) -> Result<Url, PrintifyError> {
        Ok(self.inner.base_url.join(path)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PrintifyError> {
        let url = self.url(path)?;
        self.send_get(url).await
    }

    async fn send_get<T: DeserializeOwned>(&self, url: Url) -> Result<T, PrintifyError> {
        debug!(url = %url, "Printify GET");
        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(self.inner.api_token.expose_secret())
            .send()
            .await?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), PrintifyError> {
        let url = self.url(path)?;
        debug!(url = %url, "Printify POST");
        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(self.inner.api_token.expose_secret())
            .json(body)
            .send()
            .await?;
        check_status(response).await.map(|_| ())
    }
}

#[async_trait]
impl SupplierApi for PrintifyClient {
    #[instrument(skip(self))]
    async fn get_products(
        &self,
        shop_id: ShopId,
        page: u32,
        limit: u32,
    ) -> Result<ProductPage, PrintifyError> {
        let mut url = self.url(&format!("shops/{shop_id}/products.json"))?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        self.send_get(url).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn get_product(
        &self,
        shop_id: ShopId,
        product_id: &SupplierProductId,
    ) -> Result<PrintifyProduct, PrintifyError> {
        let mut product: PrintifyProduct = self
            .get_json(&format!("shops/{shop_id}/products/{product_id}.json"))
            .await?;
        self.enrich(&mut product).await;
        Ok(product)
    }

    #[instrument(skip(self, handle), fields(product_id = %product_id, local_id = %local_id))]
    async fn register_external_product(
        &self,
        shop_id: ShopId,
        product_id: &SupplierProductId,
        local_id: ProductId,
        handle: &str,
    ) -> Result<(), PrintifyError> {
        let body = PublishingSucceeded {
            external: ExternalProduct {
                id: local_id.to_string(),
                handle: handle.to_string(),
            },
        };
        self.post_json(
            &format!("shops/{shop_id}/products/{product_id}/publishing_succeeded.json"),
            &body,
        )
        .await
    }
}

/// Map non-success statuses to typed errors.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PrintifyError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(PrintifyError::RateLimited(retry_after));
    }

    if status == StatusCode::NOT_FOUND {
        return Err(PrintifyError::NotFound(response.url().path().to_string()));
    }

    let message = response.text().await.unwrap_or_default();
    Err(PrintifyError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PrintifyError> {
    let response = check_status(response).await?;
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}
