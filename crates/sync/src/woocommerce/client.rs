//! WooCommerce REST API client.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use printbridge_core::{AttributeId, CategoryId, ProductId, TagId, VariationId};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::WooCommerceError;
use super::types::{
    WcAttributeOption, WcErrorBody, WcIdRef, WcImage, WcImagesWrite, WcMeta, WcMetaWrite,
    WcNewTerm, WcProduct, WcProductAttribute, WcProductWrite, WcStockWrite, WcTerm, WcVariation,
    WcVariationImageWrite, WcVariationWrite,
};
use crate::catalog::{
    AttributeSelection, CatalogError, CatalogStore, ImageSlot, LocalProduct, LocalVariation,
    MetaMap, ProductDraft, ProductKind, VariationDraft,
};
use crate::config::WooCommerceConfig;

/// Largest page size the REST API accepts.
const PER_PAGE: usize = 100;

/// Term IDs only change if someone deletes and recreates a term.
const TERM_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

fn term_cache<V>() -> Cache<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(10_000)
        .time_to_live(TERM_CACHE_TTL)
        .build()
}

/// WooCommerce REST API client.
///
/// Cheap to clone; clones share the HTTP connection pool and term caches.
#[derive(Clone)]
pub struct WooCommerceClient {
    inner: Arc<WooCommerceClientInner>,
}

struct WooCommerceClientInner {
    client: reqwest::Client,
    api_url: Url,
    consumer_key: String,
    consumer_secret: SecretString,
    categories: Cache<String, CategoryId>,
    tags: Cache<String, TagId>,
    attributes: Cache<String, AttributeId>,
}

impl WooCommerceClient {
    /// Create a new WooCommerce API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the store URL
    /// cannot be extended with the API path.
    pub fn new(config: &WooCommerceConfig) -> Result<Self, WooCommerceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("printbridge/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(WooCommerceClientInner {
                client,
                api_url: config.store_url.join("wp-json/wc/v3/")?,
                consumer_key: config.consumer_key.clone(),
                consumer_secret: config.consumer_secret.clone(),
                categories: term_cache(),
                tags: term_cache(),
                attributes: term_cache(),
            }),
        })
    }

    // =========================================================================
    // HTTP plumbing
    // =========================================================================

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, WooCommerceError> {
        let mut url = self.inner.api_url.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn request<B, T>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<T, WooCommerceError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method = %method, url = %url, "WooCommerce request");
        let mut request = self
            .inner
            .client
            .request(method, url)
            .basic_auth(
                &self.inner.consumer_key,
                Some(self.inner.consumer_secret.expose_secret()),
            );
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(WooCommerceError::NotFound(error_message(&text)));
        }
        if !status.is_success() {
            return Err(WooCommerceError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WooCommerceError> {
        let url = self.url(path, query)?;
        self.request::<(), T>(Method::GET, url, None).await
    }

    async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, WooCommerceError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path, &[])?;
        self.request(method, url, Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<(), WooCommerceError> {
        let url = self.url(path, &[("force", "true".to_string())])?;
        let _: serde_json::Value = self.request::<(), _>(Method::DELETE, url, None).await?;
        Ok(())
    }

    /// Fetch every page of a list endpoint.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, String)],
    ) -> Result<Vec<T>, WooCommerceError> {
        let mut all = Vec::new();
        for page in 1.. {
            let mut query = vec![
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];
            query.extend(extra.iter().cloned());
            let items: Vec<T> = self.get(path, &query).await?;
            let len = items.len();
            all.extend(items);
            if len < PER_PAGE {
                break;
            }
        }
        Ok(all)
    }

    async fn fetch_product(&self, id: ProductId) -> Result<WcProduct, WooCommerceError> {
        self.get(&format!("products/{id}"), &[]).await
    }

    /// Find a term by (case-insensitive) name in a taxonomy endpoint, creating it if missing.
    async fn find_or_create_term(&self, path: &str, name: &str) -> Result<i64, WooCommerceError> {
        let candidates: Vec<WcTerm> = self
            .get(
                path,
                &[
                    ("search", name.to_string()),
                    ("per_page", PER_PAGE.to_string()),
                ],
            )
            .await?;
        if let Some(term) = candidates
            .iter()
            .find(|t| decode_entities(&t.name).eq_ignore_ascii_case(name))
        {
            return Ok(term.id);
        }

        let created: WcTerm = self
            .send(Method::POST, path, &WcNewTerm { name })
            .await?;
        debug!(path, name, id = created.id, "Created term");
        Ok(created.id)
    }
}

#[async_trait]
impl CatalogStore for WooCommerceClient {
    async fn product_exists(&self, id: ProductId) -> Result<bool, CatalogError> {
        match self.fetch_product(id).await {
            Ok(product) => Ok(product.status != "trash"),
            Err(WooCommerceError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<LocalProduct>, CatalogError> {
        match self.fetch_product(id).await {
            Ok(product) if product.status == "trash" => Ok(None),
            Ok(product) => Ok(Some(to_local_product(product))),
            Err(WooCommerceError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_product(&self, draft: &ProductDraft) -> Result<ProductId, CatalogError> {
        let created: WcProduct = self
            .send(Method::POST, "products", &to_product_write(draft))
            .await?;
        Ok(ProductId::new(created.id))
    }

    #[instrument(skip(self, draft), fields(local_id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<(), CatalogError> {
        let _: WcProduct = self
            .send(
                Method::PUT,
                &format!("products/{id}"),
                &to_product_write(draft),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<(), CatalogError> {
        Ok(self.delete(&format!("products/{id}")).await?)
    }

    async fn get_meta(&self, id: ProductId, key: &str) -> Result<Option<String>, CatalogError> {
        let product = self.fetch_product(id).await?;
        Ok(product
            .meta_data
            .iter()
            .find(|m| m.key == key)
            .map(WcMeta::value_string))
    }

    async fn set_meta(&self, id: ProductId, entries: &MetaMap) -> Result<(), CatalogError> {
        let body = WcMetaWrite {
            meta_data: entries.iter().map(|(k, v)| WcMeta::new(k, v)).collect(),
        };
        let _: WcProduct = self
            .send(Method::PUT, &format!("products/{id}"), &body)
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_meta(
        &self,
        key: &str,
        value: &str,
    ) -> Result<Option<ProductId>, CatalogError> {
        // The REST API has no meta query, so walk the catalog page by page
        for page in 1.. {
            let products: Vec<WcProduct> = self
                .get(
                    "products",
                    &[
                        ("per_page", PER_PAGE.to_string()),
                        ("page", page.to_string()),
                        ("status", "any".to_string()),
                    ],
                )
                .await?;
            if let Some(found) = products.iter().find(|p| {
                p.meta_data
                    .iter()
                    .any(|m| m.key == key && m.value_string() == value)
            }) {
                return Ok(Some(ProductId::new(found.id)));
            }
            if products.len() < PER_PAGE {
                break;
            }
        }
        Ok(None)
    }

    async fn ensure_category(&self, name: &str) -> Result<CategoryId, CatalogError> {
        let key = name.to_lowercase();
        if let Some(id) = self.inner.categories.get(&key).await {
            return Ok(id);
        }
        let id = CategoryId::new(self.find_or_create_term("products/categories", name).await?);
        self.inner.categories.insert(key, id).await;
        Ok(id)
    }

    async fn ensure_tag(&self, name: &str) -> Result<TagId, CatalogError> {
        let key = name.to_lowercase();
        if let Some(id) = self.inner.tags.get(&key).await {
            return Ok(id);
        }
        let id = TagId::new(self.find_or_create_term("products/tags", name).await?);
        self.inner.tags.insert(key, id).await;
        Ok(id)
    }

    async fn ensure_attribute(&self, name: &str) -> Result<AttributeId, CatalogError> {
        let key = name.to_lowercase();
        if let Some(id) = self.inner.attributes.get(&key).await {
            return Ok(id);
        }

        // Attributes are few and the endpoint is not paginated
        let existing: Vec<WcTerm> = self.get("products/attributes", &[]).await?;
        let id = match existing
            .iter()
            .find(|a| decode_entities(&a.name).eq_ignore_ascii_case(name))
        {
            Some(attribute) => attribute.id,
            None => {
                let created: WcTerm = self
                    .send(Method::POST, "products/attributes", &WcNewTerm { name })
                    .await?;
                debug!(name, id = created.id, "Created attribute");
                created.id
            }
        };

        let id = AttributeId::new(id);
        self.inner.attributes.insert(key, id).await;
        Ok(id)
    }

    async fn ensure_attribute_terms(
        &self,
        attribute: AttributeId,
        terms: &[String],
    ) -> Result<(), CatalogError> {
        let path = format!("products/attributes/{attribute}/terms");
        let existing: Vec<WcTerm> = self.get_all(&path, &[]).await?;
        let known: BTreeSet<String> = existing
            .iter()
            .map(|t| decode_entities(&t.name).to_lowercase())
            .collect();

        for term in terms {
            if known.contains(&term.to_lowercase()) {
                continue;
            }
            let _: WcTerm = self
                .send(Method::POST, &path, &WcNewTerm { name: term })
                .await?;
        }
        Ok(())
    }

    async fn list_variations(
        &self,
        product: ProductId,
    ) -> Result<Vec<LocalVariation>, CatalogError> {
        let variations: Vec<WcVariation> = self
            .get_all(&format!("products/{product}/variations"), &[])
            .await?;
        Ok(variations
            .into_iter()
            .map(|v| LocalVariation {
                id: VariationId::new(v.id),
                sku: non_empty(v.sku),
                stock_quantity: v.stock_quantity,
                meta: to_meta_map(&v.meta_data),
            })
            .collect())
    }

    async fn create_variation(
        &self,
        product: ProductId,
        draft: &VariationDraft,
    ) -> Result<VariationId, CatalogError> {
        let body = WcVariationWrite {
            sku: draft.sku.clone(),
            regular_price: draft.regular_price.to_plain_string(),
            attributes: to_attribute_options(&draft.attributes),
            manage_stock: true,
            stock_quantity: draft.stock_quantity,
            stock_status: printbridge_core::StockStatus::from_quantity(draft.stock_quantity),
            meta_data: draft.meta.iter().map(|(k, v)| WcMeta::new(k, v)).collect(),
        };
        let created: WcVariation = self
            .send(
                Method::POST,
                &format!("products/{product}/variations"),
                &body,
            )
            .await?;
        Ok(VariationId::new(created.id))
    }

    async fn delete_variation(
        &self,
        product: ProductId,
        variation: VariationId,
    ) -> Result<(), CatalogError> {
        Ok(self
            .delete(&format!("products/{product}/variations/{variation}"))
            .await?)
    }

    async fn set_stock(
        &self,
        product: ProductId,
        variation: Option<VariationId>,
        quantity: i64,
    ) -> Result<(), CatalogError> {
        let path = match variation {
            Some(variation) => format!("products/{product}/variations/{variation}"),
            None => format!("products/{product}"),
        };
        let _: serde_json::Value = self
            .send(Method::PUT, &path, &WcStockWrite::new(quantity))
            .await?;
        Ok(())
    }

    async fn sync_price_range(&self, product: ProductId) -> Result<(), CatalogError> {
        // Saving a variable product makes WooCommerce re-sync its price range
        let _: WcProduct = self
            .send(
                Method::PUT,
                &format!("products/{product}"),
                &serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    async fn attach_product_image(
        &self,
        product: ProductId,
        src: &str,
        slot: ImageSlot,
    ) -> Result<(), CatalogError> {
        let current = self.fetch_product(product).await?;
        let mut images: Vec<WcImage> = current.images.iter().map(WcImage::as_reference).collect();
        images.insert(slot.index(images.len()), WcImage::from_src(src));

        let _: WcProduct = self
            .send(
                Method::PUT,
                &format!("products/{product}"),
                &WcImagesWrite { images },
            )
            .await?;
        Ok(())
    }

    async fn attach_variation_image(
        &self,
        product: ProductId,
        variation: VariationId,
        src: &str,
    ) -> Result<(), CatalogError> {
        let _: WcVariation = self
            .send(
                Method::PUT,
                &format!("products/{product}/variations/{variation}"),
                &WcVariationImageWrite {
                    image: WcImage::from_src(src),
                },
            )
            .await?;
        Ok(())
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn to_product_write(draft: &ProductDraft) -> WcProductWrite {
    WcProductWrite {
        name: draft.name.clone(),
        kind: "variable",
        description: draft.description.clone(),
        sku: draft.sku.clone(),
        categories: draft
            .category_ids
            .iter()
            .map(|id| WcIdRef { id: id.as_i64() })
            .collect(),
        tags: draft
            .tag_ids
            .iter()
            .map(|id| WcIdRef { id: id.as_i64() })
            .collect(),
        attributes: draft
            .attributes
            .iter()
            .map(|a| WcProductAttribute {
                id: a.id.as_i64(),
                options: a.options.clone(),
                visible: true,
                variation: true,
            })
            .collect(),
        default_attributes: to_attribute_options(&draft.default_attributes),
        meta_data: draft.meta.iter().map(|(k, v)| WcMeta::new(k, v)).collect(),
    }
}

fn to_attribute_options(selections: &[AttributeSelection]) -> Vec<WcAttributeOption> {
    selections
        .iter()
        .map(|s| WcAttributeOption {
            id: s.id.as_i64(),
            option: s.option.clone(),
        })
        .collect()
}

fn to_local_product(product: WcProduct) -> LocalProduct {
    LocalProduct {
        id: ProductId::new(product.id),
        kind: if product.kind == "simple" {
            ProductKind::Simple
        } else {
            ProductKind::Variable
        },
        meta: to_meta_map(&product.meta_data),
        name: product.name,
        sku: non_empty(product.sku),
        stock_quantity: product.stock_quantity,
        permalink: product.permalink.filter(|p| !p.is_empty()),
    }
}

fn to_meta_map(meta: &[WcMeta]) -> MetaMap {
    meta.iter()
        .map(|m| (m.key.clone(), m.value_string()))
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// WordPress returns term names HTML-escaped.
fn decode_entities(name: &str) -> String {
    name.replace("&amp;", "&")
        .replace("&#039;", "'")
        .replace("&quot;", "\"")
}

/// Message from a REST error body, or the raw body if it is not JSON.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<WcErrorBody>(body) {
        Ok(err) if !err.message.is_empty() => format!("{} ({})", err.message, err.code),
        _ => body.chars().take(500).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use printbridge_core::{CurrencyCode, Price};
    use serde_json::json;
    use wiremock::matchers::{body_json, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> WooCommerceClient {
        let config = WooCommerceConfig {
            store_url: Url::parse(&format!("{}/", server.uri())).unwrap(),
            consumer_key: "ck_test".to_string(),
            consumer_secret: SecretString::from("cs_test"),
        };
        WooCommerceClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_product_exists_maps_404_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "woocommerce_rest_product_invalid_id",
                "message": "Invalid ID."
            })))
            .mount(&server)
            .await;

        let exists = client_for(&server)
            .product_exists(ProductId::new(404))
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_trashed_product_does_not_exist() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/5"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": 5, "status": "trash"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(!client.product_exists(ProductId::new(5)).await.unwrap());
        let product = client.get_product(ProductId::new(5)).await.unwrap();
        assert!(product.is_none());
    }

    #[tokio::test]
    async fn test_get_product_reads_meta() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 12,
                "name": "Tee",
                "type": "variable",
                "status": "publish",
                "sku": "",
                "permalink": "https://shop.test/product/tee/",
                "meta_data": [{"id": 1, "key": "_printify_product_id", "value": "P1"}]
            })))
            .mount(&server)
            .await;

        let product = client_for(&server)
            .get_product(ProductId::new(12))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(product.kind, ProductKind::Variable);
        assert_eq!(product.sku, None);
        assert_eq!(product.supplier_product_id(), Some("P1"));
        assert_eq!(
            product.permalink.as_deref(),
            Some("https://shop.test/product/tee/")
        );
    }

    #[tokio::test]
    async fn test_find_by_meta_walks_pages() {
        let server = MockServer::start().await;
        let first_page: Vec<_> = (1..=100)
            .map(|id| json!({"id": id, "meta_data": []}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 101, "meta_data": [{"key": "_printify_product_id", "value": "P9"}]}
            ])))
            .mount(&server)
            .await;

        let found = client_for(&server)
            .find_by_meta("_printify_product_id", "P9")
            .await
            .unwrap();
        assert_eq!(found, Some(ProductId::new(101)));
    }

    #[tokio::test]
    async fn test_ensure_category_creates_once_then_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/categories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 3, "name": "Mugs"}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wc/v3/products/categories"))
            .and(body_json(json!({"name": "T-Shirts"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": 8, "name": "T-Shirts"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.ensure_category("T-Shirts").await.unwrap(),
            CategoryId::new(8)
        );
        assert_eq!(
            client.ensure_category("t-shirts").await.unwrap(),
            CategoryId::new(8)
        );
    }

    #[tokio::test]
    async fn test_create_variation_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wc/v3/products/12/variations"))
            .and(body_partial_json(json!({
                "sku": "TEE-R-M",
                "regular_price": "20.00",
                "attributes": [{"id": 1, "option": "M"}],
                "manage_stock": true,
                "stock_quantity": 0,
                "stock_status": "outofstock",
                "meta_data": [{"key": "_printify_variant_id", "value": "101"}]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 77})))
            .expect(1)
            .mount(&server)
            .await;

        let draft = VariationDraft {
            sku: Some("TEE-R-M".to_string()),
            regular_price: Price::from_cents(2000, CurrencyCode::USD),
            attributes: vec![AttributeSelection {
                id: AttributeId::new(1),
                name: "Size".to_string(),
                option: "M".to_string(),
            }],
            stock_quantity: 0,
            meta: MetaMap::from([("_printify_variant_id".to_string(), "101".to_string())]),
        };
        let id = client_for(&server)
            .create_variation(ProductId::new(12), &draft)
            .await
            .unwrap();
        assert_eq!(id, VariationId::new(77));
    }

    #[tokio::test]
    async fn test_gallery_image_is_appended() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 12,
                "images": [{"id": 501, "src": "https://shop.test/front.png"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/wp-json/wc/v3/products/12"))
            .and(body_json(json!({
                "images": [{"id": 501}, {"src": "https://images.printify.com/back.png"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 12})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .attach_product_image(
                ProductId::new(12),
                "https://images.printify.com/back.png",
                ImageSlot::Gallery(1),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_featured_image_is_prepended_to_gallery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wc/v3/products/12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 12,
                "images": [{"id": 502, "src": "https://shop.test/back.png"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/wp-json/wc/v3/products/12"))
            .and(body_json(json!({
                "images": [{"src": "https://images.printify.com/front.png"}, {"id": 502}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 12})))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .attach_product_image(
                ProductId::new(12),
                "https://images.printify.com/front.png",
                ImageSlot::Featured,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/wp-json/wc/v3/products/12"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": "product_invalid_sku",
                "message": "Invalid or duplicated SKU."
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .set_stock(ProductId::new(12), None, 3)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Invalid(ref m) if m == "Invalid or duplicated SKU. (product_invalid_sku)"
        ));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("Men&#039;s &amp; Kids"), "Men's & Kids");
    }
}
