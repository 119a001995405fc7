//! Printify API payload types.
//!
//! Only the fields the sync pipeline reads are modelled; unknown fields are
//! ignored so API additions do not break deserialization.

use printbridge_core::{BlueprintId, PrintProviderId, ShopId, SupplierProductId, SupplierVariantId};
use serde::{Deserialize, Serialize};

/// One page of the shop product listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    /// Page number (1-indexed).
    pub current_page: u32,
    /// Last available page.
    #[serde(default)]
    pub last_page: u32,
    /// Products on this page.
    #[serde(default)]
    pub data: Vec<PrintifyProduct>,
}

impl ProductPage {
    /// Whether a further page exists after this one.
    #[must_use]
    pub const fn has_next_page(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// A Printify product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintifyProduct {
    /// Printify product ID.
    pub id: SupplierProductId,
    /// Product title.
    #[serde(default)]
    pub title: String,
    /// HTML description.
    #[serde(default)]
    pub description: String,
    /// Product-level SKU (Printify usually only sets variant SKUs).
    #[serde(default)]
    pub sku: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Option dimensions (e.g. Colors, Sizes) with their values.
    #[serde(default)]
    pub options: Vec<ProductOption>,
    /// Variants.
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Mockup images.
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Catalog blueprint the product is based on.
    #[serde(default)]
    pub blueprint_id: Option<BlueprintId>,
    /// Print provider fulfilling the product.
    #[serde(default)]
    pub print_provider_id: Option<PrintProviderId>,
    /// Shop the product belongs to.
    #[serde(default)]
    pub shop_id: Option<ShopId>,
    /// Blueprint title, used as the product type.
    ///
    /// Not part of the product payload; filled in by [`super::PrintifyClient`].
    #[serde(default)]
    pub product_type: Option<String>,
    /// Print provider title.
    ///
    /// Not part of the product payload; filled in by [`super::PrintifyClient`].
    #[serde(default)]
    pub print_provider_name: Option<String>,
}

impl PrintifyProduct {
    /// Variants that are offered for sale.
    pub fn enabled_variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.iter().filter(|v| v.is_enabled)
    }

    /// Find a variant by ID.
    #[must_use]
    pub fn variant(&self, id: SupplierVariantId) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    /// The image flagged as default, or the first one.
    #[must_use]
    pub fn featured_image(&self) -> Option<&ProductImage> {
        self.images
            .iter()
            .find(|img| img.is_default)
            .or_else(|| self.images.first())
    }
}

/// One option dimension of a product (e.g. "Sizes").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductOption {
    /// Display name (e.g. "Sizes").
    pub name: String,
    /// Option type (e.g. "size", "color").
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Values available in this dimension.
    #[serde(default)]
    pub values: Vec<OptionValue>,
}

/// A value within an option dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionValue {
    /// Option value ID referenced from [`Variant::options`].
    pub id: i64,
    /// Display title (e.g. "XL").
    pub title: String,
}

/// A Printify variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    /// Variant ID.
    pub id: SupplierVariantId,
    /// SKU.
    #[serde(default)]
    pub sku: Option<String>,
    /// Retail price in cents.
    #[serde(default)]
    pub price: i64,
    /// Production cost in cents.
    #[serde(default)]
    pub cost: Option<i64>,
    /// Display title (e.g. "Red / M").
    #[serde(default)]
    pub title: String,
    /// Option value IDs selected by this variant.
    #[serde(default)]
    pub options: Vec<i64>,
    /// Whether the variant is offered in the shop.
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    /// Whether this is the default variant.
    #[serde(default)]
    pub is_default: bool,
    /// Whether the print provider can currently fulfil it.
    #[serde(default = "default_true")]
    pub is_available: bool,
    /// Reported quantity.
    #[serde(default)]
    pub quantity: Option<i64>,
}

impl Variant {
    /// Quantity to push into local stock.
    ///
    /// Unavailable variants are always zero. Printify reports `quantity: 1`
    /// for available print-on-demand variants, which is also assumed when the
    /// field is missing.
    #[must_use]
    pub fn stock_quantity(&self) -> i64 {
        if self.is_available {
            self.quantity.unwrap_or(1)
        } else {
            0
        }
    }
}

/// A product mockup image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductImage {
    /// Image URL.
    pub src: String,
    /// Variants this image depicts.
    #[serde(default)]
    pub variant_ids: Vec<SupplierVariantId>,
    /// Camera position (e.g. "front").
    #[serde(default)]
    pub position: Option<String>,
    /// Whether this is the default image.
    #[serde(default)]
    pub is_default: bool,
}

/// Blueprint detail (only the title is used).
#[derive(Debug, Clone, Deserialize)]
pub struct Blueprint {
    pub id: BlueprintId,
    pub title: String,
}

/// Print provider detail (only the title is used).
#[derive(Debug, Clone, Deserialize)]
pub struct PrintProvider {
    pub id: PrintProviderId,
    pub title: String,
}

/// Body of the `publishing_succeeded` call.
#[derive(Debug, Clone, Serialize)]
pub struct PublishingSucceeded {
    pub external: ExternalProduct,
}

/// External (local) product reference.
#[derive(Debug, Clone, Serialize)]
pub struct ExternalProduct {
    /// Local product ID, as a string.
    pub id: String,
    /// Storefront URL of the product.
    pub handle: String,
}

const fn default_true() -> bool {
    true
}
