//! WooCommerce REST API v3 wire types.
//!
//! Read types tolerate missing fields; write types skip what they don't set
//! so a `PUT` only touches the fields it carries.

use printbridge_core::StockStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Product as returned by `GET products/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WcProduct {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    /// `simple`, `variable`, `grouped` or `external`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// `publish`, `draft`, `trash`, ...
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub images: Vec<WcImage>,
    #[serde(default)]
    pub meta_data: Vec<WcMeta>,
}

/// Variation as returned by `GET products/{id}/variations`.
#[derive(Debug, Clone, Deserialize)]
pub struct WcVariation {
    pub id: i64,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub meta_data: Vec<WcMeta>,
}

/// One `meta_data` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WcMeta {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    pub key: String,
    #[serde(default)]
    pub value: JsonValue,
}

impl WcMeta {
    /// New entry to upsert by key.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: JsonValue::String(value.into()),
        }
    }

    /// The value rendered as text (WordPress stores meta as strings, but
    /// plugins sometimes write numbers or booleans).
    #[must_use]
    pub fn value_string(&self) -> String {
        match &self.value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Image reference: an existing attachment by `id` or a new one by `src`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WcImage {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub src: String,
}

impl WcImage {
    #[must_use]
    pub const fn existing(id: i64) -> Self {
        Self {
            id: Some(id),
            src: String::new(),
        }
    }

    #[must_use]
    pub fn from_src(src: &str) -> Self {
        Self {
            id: None,
            src: src.to_string(),
        }
    }

    /// Reference to send back in a `PUT`: by ID when known.
    #[must_use]
    pub fn as_reference(&self) -> Self {
        self.id.map_or_else(|| self.clone(), Self::existing)
    }
}

/// Category, tag or attribute term.
#[derive(Debug, Clone, Deserialize)]
pub struct WcTerm {
    pub id: i64,
    #[serde(default)]
    pub name: String,
}

/// Body of a term or attribute create.
#[derive(Debug, Clone, Serialize)]
pub struct WcNewTerm<'a> {
    pub name: &'a str,
}

/// Reference to a term by ID.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WcIdRef {
    pub id: i64,
}

/// Attribute declared on a product.
#[derive(Debug, Clone, Serialize)]
pub struct WcProductAttribute {
    pub id: i64,
    pub options: Vec<String>,
    pub visible: bool,
    pub variation: bool,
}

/// Attribute value of a variation or a product default.
#[derive(Debug, Clone, Serialize)]
pub struct WcAttributeOption {
    pub id: i64,
    pub option: String,
}

/// Body of a product create or full update.
#[derive(Debug, Clone, Serialize)]
pub struct WcProductWrite {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub categories: Vec<WcIdRef>,
    pub tags: Vec<WcIdRef>,
    pub attributes: Vec<WcProductAttribute>,
    pub default_attributes: Vec<WcAttributeOption>,
    pub meta_data: Vec<WcMeta>,
}

/// Body of a variation create.
#[derive(Debug, Clone, Serialize)]
pub struct WcVariationWrite {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub regular_price: String,
    pub attributes: Vec<WcAttributeOption>,
    pub manage_stock: bool,
    pub stock_quantity: i64,
    pub stock_status: StockStatus,
    pub meta_data: Vec<WcMeta>,
}

/// Body of a stock-only update.
#[derive(Debug, Clone, Serialize)]
pub struct WcStockWrite {
    pub manage_stock: bool,
    pub stock_quantity: i64,
    pub stock_status: StockStatus,
}

impl WcStockWrite {
    #[must_use]
    pub const fn new(quantity: i64) -> Self {
        Self {
            manage_stock: true,
            stock_quantity: quantity,
            stock_status: StockStatus::from_quantity(quantity),
        }
    }
}

/// Body of a metadata-only update.
#[derive(Debug, Clone, Serialize)]
pub struct WcMetaWrite {
    pub meta_data: Vec<WcMeta>,
}

/// Body of a product image update.
#[derive(Debug, Clone, Serialize)]
pub struct WcImagesWrite {
    pub images: Vec<WcImage>,
}

/// Body of a variation image update.
#[derive(Debug, Clone, Serialize)]
pub struct WcVariationImageWrite {
    pub image: WcImage,
}

/// Error body returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub struct WcErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
