//! Attribute extraction from supplier variants.
//!
//! Pure functions: nothing here touches the catalog. The writer feeds the
//! result into taxonomy creation afterwards.

use std::collections::{BTreeMap, BTreeSet};

use crate::printify::{PrintifyProduct, ProductOption, Variant};

/// Attribute name to the set of values used across a product's variants.
pub type AttributeSet = BTreeMap<String, BTreeSet<String>>;

/// Local attribute name for a supplier option dimension.
///
/// Printify names dimensions in the plural ("Sizes") but also tags each with
/// a singular type ("size"); the type reads better as a store attribute.
#[must_use]
pub fn attribute_name(option: &ProductOption) -> String {
    let kind = option.kind.trim();
    if kind.is_empty() {
        return option.name.trim().to_string();
    }
    let mut chars = kind.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Attribute selections of one variant, in the product's option order.
///
/// Option value IDs that do not resolve against the product's options are
/// skipped. A variant without options yields an empty list.
#[must_use]
pub fn variant_selections(product: &PrintifyProduct, variant: &Variant) -> Vec<(String, String)> {
    product
        .options
        .iter()
        .filter_map(|option| {
            option
                .values
                .iter()
                .find(|value| variant.options.contains(&value.id))
                .map(|value| (attribute_name(option), value.title.trim().to_string()))
        })
        .filter(|(name, value)| !name.is_empty() && !value.is_empty())
        .collect()
}

/// Union of attribute values over all enabled variants.
#[must_use]
pub fn extract_attributes(product: &PrintifyProduct) -> AttributeSet {
    let mut set = AttributeSet::new();
    for variant in product.enabled_variants() {
        for (name, value) in variant_selections(product, variant) {
            set.entry(name).or_default().insert(value);
        }
    }
    set
}
