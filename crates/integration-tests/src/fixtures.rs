//! Printify product fixtures.

use printbridge_sync::printify::PrintifyProduct;
use serde_json::{Value, json};

use crate::TEST_SHOP;

/// Size S, M and L plus colour Red, in Printify's option layout.
fn apparel_options() -> Value {
    json!([
        {
            "name": "Sizes",
            "type": "size",
            "values": [
                {"id": 1, "title": "S"},
                {"id": 2, "title": "M"},
                {"id": 3, "title": "L"}
            ]
        },
        {
            "name": "Colors",
            "type": "color",
            "values": [{"id": 10, "title": "Red"}]
        }
    ])
}

fn parse(value: Value) -> PrintifyProduct {
    serde_json::from_value(value).expect("fixture is a valid Printify product")
}

/// A tee with two enabled variants: `S / Red` (5 in stock, default) and
/// `M / Red` (none left), plus a disabled `L / Red`.
#[must_use]
pub fn tee_shirt(id: &str) -> PrintifyProduct {
    parse(json!({
        "id": id,
        "title": "Classic Tee",
        "description": "<p>Soft cotton tee.</p>",
        "tags": ["Summer", "Basics", "Summer"],
        "shop_id": TEST_SHOP,
        "blueprint_id": 6,
        "print_provider_id": 99,
        "product_type": "T-Shirts",
        "print_provider_name": "Monster Digital",
        "options": apparel_options(),
        "variants": [
            {
                "id": 101, "sku": format!("{id}-S-RED"), "price": 2000, "title": "S / Red",
                "options": [1, 10], "is_enabled": true, "is_default": true,
                "is_available": true, "quantity": 5
            },
            {
                "id": 102, "sku": format!("{id}-M-RED"), "price": 2200, "title": "M / Red",
                "options": [2, 10], "is_enabled": true, "is_default": false,
                "is_available": true, "quantity": 0
            },
            {
                "id": 103, "sku": format!("{id}-L-RED"), "price": 2400, "title": "L / Red",
                "options": [3, 10], "is_enabled": false, "is_default": false,
                "is_available": true, "quantity": 3
            }
        ],
        "images": [
            {
                "src": format!("https://images.printify.test/{id}/front.png"),
                "variant_ids": [101, 102], "position": "front", "is_default": true
            },
            {
                "src": format!("https://images.printify.test/{id}/back.png"),
                "variant_ids": [102], "position": "back", "is_default": false
            }
        ]
    }))
}

/// A tee whose enabled variants are `S / Red`, `M / Red` and `L / Red`.
#[must_use]
pub fn tee_shirt_three_sizes(id: &str) -> PrintifyProduct {
    let mut product = tee_shirt(id);
    for variant in &mut product.variants {
        variant.is_enabled = true;
    }
    product
}

/// A minimal product with one available variant and no images.
#[must_use]
pub fn plain_product(id: &str) -> PrintifyProduct {
    parse(json!({
        "id": id,
        "title": format!("Product {id}"),
        "options": [
            {"name": "Sizes", "type": "size", "values": [{"id": 1, "title": "One Size"}]}
        ],
        "variants": [
            {"id": 1, "price": 1500, "options": [1], "is_enabled": true, "quantity": 1}
        ]
    }))
}

/// A product with no options: two enabled variants that differ only in price.
#[must_use]
pub fn flat_product(id: &str) -> PrintifyProduct {
    parse(json!({
        "id": id,
        "title": format!("Poster {id}"),
        "variants": [
            {"id": 1, "sku": format!("{id}-A"), "price": 1200, "is_enabled": true, "quantity": 4},
            {"id": 2, "sku": format!("{id}-B"), "price": 1800, "is_enabled": true, "quantity": 0}
        ]
    }))
}
