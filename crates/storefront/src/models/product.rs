//! Catalog records, stored at `products/{id}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use droidshop_core::{Price, ProductId};

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: Price,
    #[serde(default)]
    pub description: String,
    /// Public URL of the product image.
    #[serde(default)]
    pub image: String,
}

/// All products keyed by id. Push keys sort by creation time, so iteration
/// order is oldest first.
pub type Catalog = BTreeMap<ProductId, Product>;

/// Partial product update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_patch_only_serializes_set_fields() {
        let patch = ProductPatch {
            price: Some(Price::from_cents(1250)),
            ..ProductPatch::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"price": 12.5}));
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let product: Product =
            serde_json::from_value(json!({"name": "Servo", "price": "4.20"})).unwrap();
        assert_eq!(product.description, "");
        assert_eq!(product.price, Price::from_cents(420));
    }
}
