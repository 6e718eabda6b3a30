//! Shopping carts, stored at `carts/{uid}/{productId}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use droidshop_core::{Price, ProductId};

use super::Product;

/// A product snapshot in a cart, carrying its own id.
///
/// The snapshot is taken when the product is added; later catalog edits do
/// not reach carts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartEntry {
    pub id: ProductId,
    #[serde(flatten)]
    pub product: Product,
}

/// A user's cart. Each product appears at most once; there are no
/// quantities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart(BTreeMap<ProductId, CartEntry>);

impl Cart {
    /// Sum of the entry prices.
    #[must_use]
    pub fn total(&self) -> Price {
        self.0.values().map(|entry| entry.product.price).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartEntry> {
        self.0.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CartEntry> {
        self.0.values()
    }
}

impl FromIterator<CartEntry> for Cart {
    fn from_iter<I: IntoIterator<Item = CartEntry>>(iter: I) -> Self {
        Self(iter.into_iter().map(|entry| (entry.id.clone(), entry)).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn entry(id: &str, cents: i64) -> CartEntry {
        CartEntry {
            id: ProductId::new(id),
            product: Product {
                name: id.to_uppercase(),
                price: Price::from_cents(cents),
                description: String::new(),
                image: String::new(),
            },
        }
    }

    #[test]
    fn test_total_sums_entries() {
        let cart: Cart = [entry("a", 1000), entry("b", 250)].into_iter().collect();
        assert_eq!(cart.total(), Price::from_cents(1250));
        assert_eq!(cart.len(), 2);
        assert!(Cart::default().total().is_zero());
    }

    #[test]
    fn test_entry_is_flat_on_the_wire() {
        let value = serde_json::to_value(entry("a", 500)).unwrap();
        assert_eq!(
            value,
            json!({"id": "a", "name": "A", "price": 5, "description": "", "image": ""})
        );
        let back: CartEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry("a", 500));
    }
}
