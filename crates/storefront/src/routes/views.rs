//! Display data shared by pages and live fragments.

use droidshop_core::{OrderId, OrderStatus, ProductId};

use crate::db::CartRepository;
use crate::error::AppError;
use crate::middleware::CurrentSession;
use crate::models::{Cart, Catalog, Order, Product};
use crate::state::AppState;

/// Page chrome: top bar, bottom nav and the notice dialog.
#[derive(Debug, Clone)]
pub struct Shell {
    pub title: String,
    pub notice: Option<String>,
    pub signed_in: bool,
    pub is_admin: bool,
    /// Cart entry count, present when the page shows the cart link.
    pub cart_badge: Option<usize>,
}

impl Shell {
    #[must_use]
    pub fn new(title: impl Into<String>, current: &CurrentSession, notice: Option<String>) -> Self {
        Self {
            title: title.into(),
            notice: notice.filter(|n| !n.trim().is_empty()),
            signed_in: current.user().is_some(),
            is_admin: current.state.is_admin(),
            cart_badge: None,
        }
    }

    /// Show the cart link with a badge. Admins and visitors who are signed
    /// out get no cart link.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if the cart cannot be read.
    pub async fn with_cart_link(
        mut self,
        app: &AppState,
        current: &CurrentSession,
    ) -> Result<Self, AppError> {
        if let Some(user) = current.user()
            && !self.is_admin
        {
            let cart = CartRepository::new(app.store()).get(&user.uid).await?;
            self.cart_badge = Some(cart.len());
        }
        Ok(self)
    }
}

/// A product as shown in grids and the admin list.
#[derive(Debug, Clone)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub image: String,
}

impl ProductCard {
    #[must_use]
    pub fn new(id: &ProductId, product: &Product) -> Self {
        Self {
            id: id.to_string(),
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            image: product.image.clone(),
        }
    }

    #[must_use]
    pub fn from_catalog(catalog: &Catalog) -> Vec<Self> {
        catalog.iter().map(|(id, p)| Self::new(id, p)).collect()
    }
}

/// Cart contents ready for display.
#[derive(Debug, Clone)]
pub struct CartView {
    pub items: Vec<ProductCard>,
    pub total: String,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            items: cart
                .entries()
                .map(|entry| ProductCard::new(&entry.id, &entry.product))
                .collect(),
            total: cart.total().to_string(),
        }
    }
}

/// One choice in an order's status selector.
#[derive(Debug, Clone)]
pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

/// An order card.
#[derive(Debug, Clone)]
pub struct OrderCard {
    pub id: String,
    pub short_id: String,
    /// RFC 3339 placement time.
    pub placed_at: String,
    pub total: String,
    pub status: &'static str,
    pub item_names: Vec<String>,
    pub status_options: Vec<StatusOption>,
}

impl OrderCard {
    #[must_use]
    pub fn new(id: &OrderId, order: &Order) -> Self {
        Self {
            id: id.to_string(),
            short_id: id.short().to_owned(),
            placed_at: order.timestamp.to_rfc3339(),
            total: order.total.to_string(),
            status: order.status.as_str(),
            item_names: order.items.values().map(|e| e.product.name.clone()).collect(),
            status_options: OrderStatus::ALL
                .iter()
                .map(|status| StatusOption {
                    value: status.as_str(),
                    selected: *status == order.status,
                })
                .collect(),
        }
    }

    /// Cards for `orders`, newest first.
    #[must_use]
    pub fn newest_first<'a>(orders: impl IntoIterator<Item = (&'a OrderId, &'a Order)>) -> Vec<Self> {
        let mut cards: Vec<_> = orders.into_iter().collect();
        cards.sort_by(|(a_id, a), (b_id, b)| b.timestamp.cmp(&a.timestamp).then(b_id.cmp(a_id)));
        cards.into_iter().map(|(id, order)| Self::new(id, order)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use droidshop_core::{Price, UserId};

    use super::*;
    use crate::models::CartEntry;

    fn order(seconds: i64, status: OrderStatus) -> Order {
        Order {
            user_id: UserId::new("u1"),
            items: std::collections::BTreeMap::new(),
            total: Price::from_cents(999),
            status,
            timestamp: Utc.timestamp_opt(seconds, 0).unwrap(),
        }
    }

    #[test]
    fn test_order_card_marks_current_status() {
        let card = OrderCard::new(&OrderId::new("-Nabcdefgh12345"), &order(0, OrderStatus::Shipped));
        assert_eq!(card.short_id, "12345");
        assert_eq!(card.total, "$9.99");
        let selected: Vec<_> = card
            .status_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, ["Shipped"]);
    }

    #[test]
    fn test_newest_first() {
        let older = order(10, OrderStatus::Pending);
        let newer = order(20, OrderStatus::Pending);
        let (a, b) = (OrderId::new("a"), OrderId::new("b"));
        let cards = OrderCard::newest_first([(&a, &older), (&b, &newer)]);
        assert_eq!(cards.first().unwrap().id, "b");
    }

    #[test]
    fn test_cart_view_total() {
        let widget = Product {
            name: "Widget".to_owned(),
            price: Price::from_cents(999),
            description: String::new(),
            image: String::new(),
        };
        let cart: Cart = [CartEntry {
            id: ProductId::new("p1"),
            product: widget,
        }]
        .into_iter()
        .collect();
        let view = CartView::from(&cart);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.total, "$9.99");
    }
}
