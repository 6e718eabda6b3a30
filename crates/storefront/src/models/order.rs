//! Orders, stored at `orders/{orderId}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use droidshop_core::{OrderId, OrderStatus, Price, ProductId, UserId};

use super::{Cart, CartEntry};
use crate::realtime::ServerValue;

/// A placed order. Everything except `status` is fixed at placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub user_id: UserId,
    #[serde(default)]
    pub items: BTreeMap<ProductId, CartEntry>,
    pub total: Price,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// All orders keyed by id, oldest first.
pub type Orders = BTreeMap<OrderId, Order>;

/// The record written when an order is placed. The timestamp is filled in
/// by the store.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder<'a> {
    pub user_id: &'a UserId,
    pub items: &'a Cart,
    pub total: Price,
    pub status: OrderStatus,
    pub timestamp: ServerValue,
}

impl<'a> NewOrder<'a> {
    /// A pending order for everything in `cart`.
    #[must_use]
    pub fn from_cart(user_id: &'a UserId, cart: &'a Cart) -> Self {
        Self {
            user_id,
            items: cart,
            total: cart.total(),
            status: OrderStatus::Pending,
            timestamp: ServerValue::Timestamp,
        }
    }
}
