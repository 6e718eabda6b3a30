//! Order repository.

use serde_json::{Map, Value};
use thiserror::Error;

use droidshop_core::{OrderId, OrderStatus, UserId};

use super::{
    CartRepository, Live, RepositoryError, collections, decode, decode_collection, encode, path,
};
use crate::models::{Cart, NewOrder, Order, Orders};
use crate::realtime::{RealtimeStore, Snapshot};

/// Errors from placing an order.
///
/// Placing an order is two writes: the order record, then clearing the cart.
/// The store offers no transaction across them, so the second can fail after
/// the first succeeded.
#[derive(Debug, Error)]
pub enum PlaceOrderError {
    /// The order record was not written. Nothing changed.
    #[error("order could not be placed: {0}")]
    NotPlaced(#[source] RepositoryError),

    /// The order exists but the cart still holds its items.
    #[error("order {order_id} was placed but the cart could not be cleared: {source}")]
    CartNotCleared {
        order_id: OrderId,
        #[source]
        source: RepositoryError,
    },
}

/// Repository for `orders/{orderId}`.
pub struct OrderRepository<'a> {
    store: &'a dyn RealtimeStore,
}

fn orders_for(snapshot: &Snapshot, uid: &UserId) -> Vec<(OrderId, Order)> {
    decode_collection::<OrderId, Order>(snapshot)
        .into_iter()
        .filter(|(_, order)| order.user_id == *uid)
        .collect()
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(store: &'a dyn RealtimeStore) -> Self {
        Self { store }
    }

    /// Turn `cart` into a pending order for `uid`, then empty the cart.
    ///
    /// The order captures copies of the cart entries and their total. The
    /// timestamp is assigned by the store.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::NotPlaced` if the order write fails, and
    /// `PlaceOrderError::CartNotCleared` if only the cart clear fails.
    pub async fn place(&self, uid: &UserId, cart: &Cart) -> Result<OrderId, PlaceOrderError> {
        let record = NewOrder::from_cart(uid, cart);
        let key = async {
            let value = encode(&record)?;
            let key = self
                .store
                .push(&path(collections::ORDERS, &[])?, value)
                .await?;
            Ok::<_, RepositoryError>(key)
        }
        .await
        .map_err(PlaceOrderError::NotPlaced)?;
        let order_id = OrderId::new(key);

        tracing::info!(
            order_id = %order_id,
            user_id = %uid,
            items = cart.len(),
            total = %record.total,
            "Order placed"
        );

        CartRepository::new(self.store)
            .clear(uid)
            .await
            .map_err(|source| PlaceOrderError::CartNotCleared {
                order_id: order_id.clone(),
                source,
            })?;

        Ok(order_id)
    }

    /// Read one order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    /// Returns `RepositoryError::DataCorruption` if the record is malformed.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let snapshot = self
            .store
            .get(&path(collections::ORDERS, &[id.as_str()])?)
            .await?;
        decode(&snapshot)
    }

    /// Read every order once.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    pub async fn all(&self) -> Result<Orders, RepositoryError> {
        let snapshot = self.store.get(&path(collections::ORDERS, &[])?).await?;
        Ok(decode_collection(&snapshot))
    }

    /// Read the orders placed by `uid` once, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the read fails.
    pub async fn for_user(&self, uid: &UserId) -> Result<Vec<(OrderId, Order)>, RepositoryError> {
        let snapshot = self.store.get(&path(collections::ORDERS, &[])?).await?;
        Ok(orders_for(&snapshot, uid))
    }

    /// Watch every order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the listener cannot be opened.
    pub async fn watch_all(&self) -> Result<Live<Orders>, RepositoryError> {
        let stream = self
            .store
            .subscribe(&path(collections::ORDERS, &[])?)
            .await?;
        Ok(Live::new(stream, |snapshot| Ok(decode_collection(snapshot))))
    }

    /// Watch the orders placed by `uid`, oldest first.
    ///
    /// This listens to the whole collection and filters locally, so every
    /// order written by anyone triggers a re-evaluation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the listener cannot be opened.
    pub async fn watch_for_user(
        &self,
        uid: &UserId,
    ) -> Result<Live<Vec<(OrderId, Order)>>, RepositoryError> {
        let stream = self
            .store
            .subscribe(&path(collections::ORDERS, &[])?)
            .await?;
        let uid = uid.clone();
        Ok(Live::new(stream, move |snapshot| Ok(orders_for(snapshot, &uid))))
    }

    /// Set the status of an order. Any transition is allowed, including
    /// moving backwards. No other field is touched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Store` if the write fails.
    pub async fn update_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut patch = Map::new();
        patch.insert("status".to_owned(), Value::from(status.as_str()));
        self.store
            .update(&path(collections::ORDERS, &[id.as_str()])?, patch)
            .await?;
        tracing::info!(order_id = %id, status = %status, "Order status updated");
        Ok(())
    }
}
