//! Data access for the realtime store.
//!
//! # Layout
//!
//! ```text
//! users/{uid}                 -> User
//! products/{productId}        -> Product
//! carts/{uid}/{productId}     -> CartEntry
//! orders/{orderId}            -> Order
//! ```
//!
//! Repositories borrow a `&dyn RealtimeStore` and are cheap to construct per
//! request. Watch methods return a [`Live`] value that yields decoded
//! snapshots.

pub mod carts;
pub mod live;
pub mod orders;
pub mod products;
pub mod users;

use std::collections::BTreeMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

pub use carts::CartRepository;
pub use live::Live;
pub use orders::{OrderRepository, PlaceOrderError};
pub use products::ProductRepository;
pub use users::UserRepository;

use crate::realtime::{Snapshot, StoreError, StorePath};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The store rejected or failed the request.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A record does not have the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Top-level collections.
pub(crate) mod collections {
    pub const USERS: &str = "users";
    pub const PRODUCTS: &str = "products";
    pub const CARTS: &str = "carts";
    pub const ORDERS: &str = "orders";
}

/// Build a path under one of the collections.
pub(crate) fn path(collection: &str, keys: &[&str]) -> Result<StorePath, RepositoryError> {
    Ok(StorePath::new(std::iter::once(collection).chain(keys.iter().copied()))?)
}

/// Encode a record for writing.
pub(crate) fn encode<T: Serialize + ?Sized>(record: &T) -> Result<Value, RepositoryError> {
    serde_json::to_value(record).map_err(|e| RepositoryError::Store(StoreError::Json(e)))
}

/// Decode a single record.
pub(crate) fn decode<T: DeserializeOwned>(snapshot: &Snapshot) -> Result<Option<T>, RepositoryError> {
    snapshot
        .deserialize()
        .map_err(|e| RepositoryError::DataCorruption(format!("{}: {e}", snapshot.path())))
}

/// Decode a keyed collection.
///
/// Malformed children are logged and skipped so one bad record does not hide
/// the rest of the collection.
pub(crate) fn decode_collection<K, T>(snapshot: &Snapshot) -> BTreeMap<K, T>
where
    K: From<String> + Ord,
    T: DeserializeOwned,
{
    let Some(value) = snapshot.value() else {
        return BTreeMap::new();
    };
    let Value::Object(children) = value else {
        tracing::warn!(path = %snapshot.path(), "Expected a collection, found a scalar");
        return BTreeMap::new();
    };

    children
        .iter()
        .filter_map(|(key, child)| match T::deserialize(child) {
            Ok(record) => Some((K::from(key.clone()), record)),
            Err(e) => {
                tracing::warn!(path = %snapshot.path(), key = %key, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect()
}
