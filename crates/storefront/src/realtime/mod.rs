//! Realtime tree store.
//!
//! The catalog, carts, orders and user profiles live in one JSON tree with
//! Firebase Realtime Database semantics: values are addressed by slash
//! separated paths, `null` means absent, and any path can be watched for
//! changes. [`RealtimeStore`] is the seam; [`MemoryStore`] keeps the tree in
//! process and [`FirebaseStore`] speaks the REST streaming protocol.

pub mod firebase;
pub mod memory;
mod path;
pub mod push_id;
mod subscription;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod tree;

use async_trait::async_trait;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;
pub use path::StorePath;
pub use subscription::{Snapshot, SnapshotStream, Subscription};

/// Errors from the realtime store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A path or update key contains an invalid segment.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The backend rejected the request's credentials or rules.
    #[error("permission denied at {0}")]
    PermissionDenied(String),

    /// The backend answered with an error status.
    #[error("store returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never completed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Values the store fills in when a write is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerValue {
    /// The store's clock, in milliseconds since the Unix epoch.
    Timestamp,
}

impl Serialize for ServerValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Self::Timestamp => map.serialize_entry(".sv", "timestamp")?,
        }
        map.end()
    }
}

/// A hierarchical JSON store with change notification.
///
/// Writes are last-writer-wins per path. Writing `null` (or an empty object)
/// deletes the node.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    /// Read the value at `path` once.
    async fn get(&self, path: &StorePath) -> Result<Snapshot, StoreError>;

    /// Replace the value at `path`.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Merge `patch` into the node at `path`.
    ///
    /// Keys may be slash separated relative paths; each one is written as if
    /// by [`set`](Self::set), and a `null` value deletes that child.
    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError>;

    /// Delete the node at `path` and everything beneath it.
    async fn remove(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Store `value` under a new chronologically ordered key below `path`
    /// and return that key.
    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError>;

    /// Watch the value at `path`.
    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_server_timestamp_wire_format() {
        assert_eq!(
            serde_json::to_value(ServerValue::Timestamp).unwrap(),
            json!({".sv": "timestamp"})
        );
    }
}
