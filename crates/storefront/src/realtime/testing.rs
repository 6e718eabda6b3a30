//! A store wrapper that fails or stalls chosen operations.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{MemoryStore, RealtimeStore, Snapshot, SnapshotStream, StoreError, StorePath};

/// Forwards to a [`MemoryStore`] except where told to fail.
#[derive(Clone, Default)]
pub(crate) struct FaultyStore {
    pub(crate) inner: MemoryStore,
    /// `push` fails everywhere.
    pub(crate) fail_push: bool,
    /// `remove` fails everywhere.
    pub(crate) fail_remove: bool,
    /// `set` fails at or below this top level key.
    pub(crate) fail_set_under: Option<&'static str>,
    /// `get` sleeps this long before answering.
    pub(crate) get_delay: Option<Duration>,
}

impl FaultyStore {
    pub(crate) fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }
}

fn rejected(path: &StorePath) -> StoreError {
    StoreError::Api {
        status: 503,
        message: format!("write to {path} rejected"),
    }
}

#[async_trait]
impl RealtimeStore for FaultyStore {
    async fn get(&self, path: &StorePath) -> Result<Snapshot, StoreError> {
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get(path).await
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        let blocked = self
            .fail_set_under
            .is_some_and(|key| path.segments().first().is_some_and(|first| first == key));
        if blocked {
            return Err(rejected(path));
        }
        self.inner.set(path, value).await
    }

    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.inner.update(path, patch).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        if self.fail_remove {
            return Err(rejected(path));
        }
        self.inner.remove(path).await
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        if self.fail_push {
            return Err(rejected(path));
        }
        self.inner.push(path, value).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        self.inner.subscribe(path).await
    }
}
