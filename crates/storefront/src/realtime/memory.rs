//! In-process realtime store.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::push_id::PushIdGenerator;
use super::tree;
use super::{RealtimeStore, Snapshot, SnapshotStream, StoreError, StorePath};

struct Watcher {
    path: StorePath,
    tx: watch::Sender<Option<Snapshot>>,
}

#[derive(Default)]
struct Inner {
    root: Value,
    watchers: Vec<Watcher>,
}

impl Inner {
    /// Apply a batch of writes atomically, then notify every watcher whose
    /// path overlaps one of them.
    fn apply(&mut self, writes: Vec<(StorePath, Option<Value>)>) {
        let now_ms = Utc::now().timestamp_millis();
        let mut touched = Vec::with_capacity(writes.len());

        for (path, value) in writes {
            let value = value.and_then(|mut value| {
                tree::resolve_server_values(&mut value, now_ms);
                tree::normalize(value)
            });
            tree::write(&mut self.root, path.segments(), value);
            touched.push(path);
        }

        self.watchers.retain(|watcher| !watcher.tx.is_closed());
        for watcher in &self.watchers {
            if !touched.iter().any(|path| path.overlaps(&watcher.path)) {
                continue;
            }
            let current = tree::value_at(&self.root, watcher.path.segments()).cloned();
            watcher.tx.send_if_modified(|slot| {
                if slot.as_ref().map(Snapshot::value) == Some(current.as_ref()) {
                    return false;
                }
                *slot = Some(Snapshot::new(watcher.path.clone(), current));
                true
            });
        }
    }
}

/// A realtime store held entirely in memory.
///
/// Data does not survive a restart. A JSON seed file can provide the initial
/// tree, e.g. a catalog and a pre-promoted admin profile.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    ids: Arc<PushIdGenerator>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `tree`.
    #[must_use]
    pub fn with_tree(tree: Value) -> Self {
        let store = Self::new();
        store.lock().root = tree::normalize(tree).unwrap_or(Value::Null);
        store
    }

    /// Create a store from a JSON seed file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read, or an
    /// `InvalidData` error if it is not JSON.
    pub async fn from_seed_file(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let tree: Value = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(Self::with_tree(tree))
    }

    /// A copy of the whole tree.
    #[must_use]
    pub fn dump(&self) -> Value {
        self.lock().root.clone()
    }

    /// Number of live watchers, for diagnostics.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        let mut inner = self.lock();
        inner.watchers.retain(|watcher| !watcher.tx.is_closed());
        inner.watchers.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RealtimeStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Snapshot, StoreError> {
        let inner = self.lock();
        let value = tree::value_at(&inner.root, path.segments()).cloned();
        Ok(Snapshot::new(path.clone(), value))
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.lock().apply(vec![(path.clone(), Some(value))]);
        Ok(())
    }

    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError> {
        let writes = patch
            .into_iter()
            .map(|(key, value)| {
                let mut target = path.clone();
                for segment in key.split('/').filter(|segment| !segment.is_empty()) {
                    target = target.child(segment)?;
                }
                if target == *path {
                    return Err(StoreError::InvalidPath(format!("empty update key {key:?}")));
                }
                Ok((target, Some(value)))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;
        self.lock().apply(writes);
        Ok(())
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.lock().apply(vec![(path.clone(), None)]);
        Ok(())
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        let key = self.ids.generate();
        let target = path.clone().child(&key)?;
        self.lock().apply(vec![(target, Some(value))]);
        Ok(key)
    }

    async fn subscribe(&self, path: &StorePath) -> Result<SnapshotStream, StoreError> {
        let mut inner = self.lock();
        let current = tree::value_at(&inner.root, path.segments()).cloned();
        let (tx, rx) = watch::channel(Some(Snapshot::new(path.clone(), current)));
        inner.watchers.push(Watcher {
            path: path.clone(),
            tx,
        });
        Ok(SnapshotStream::new(rx, None))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::realtime::ServerValue;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::new();
        store.set(&path("products/p1"), json!({"name": "Bolt"})).await.unwrap();
        let snapshot = store.get(&path("products/p1/name")).await.unwrap();
        assert_eq!(snapshot.value(), Some(&json!("Bolt")));

        store.remove(&path("products/p1")).await.unwrap();
        assert!(!store.get(&path("products")).await.unwrap().exists());
        assert_eq!(store.dump(), Value::Null);
    }

    #[tokio::test]
    async fn test_set_null_deletes() {
        let store = MemoryStore::with_tree(json!({"carts": {"u1": {"p1": 1}}}));
        store.set(&path("carts/u1/p1"), Value::Null).await.unwrap();
        assert!(!store.get(&path("carts/u1")).await.unwrap().exists());
    }

    #[tokio::test]
    async fn test_update_merges_and_accepts_deep_keys() {
        let store = MemoryStore::with_tree(json!({"orders": {"o1": {"status": "Pending", "total": 5}}}));
        let mut patch = Map::new();
        patch.insert("status".into(), json!("Shipped"));
        store.update(&path("orders/o1"), patch).await.unwrap();

        let mut deep = Map::new();
        deep.insert("o1/total".into(), Value::Null);
        store.update(&path("orders"), deep).await.unwrap();

        assert_eq!(store.dump(), json!({"orders": {"o1": {"status": "Shipped"}}}));
    }

    #[tokio::test]
    async fn test_push_generates_ordered_keys_and_resolves_timestamps() {
        let store = MemoryStore::new();
        let first = store
            .push(&path("orders"), json!({"timestamp": ServerValue::Timestamp}))
            .await
            .unwrap();
        let second = store.push(&path("orders"), json!({"n": 2})).await.unwrap();
        assert!(first < second);

        let stamp = store
            .get(&path(&format!("orders/{first}/timestamp")))
            .await
            .unwrap();
        assert!(stamp.value().unwrap().as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_subscribe_emits_initial_and_changes() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe(&path("products")).await.unwrap();
        assert!(!stream.next().await.unwrap().exists());

        store.set(&path("products/p1/name"), json!("Bolt")).await.unwrap();
        let next = stream.next().await.unwrap();
        assert_eq!(next.value(), Some(&json!({"p1": {"name": "Bolt"}})));
    }

    #[tokio::test]
    async fn test_unrelated_writes_do_not_notify() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe(&path("carts/u1")).await.unwrap();
        stream.next().await.unwrap();

        store.set(&path("carts/u2/p1"), json!(1)).await.unwrap();
        let waited = tokio::time::timeout(Duration::from_millis(50), stream.next()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_ancestor_write_notifies_descendant_watcher() {
        let store = MemoryStore::new();
        let mut stream = store.subscribe(&path("orders/o1/status")).await.unwrap();
        stream.next().await.unwrap();

        store
            .set(&path("orders"), json!({"o1": {"status": "Pending"}}))
            .await
            .unwrap();
        assert_eq!(stream.next().await.unwrap().value(), Some(&json!("Pending")));
    }

    #[tokio::test]
    async fn test_dropped_streams_are_pruned() {
        let store = MemoryStore::new();
        let stream = store.subscribe(&path("products")).await.unwrap();
        assert_eq!(store.watcher_count(), 1);
        drop(stream);
        assert_eq!(store.watcher_count(), 0);
    }
}
