//! Snapshots, snapshot streams and cancellable subscriptions.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::StorePath;

/// The value at a path at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    path: StorePath,
    value: Option<Value>,
}

impl Snapshot {
    #[must_use]
    pub const fn new(path: StorePath, value: Option<Value>) -> Self {
        Self { path, value }
    }

    #[must_use]
    pub const fn path(&self) -> &StorePath {
        &self.path
    }

    /// The key of the node this snapshot was taken at.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.path.key()
    }

    /// Returns `true` if a value exists at the path.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.value.is_some()
    }

    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// Deserialize the value, if any.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the value does not match `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.value.clone().map(serde_json::from_value).transpose()
    }
}

/// A stream of snapshots for one path.
///
/// The first call to [`next`](Self::next) yields the current value. Later
/// calls yield the latest value after each change; intermediate values may be
/// skipped if the consumer falls behind. The stream ends when its producer
/// stops, e.g. when the backend cancels the listener.
#[derive(Debug)]
pub struct SnapshotStream {
    rx: watch::Receiver<Option<Snapshot>>,
    _producer: Option<Subscription>,
}

impl SnapshotStream {
    /// Wrap a receiver. `producer`, if given, is cancelled when the stream is
    /// dropped.
    pub(crate) fn new(
        mut rx: watch::Receiver<Option<Snapshot>>,
        producer: Option<Subscription>,
    ) -> Self {
        rx.mark_changed();
        Self {
            rx,
            _producer: producer,
        }
    }

    /// Wait for the next snapshot. Returns `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<Snapshot> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(snapshot) = self.rx.borrow_and_update().clone() {
                return Some(snapshot);
            }
        }
    }
}

/// Handle to a running listener.
///
/// The listener is cancelled when the handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called. After that, its callback is
/// never invoked again.
#[must_use = "dropping a Subscription cancels it"]
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn<F>(listener: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            task: tokio::spawn(listener),
        }
    }

    /// Stop listening.
    pub fn unsubscribe(self) {
        self.task.abort();
    }

    /// Returns `true` while the listener is still running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}
