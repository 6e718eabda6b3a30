//! Typed live queries.

use futures::Stream;

use super::RepositoryError;
use crate::realtime::{Snapshot, SnapshotStream, Subscription};

type Decoder<T> = Box<dyn Fn(&Snapshot) -> Result<T, RepositoryError> + Send + Sync>;

/// A query whose result is recomputed every time the underlying data changes.
///
/// The first value is the current state; each later value reflects a change.
pub struct Live<T> {
    stream: SnapshotStream,
    decode: Decoder<T>,
}

impl<T: Send + 'static> Live<T> {
    pub(crate) fn new<F>(stream: SnapshotStream, decode: F) -> Self
    where
        F: Fn(&Snapshot) -> Result<T, RepositoryError> + Send + Sync + 'static,
    {
        Self {
            stream,
            decode: Box::new(decode),
        }
    }

    /// Wait for the next value. Returns `None` once the listener has ended.
    pub async fn next(&mut self) -> Option<Result<T, RepositoryError>> {
        let snapshot = self.stream.next().await?;
        Some((self.decode)(&snapshot))
    }

    /// Invoke `callback` with the current value and again after every change,
    /// until the returned handle is dropped or unsubscribed.
    ///
    /// A listener that fails stops silently after logging the error.
    pub fn subscribe<F>(mut self, mut callback: F) -> Subscription
    where
        F: FnMut(T) + Send + 'static,
    {
        Subscription::spawn(async move {
            while let Some(result) = self.next().await {
                match result {
                    Ok(value) => callback(value),
                    Err(e) => {
                        tracing::warn!(error = %e, "Live query stopped");
                        return;
                    }
                }
            }
        })
    }

    /// Adapt into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = Result<T, RepositoryError>> + Send {
        futures::stream::unfold(self, |mut live| async move {
            let item = live.next().await?;
            Some((item, live))
        })
    }
}
