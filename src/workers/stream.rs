//! Adapter turning any [`Stream`] into a keyed worker for
//! [`RenderContext::subscribe`](crate::context::RenderContext::subscribe).
//!
//! Push-based sources (channels, broadcast receivers, decoded socket
//! frames) don't implement [`Worker`] themselves; `StreamSource` wraps one
//! together with a caller-chosen key. Equivalence is `(item type, key)`:
//! redeclaring the same key each pass keeps the original subscription and
//! quietly drops the freshly constructed stream, so the source is only ever
//! consumed by the pass that first declared it.

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use std::sync::Mutex;

use super::worker::{Worker, WorkerError, WorkerOutlet};

/// A [`Worker`] over an arbitrary stream, identified by a key string.
pub struct StreamSource<S: Stream> {
    key: String,
    stream: Mutex<Option<S>>,
}

impl<S: Stream> StreamSource<S> {
    /// Wrap `stream` under `key`. The key carries the equivalence: same key
    /// (and item type) on consecutive passes means "same ongoing source".
    pub fn new(key: impl Into<String>, stream: S) -> Self {
        Self {
            key: key.into(),
            stream: Mutex::new(Some(stream)),
        }
    }

    /// The equivalence key this source was declared under.
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait]
impl<S> Worker for StreamSource<S>
where
    S: Stream + Send + 'static,
    S::Item: Send + 'static,
{
    type Output = S::Item;

    fn matches(&self, other: &Self) -> bool {
        self.key == other.key
    }

    async fn run(&self, outlet: WorkerOutlet<S::Item>) -> Result<(), WorkerError> {
        let stream = {
            let mut slot = self.stream.lock().expect("stream source poisoned");
            slot.take()
        };
        // A kept re-declaration never runs, so the slot is only empty if the
        // bridge started the same subscription twice.
        let Some(stream) = stream else {
            return Err(WorkerError::msg("stream source already consumed"));
        };
        let mut stream = Box::pin(stream);
        while let Some(item) = stream.next().await {
            if outlet.send(item).await.is_err() {
                break;
            }
        }
        Ok(())
    }
}
