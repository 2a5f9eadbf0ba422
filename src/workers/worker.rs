//! The [`Worker`] trait: external asynchronous event sources bridged into
//! the action queue.
//!
//! A worker represents ongoing outside work (a network call, a timer, a
//! device stream) whose events need to become actions on the declaring
//! node. Workflows declare workers every render pass via
//! [`RenderContext::await_result`](crate::context::RenderContext::await_result);
//! the bridge keeps a running subscription alive as long as an equivalent
//! worker keeps being declared, so re-declaring "I am still waiting on this
//! same operation" never resets the operation's progress.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::sink::{ActionSource, ErasedAction, QueuedAction, SinkError};
use crate::types::NodeId;

/// Failure of a worker's underlying source.
///
/// This is data, not a runtime fault: the bridge routes it through the
/// declaring node's output map as a terminal event, and that workflow's
/// `update` decides whether to retry, surface, or ignore it. The bridge
/// itself never retries.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("worker failed: {message}")]
pub struct WorkerError {
    message: String,
}

impl WorkerError {
    /// Wrap a failure message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An external asynchronous event source.
///
/// `matches` is the equivalence notion the bridge reconciles by: it answers
/// "does `other` represent the same ongoing work as me?". A kept
/// subscription is the *previous* pass's worker; newly declared equivalent
/// values are dropped without starting. Return `false` for logically
/// different work (a different URL, a different record id) so the bridge
/// cancels the old subscription and starts fresh.
///
/// `run` produces the events: a lazy, possibly-infinite sequence pushed
/// through the [`WorkerOutlet`]. It executes on its own tokio task and is
/// cancelled by abort when the subscription is torn down, so it must not
/// hold work that may not be interrupted at an await point.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Event type delivered to the declaring node's output map.
    type Output: Send + 'static;

    /// Whether `other` is the same ongoing work as `self`.
    fn matches(&self, other: &Self) -> bool
    where
        Self: Sized;

    /// Produce events until done, cancelled, or failed. An `Err` is
    /// delivered as a terminal event through the declaring output map.
    async fn run(&self, outlet: WorkerOutlet<Self::Output>) -> Result<(), WorkerError>;
}

/// Translation from a worker event (or terminal failure) into an erased
/// action for the declaring node, or `None` to drop the event.
pub(crate) type DeliveryMap<T> =
    Arc<dyn Fn(Result<T, WorkerError>) -> Option<ErasedAction> + Send + Sync>;

/// Push-side handle a running worker delivers events through.
///
/// Sending is the only point where a worker touches the tree: each event is
/// mapped to an action and enqueued on the same FIFO queue sinks use. Safe
/// to clone into concurrent subtasks of the worker.
pub struct WorkerOutlet<T> {
    target: NodeId,
    tx: flume::Sender<QueuedAction>,
    deliver: DeliveryMap<T>,
}

impl<T: Send + 'static> WorkerOutlet<T> {
    pub(crate) fn new(target: NodeId, tx: flume::Sender<QueuedAction>, deliver: DeliveryMap<T>) -> Self {
        Self {
            target,
            tx,
            deliver,
        }
    }

    /// Deliver one event. Returns [`SinkError::RuntimeClosed`] when the
    /// runtime is gone, which a long-running worker should treat as its cue
    /// to stop.
    pub async fn send(&self, item: T) -> Result<(), SinkError> {
        self.dispatch(Ok(item)).await
    }

    /// Deliver the terminal failure through the declaring output map.
    pub(crate) async fn fail(&self, error: WorkerError) -> Result<(), SinkError> {
        self.dispatch(Err(error)).await
    }

    async fn dispatch(&self, event: Result<T, WorkerError>) -> Result<(), SinkError> {
        let Some(action) = (self.deliver)(event) else {
            return Ok(());
        };
        let queued = QueuedAction {
            target: self.target,
            source: ActionSource::Worker,
            action,
        };
        self.tx
            .send_async(queued)
            .await
            .map_err(|_| SinkError::RuntimeClosed)
    }
}

impl<T> Clone for WorkerOutlet<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            tx: self.tx.clone(),
            deliver: Arc::clone(&self.deliver),
        }
    }
}

impl<T> fmt::Debug for WorkerOutlet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerOutlet")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
