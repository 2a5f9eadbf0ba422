//! Sinks: retained handles that enqueue actions from outside the render pass.
//!
//! A [`Sink`] is the one capability a workflow may hand out that stays valid
//! after its render pass returns. It captures the owning node's id and a
//! sender for the tree's single action queue; firing it from any thread or
//! task enqueues an action, and the runtime applies queued actions strictly
//! one at a time. Sinks never touch state directly, which is what makes
//! them safe to retain and share, unlike the
//! [`RenderContext`](crate::context::RenderContext) they were created from.
//!
//! # Examples
//!
//! Adapting a platform event type into the workflow's action vocabulary:
//!
//! ```rust
//! use renderloom::sink::Sink;
//!
//! enum ButtonEvent {
//!     Pressed,
//!     Released,
//! }
//!
//! enum FormAction {
//!     Submit,
//!     Touched,
//! }
//!
//! fn wire_button(sink: Sink<FormAction>) -> Sink<ButtonEvent> {
//!     sink.contramap(|event| match event {
//!         ButtonEvent::Pressed => FormAction::Submit,
//!         ButtonEvent::Released => FormAction::Touched,
//!     })
//! }
//! ```

use miette::Diagnostic;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::types::NodeId;

/// Type-erased action payload carried by the queue.
pub(crate) type ErasedAction = Box<dyn Any + Send>;

/// Type-erased output handed up from a child to its parent's output map.
pub(crate) type ErasedOutput = Box<dyn Any + Send>;

/// Where a queued action came from, for step reports and tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSource {
    /// Enqueued by a retained [`Sink`] (typically a platform callback).
    Sink,
    /// Delivered by a worker subscription's outlet.
    Worker,
}

/// One entry of the tree-wide action queue.
///
/// The queue is the only synchronization point between concurrent producers
/// and the single-threaded state tree: producers enqueue, the runtime
/// consumes in FIFO order.
pub struct QueuedAction {
    pub(crate) target: NodeId,
    pub(crate) source: ActionSource,
    pub(crate) action: ErasedAction,
}

impl fmt::Debug for QueuedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedAction")
            .field("target", &self.target)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// Errors surfaced when an enqueue does not go through.
#[derive(Debug, Error, Diagnostic)]
pub enum SinkError {
    /// The runtime (and with it the queue receiver) is gone.
    #[error("action not enqueued: runtime closed")]
    #[diagnostic(
        code(renderloom::sink::runtime_closed),
        help("The TreeRunner owning this sink's node was dropped. Retained sinks outlive the runtime; drop them or ignore this error during shutdown.")
    )]
    RuntimeClosed,

    /// A bounded action queue is at capacity.
    #[error("action not enqueued: queue full")]
    #[diagnostic(
        code(renderloom::sink::queue_full),
        help("Raise the queue capacity in RuntimeConfig or drive the runner faster; Sink::send never blocks the caller.")
    )]
    QueueFull,
}

/// Retained, thread-safe handle for enqueuing actions against one node.
///
/// Obtained from [`RenderContext::make_sink`](crate::context::RenderContext::make_sink)
/// during a render pass; safe to clone, store in renderings, move into
/// platform callbacks, and fire from any thread. An action fired after its
/// node was torn down is discarded by the runtime as stale; firing a sink
/// is never an error on account of tree shape, only on account of the queue
/// itself ([`SinkError`]).
pub struct Sink<A> {
    target: NodeId,
    tx: flume::Sender<QueuedAction>,
    map: Arc<dyn Fn(A) -> ErasedAction + Send + Sync>,
}

impl<A: Send + 'static> Sink<A> {
    pub(crate) fn new(target: NodeId, tx: flume::Sender<QueuedAction>) -> Self {
        Self {
            target,
            tx,
            map: Arc::new(|action: A| Box::new(action) as ErasedAction),
        }
    }

    /// Enqueue `action` for this sink's node. Non-blocking; FIFO with every
    /// other producer on the same tree.
    pub fn send(&self, action: A) -> Result<(), SinkError> {
        let queued = QueuedAction {
            target: self.target,
            source: ActionSource::Sink,
            action: (self.map)(action),
        };
        self.tx.try_send(queued).map_err(|err| match err {
            flume::TrySendError::Full(_) => SinkError::QueueFull,
            flume::TrySendError::Disconnected(_) => SinkError::RuntimeClosed,
        })
    }

    /// Derive a sink that accepts `E` by translating each event into this
    /// sink's action type. The derived sink targets the same node and queue.
    #[must_use]
    pub fn contramap<E: Send + 'static>(
        &self,
        f: impl Fn(E) -> A + Send + Sync + 'static,
    ) -> Sink<E> {
        let map = Arc::clone(&self.map);
        Sink {
            target: self.target,
            tx: self.tx.clone(),
            map: Arc::new(move |event: E| map(f(event))),
        }
    }
}

impl<A> Clone for Sink<A> {
    fn clone(&self) -> Self {
        Self {
            target: self.target,
            tx: self.tx.clone(),
            map: Arc::clone(&self.map),
        }
    }
}

impl<A> fmt::Debug for Sink<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
