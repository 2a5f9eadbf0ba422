//! The per-pass [`RenderContext`]: how a workflow composes children, hands
//! out sinks, and declares worker subscriptions.
//!
//! A context is a capability token with a deliberately narrow validity
//! window: it is handed to [`Workflow::render`](crate::workflow::Workflow::render)
//! and revoked the moment that call returns. The handle itself is cheap to
//! clone and `'static`, so user closures *can* capture it; that is exactly
//! why every operation re-checks validity instead of relying on scope rules.
//! A captured context used later fails with [`ContextError::UseAfterRender`]
//! rather than silently mutating a pass that already completed.
//!
//! Internally the owning node moves its child map and worker subscriptions
//! into the context for the duration of the pass and takes them back
//! afterwards; revocation is that take. See
//! [`WorkflowNode`](crate::node::WorkflowNode) for the surrounding pass
//! structure.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::node::{AnyNode, ChildEntry, WorkflowNode};
use crate::sink::{ErasedAction, ErasedOutput, QueuedAction, Sink};
use crate::types::{ChildKey, IdAllocator, NodeId};
use crate::workers::stream::StreamSource;
use crate::workers::subscription::WorkerSubscription;
use crate::workers::worker::{DeliveryMap, Worker, WorkerError, WorkerOutlet};
use crate::workflow::Workflow;
use futures_util::Stream;

/// Programmer errors raised by context operations.
///
/// Both variants are fatal to the render pass: they indicate a structural
/// bug in the calling workflow, not a condition to recover from.
#[derive(Debug, Error, Diagnostic)]
pub enum ContextError {
    /// The same `(child workflow type, key)` was rendered twice in one pass.
    #[error("duplicate child key: {kind}[{key}] was already rendered this pass")]
    #[diagnostic(
        code(renderloom::context::duplicate_child_key),
        help("Give each child of the same workflow type a distinct key within one render pass.")
    )]
    DuplicateChildKey {
        /// Workflow type label of the colliding child.
        kind: &'static str,
        /// The caller-supplied key used twice.
        key: String,
    },

    /// A context operation ran after its owning render call returned.
    #[error("render context used after its render pass returned")]
    #[diagnostic(
        code(renderloom::context::use_after_render),
        help("A RenderContext is only valid inside the render call it was passed to. Capture a Sink for later use instead of the context.")
    )]
    UseAfterRender,
}

/// Pass-scoped working set the owning node lends to its context.
///
/// Ownership of the previous pass's children and subscriptions moves in
/// here; what the pass requests accumulates alongside; the node reclaims
/// the whole scratch when the render call returns and reconciles the two.
pub(crate) struct RenderScratch<W: Workflow> {
    pub(crate) node_id: NodeId,
    pub(crate) queue: flume::Sender<QueuedAction>,
    pub(crate) ids: IdAllocator,
    pub(crate) prev_children: FxHashMap<ChildKey, ChildEntry<W::Action>>,
    pub(crate) next_children: FxHashMap<ChildKey, ChildEntry<W::Action>>,
    pub(crate) prev_workers: Vec<WorkerSubscription>,
    pub(crate) kept_workers: Vec<WorkerSubscription>,
    pub(crate) pending_workers: Vec<Box<dyn FnOnce() -> WorkerSubscription + Send>>,
}

/// The façade a workflow's `render` uses to request composition.
///
/// Valid strictly within the render call it was passed to; see the module
/// docs for the revocation contract. All operations are `&self`, so the
/// context can be threaded through helper functions freely.
pub struct RenderContext<W: Workflow> {
    cell: Arc<Mutex<Option<RenderScratch<W>>>>,
}

impl<W: Workflow> RenderContext<W> {
    pub(crate) fn new(cell: Arc<Mutex<Option<RenderScratch<W>>>>) -> Self {
        Self { cell }
    }

    /// Render `child` under `key`, returning its rendering for embedding in
    /// this workflow's own rendering.
    ///
    /// The child node for `(type of child, key)` is created on first request
    /// (state from `child.initial_state()`) and kept, state intact, as
    /// long as every subsequent pass re-requests the same slot. A slot not
    /// re-requested is torn down when the pass completes. `output_map`
    /// translates the child's outputs into this workflow's actions and is
    /// captured fresh each pass.
    ///
    /// # Errors
    ///
    /// [`ContextError::DuplicateChildKey`] when this pass already rendered
    /// the same slot (nothing is mutated); [`ContextError::UseAfterRender`]
    /// when the pass is over.
    pub fn render_child<C, F>(
        &self,
        child: C,
        key: impl Into<String>,
        output_map: F,
    ) -> Result<C::Rendering, ContextError>
    where
        C: Workflow,
        F: Fn(C::Output) -> W::Action + Send + Sync + 'static,
    {
        let mut guard = self.cell.lock().expect("render scratch poisoned");
        let scratch = guard.as_mut().ok_or(ContextError::UseAfterRender)?;

        let key = key.into();
        let child_key = ChildKey::of::<C>(key.clone());
        if scratch.next_children.contains_key(&child_key) {
            return Err(ContextError::DuplicateChildKey {
                kind: child_key.kind(),
                key,
            });
        }

        let erased_map: Arc<dyn Fn(ErasedOutput) -> W::Action + Send + Sync> =
            Arc::new(move |output: ErasedOutput| {
                let output = output
                    .downcast::<C::Output>()
                    .expect("child key guarantees the output type");
                output_map(*output)
            });

        let (node, rendering) = match scratch.prev_children.remove(&child_key) {
            Some(mut entry) => {
                let rendered = {
                    let node = entry
                        .node
                        .as_any_mut()
                        .downcast_mut::<WorkflowNode<C>>()
                        .expect("child key guarantees the node type");
                    node.set_definition(child);
                    node.render()
                };
                match rendered {
                    Ok(rendering) => (entry.node, rendering),
                    Err(err) => {
                        // Put the subtree back so a failed pass can be
                        // reassembled by the owning node.
                        scratch.prev_children.insert(child_key, entry);
                        return Err(err);
                    }
                }
            }
            None => {
                let mut node =
                    WorkflowNode::new(child, scratch.ids.clone(), scratch.queue.clone());
                let rendering = node.render()?;
                (Box::new(node) as Box<dyn AnyNode>, rendering)
            }
        };

        scratch.next_children.insert(
            child_key,
            ChildEntry {
                node,
                output_map: erased_map,
            },
        );
        Ok(rendering)
    }

    /// A sink that enqueues this workflow's actions against the owning node.
    ///
    /// May be called any number of times per pass; every returned sink is
    /// independently usable and, unlike the context, safe to retain
    /// indefinitely and fire from any thread.
    pub fn make_sink(&self) -> Result<Sink<W::Action>, ContextError> {
        let guard = self.cell.lock().expect("render scratch poisoned");
        let scratch = guard.as_ref().ok_or(ContextError::UseAfterRender)?;
        Ok(Sink::new(scratch.node_id, scratch.queue.clone()))
    }

    /// Declare a worker subscription for this pass.
    ///
    /// If a subscription from the previous pass has a worker judging `worker`
    /// equivalent ([`Worker::matches`]), it is kept untouched (no restart,
    /// no duplicate delivery) and `worker` is dropped. Otherwise the worker
    /// starts after this pass completes (stale subscriptions are cancelled
    /// first). `output_map` also receives the worker's terminal failure, so
    /// the owning workflow decides the failure policy.
    pub fn await_result<K, F>(&self, worker: K, output_map: F) -> Result<(), ContextError>
    where
        K: Worker,
        F: Fn(Result<K::Output, WorkerError>) -> W::Action + Send + Sync + 'static,
    {
        let deliver: DeliveryMap<K::Output> =
            Arc::new(move |event| Some(Box::new(output_map(event)) as ErasedAction));
        self.declare(worker, deliver)
    }

    /// Declare a subscription to a push-based source for this pass.
    ///
    /// `source` is wrapped in a [`StreamSource`] keyed by `key`; equivalence
    /// across passes is `(item type, key)`, so redeclaring the same key keeps
    /// the original subscription and drops the freshly built `source`
    /// unconsumed. Stream items cannot fail; the stream simply ending is
    /// silent.
    pub fn subscribe<S, F>(
        &self,
        key: impl Into<String>,
        source: S,
        output_map: F,
    ) -> Result<(), ContextError>
    where
        S: Stream + Send + 'static,
        S::Item: Send + 'static,
        F: Fn(S::Item) -> W::Action + Send + Sync + 'static,
    {
        let deliver: DeliveryMap<S::Item> = Arc::new(move |event| match event {
            Ok(item) => Some(Box::new(output_map(item)) as ErasedAction),
            Err(_) => None,
        });
        self.declare(StreamSource::new(key, source), deliver)
    }

    fn declare<K: Worker>(
        &self,
        worker: K,
        deliver: DeliveryMap<K::Output>,
    ) -> Result<(), ContextError> {
        let mut guard = self.cell.lock().expect("render scratch poisoned");
        let scratch = guard.as_mut().ok_or(ContextError::UseAfterRender)?;

        if let Some(pos) = scratch
            .prev_workers
            .iter()
            .position(|sub| sub.matches(&worker as &dyn Any))
        {
            let sub = scratch.prev_workers.swap_remove(pos);
            tracing::trace!(worker = sub.kind(), "worker redeclared; keeping subscription");
            scratch.kept_workers.push(sub);
            return Ok(());
        }

        let outlet = WorkerOutlet::new(scratch.node_id, scratch.queue.clone(), deliver);
        scratch
            .pending_workers
            .push(Box::new(move || WorkerSubscription::start(worker, outlet)));
        Ok(())
    }
}

impl<W: Workflow> Clone for RenderContext<W> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<W: Workflow> std::fmt::Debug for RenderContext<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live = self
            .cell
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false);
        f.debug_struct("RenderContext").field("live", &live).finish()
    }
}
