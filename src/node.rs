//! Live tree nodes: one [`WorkflowNode`] per `(workflow type, key)` slot.
//!
//! A node owns exactly one workflow instance's state, the keyed map of its
//! child nodes, and its active worker subscriptions. Nothing outside the
//! node reads or writes any of that: actions arrive through [`apply`] one at
//! a time, and render passes run through [`render`], which lends the node's
//! composition state to a fresh [`RenderContext`](crate::context::RenderContext)
//! and reconciles children and workers when the pass returns.
//!
//! Parents exclusively own their children through the child map; children
//! never hold a reference back. Upward communication is the returned output
//! of [`apply`], which the parent translates through the output map it
//! captured at the `render_child` call site.
//!
//! [`apply`]: WorkflowNode::apply
//! [`render`]: WorkflowNode::render

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::any::Any;
use std::mem;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::context::{ContextError, RenderContext, RenderScratch};
use crate::sink::{ErasedAction, ErasedOutput, QueuedAction};
use crate::telemetry::NodeSummary;
use crate::types::{ChildKey, IdAllocator, NodeId, short_type_name};
use crate::workers::subscription::WorkerSubscription;
use crate::workflow::Workflow;

/// One child slot as stored by its parent: the erased node plus the output
/// translation captured at the most recent `render_child` call.
pub(crate) struct ChildEntry<A> {
    pub(crate) node: Box<dyn AnyNode>,
    pub(crate) output_map: Arc<dyn Fn(ErasedOutput) -> A + Send + Sync>,
}

/// Result of routing one action into a subtree.
pub(crate) enum ApplyOutcome {
    /// The target node is not in this subtree; the action is handed back so
    /// a sibling subtree can be tried.
    NotFound(ErasedAction),
    /// The target applied the action; the payload is this subtree root's own
    /// output, if the cascade produced one.
    Applied(Option<ErasedOutput>),
}

/// Fatal dispatch faults. These mean the program wired incompatible pieces
/// together, never that the tree is in a bad state.
#[derive(Debug, Error, Diagnostic)]
pub enum ApplyError {
    /// An action of the wrong type reached a node.
    #[error("action of unexpected type delivered to {kind} node {node}")]
    #[diagnostic(
        code(renderloom::node::action_type_mismatch),
        help("Every Sink carries the action type of the node it was created for; do not forge queue entries by other means.")
    )]
    ActionTypeMismatch {
        /// Workflow type label of the receiving node.
        kind: &'static str,
        /// The receiving node.
        node: NodeId,
    },
}

/// Object-safe handle letting a parent hold children of arbitrary workflow
/// types in one map.
pub(crate) trait AnyNode: Send {
    fn id(&self) -> NodeId;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn apply_erased(
        &mut self,
        target: NodeId,
        action: ErasedAction,
    ) -> Result<ApplyOutcome, ApplyError>;
    fn summary(&self) -> NodeSummary;
}

/// The live, stateful instance of one workflow within the tree.
///
/// Created when a parent's pass first requests its `(type, key)` slot;
/// retained and mutated across passes while the parent keeps requesting it;
/// dropped (state discarded, subscriptions cancelled, children recursively
/// dropped) the first pass that doesn't.
pub struct WorkflowNode<W: Workflow> {
    id: NodeId,
    kind: &'static str,
    definition: W,
    state: W::State,
    children: FxHashMap<ChildKey, ChildEntry<W::Action>>,
    workers: Vec<WorkerSubscription>,
    generation: u64,
    ids: IdAllocator,
    queue: flume::Sender<QueuedAction>,
}

impl<W: Workflow> WorkflowNode<W> {
    pub(crate) fn new(definition: W, ids: IdAllocator, queue: flume::Sender<QueuedAction>) -> Self {
        let id = ids.next();
        let state = definition.initial_state();
        tracing::debug!(kind = short_type_name::<W>(), node = %id, "node created");
        Self {
            id,
            kind: short_type_name::<W>(),
            definition,
            state,
            children: FxHashMap::default(),
            workers: Vec::new(),
            generation: 0,
            ids,
            queue,
        }
    }

    /// Replace the stored definition (props). State is untouched.
    pub(crate) fn set_definition(&mut self, definition: W) {
        self.definition = definition;
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    /// Run one render pass on this node (and, through the context,
    /// recursively on every requested child).
    ///
    /// The pass lends this node's children and subscriptions to a fresh
    /// context, calls the workflow's `render`, then revokes the context and
    /// reconciles: children not re-requested are dropped, stale worker
    /// subscriptions are cancelled before newly declared workers start.
    ///
    /// On error the lent state is reassembled unchanged, with no teardown
    /// and no new subscriptions, so a `DuplicateChildKey` leaves the tree
    /// exactly as the previous pass built it.
    pub(crate) fn render(&mut self) -> Result<W::Rendering, ContextError> {
        self.generation += 1;
        let span = tracing::debug_span!(
            "render",
            kind = self.kind,
            node = %self.id,
            generation = self.generation,
        );
        let _enter = span.enter();

        let scratch = RenderScratch::<W> {
            node_id: self.id,
            queue: self.queue.clone(),
            ids: self.ids.clone(),
            prev_children: mem::take(&mut self.children),
            next_children: FxHashMap::default(),
            prev_workers: mem::take(&mut self.workers),
            kept_workers: Vec::new(),
            pending_workers: Vec::new(),
        };
        let cell = Arc::new(Mutex::new(Some(scratch)));
        let ctx = RenderContext::new(Arc::clone(&cell));

        let result = self.definition.render(&self.state, &ctx);

        // Revocation: any context clone held past this point sees an empty
        // cell and fails with UseAfterRender.
        let scratch = cell
            .lock()
            .expect("render scratch poisoned")
            .take()
            .expect("render scratch present until revoked");

        match result {
            Ok(rendering) => {
                self.finish_pass(scratch);
                Ok(rendering)
            }
            Err(err) => {
                self.restore_pass(scratch);
                Err(err)
            }
        }
    }

    /// Commit a successful pass: teardown first, then worker starts.
    fn finish_pass(&mut self, scratch: RenderScratch<W>) {
        for (key, entry) in scratch.prev_children {
            tracing::debug!(child = %key, node = %entry.node.id(), "tearing down child not re-requested");
        }
        if !scratch.prev_workers.is_empty() {
            tracing::debug!(
                count = scratch.prev_workers.len(),
                "cancelling subscriptions for workers not redeclared"
            );
        }
        drop(scratch.prev_workers);

        let mut workers = scratch.kept_workers;
        for start in scratch.pending_workers {
            workers.push(start());
        }
        self.workers = workers;
        self.children = scratch.next_children;
    }

    /// Reassemble the pre-pass tree after a failed pass.
    fn restore_pass(&mut self, scratch: RenderScratch<W>) {
        let mut children = scratch.prev_children;
        children.extend(scratch.next_children);
        self.children = children;

        let mut workers = scratch.prev_workers;
        workers.extend(scratch.kept_workers);
        self.workers = workers;
        // pending_workers were never started; dropping them is a no-op.
    }

    /// Route `action` to `target` within this subtree and cascade any output
    /// up through the output maps captured on the way down.
    ///
    /// When a descendant's update emits an output, each ancestor on the path
    /// translates it into one of its own actions and applies it immediately,
    /// still within the same tree step; the value returned here is therefore
    /// always an output of *this* node's workflow.
    pub(crate) fn apply(
        &mut self,
        target: NodeId,
        action: ErasedAction,
    ) -> Result<ApplyOutcome, ApplyError> {
        if target == self.id {
            let action = action
                .downcast::<W::Action>()
                .map_err(|_| ApplyError::ActionTypeMismatch {
                    kind: self.kind,
                    node: self.id,
                })?;
            let output = self.definition.update(&mut self.state, *action);
            tracing::debug!(
                kind = self.kind,
                node = %self.id,
                emitted = output.is_some(),
                "action applied"
            );
            return Ok(ApplyOutcome::Applied(
                output.map(|out| Box::new(out) as ErasedOutput),
            ));
        }

        let mut action = action;
        for entry in self.children.values_mut() {
            match entry.node.apply_erased(target, action)? {
                ApplyOutcome::NotFound(unconsumed) => action = unconsumed,
                ApplyOutcome::Applied(None) => return Ok(ApplyOutcome::Applied(None)),
                ApplyOutcome::Applied(Some(child_output)) => {
                    let own_action = (entry.output_map)(child_output);
                    let own_output = self.definition.update(&mut self.state, own_action);
                    tracing::debug!(
                        kind = self.kind,
                        node = %self.id,
                        emitted = own_output.is_some(),
                        "child output mapped and applied"
                    );
                    return Ok(ApplyOutcome::Applied(
                        own_output.map(|out| Box::new(out) as ErasedOutput),
                    ));
                }
            }
        }
        Ok(ApplyOutcome::NotFound(action))
    }

    /// Recursive diagnostic summary of this subtree.
    pub(crate) fn summary(&self) -> NodeSummary {
        let mut children: Vec<NodeSummary> = self
            .children
            .iter()
            .map(|(key, entry)| {
                let mut summary = entry.node.summary();
                summary.key = Some(key.key().to_string());
                summary
            })
            .collect();
        children.sort_by_key(|summary| summary.id);
        NodeSummary {
            id: self.id,
            kind: self.kind.to_string(),
            key: None,
            generation: self.generation,
            workers: self.workers.len(),
            children,
        }
    }
}

impl<W: Workflow> AnyNode for WorkflowNode<W> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn apply_erased(
        &mut self,
        target: NodeId,
        action: ErasedAction,
    ) -> Result<ApplyOutcome, ApplyError> {
        self.apply(target, action)
    }

    fn summary(&self) -> NodeSummary {
        WorkflowNode::summary(self)
    }
}
