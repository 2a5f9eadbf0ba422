//! The top-level loop driving a render tree: Idle → Applying → Rendering.
//!
//! A [`TreeRunner`] owns the root [`WorkflowNode`](crate::node::WorkflowNode)
//! and the single ordered action queue every sink and worker outlet of the
//! tree feeds into. Exactly one action is applied per step; the full render
//! pass that application triggers, including all child and worker
//! reconciliation, completes before the next queued action is considered,
//! so a workflow's `render` always observes a tree consistent with exactly
//! the actions applied so far.
//!
//! Dropping the runner is teardown: the root node drops, which drops every
//! child recursively and aborts every worker subscription. Sinks retained
//! by the host keep working in the sense that `send` reports
//! `RuntimeClosed` instead of panicking.

use miette::Diagnostic;
use serde::Serialize;
use std::mem;
use thiserror::Error;
use tracing::instrument;

use crate::context::ContextError;
use crate::node::{ApplyError, ApplyOutcome, WorkflowNode};
use crate::sink::{ActionSource, QueuedAction};
use crate::telemetry::TreeSnapshot;
use crate::types::{IdAllocator, NodeId};
use crate::workflow::Workflow;

use super::config::RuntimeConfig;

/// Fatal runtime faults. Every variant is a programmer error per the error
/// taxonomy: the tree is aborted loudly rather than silently corrupted.
#[derive(Debug, Error, Diagnostic)]
pub enum RuntimeError {
    /// A render pass failed (duplicate child key, context misuse).
    #[error("render pass failed: {0}")]
    #[diagnostic(code(renderloom::runtime::render))]
    Render(#[from] ContextError),

    /// Dispatching a queued action failed (action type mismatch).
    #[error("action dispatch failed: {0}")]
    #[diagnostic(code(renderloom::runtime::dispatch))]
    Dispatch(#[from] ApplyError),
}

/// Record of one completed step, serializable for host-side logs.
#[derive(Clone, Debug, Serialize)]
pub struct StepReport {
    /// Step number (1-based; counts applied actions, not enqueued ones).
    pub step: u64,
    /// Node the applied action targeted.
    pub target: NodeId,
    /// Whether a sink or a worker enqueued it.
    pub source: ActionSource,
    /// Whether the cascade reached the root and published an output.
    pub output_published: bool,
    /// Stale actions discarded since the previous report.
    pub stale_discarded: u32,
}

/// Everything one step produced for the host.
pub struct TreeUpdate<W: Workflow> {
    /// The step this update belongs to.
    pub step: u64,
    /// The root rendering recomputed after the action applied.
    pub rendering: W::Rendering,
    /// The root workflow's output, if the cascade published one.
    pub output: Option<W::Output>,
    /// Diagnostic record of the step.
    pub report: StepReport,
}

/// Owns the root node and consumes the action queue, one action per step.
///
/// # Examples
///
/// See the crate-level quick start; the shape is always the same:
/// `render(props)` whenever the host has new input, then either
/// [`next_update`](Self::next_update) in an async driver loop or
/// [`try_step`](Self::try_step)/[`drain`](Self::drain) from a synchronous
/// pump.
pub struct TreeRunner<W: Workflow> {
    root: WorkflowNode<W>,
    queue_rx: flume::Receiver<QueuedAction>,
    config: RuntimeConfig,
    step: u64,
    stale_since_report: u32,
}

impl<W: Workflow> TreeRunner<W> {
    /// Build a runner with default configuration. The root node is created
    /// immediately (state from `initial_state`), but nothing renders until
    /// the host calls [`render`](Self::render).
    pub fn new(workflow: W) -> Self {
        Self::with_config(workflow, RuntimeConfig::default())
    }

    /// Build a runner with explicit [`RuntimeConfig`].
    pub fn with_config(workflow: W, config: RuntimeConfig) -> Self {
        let (queue_tx, queue_rx) = match config.queue_capacity {
            Some(capacity) => flume::bounded(capacity),
            None => flume::unbounded(),
        };
        let ids = IdAllocator::default();
        let root = WorkflowNode::new(workflow, ids, queue_tx);
        tracing::info!(runner = %config.runner_id, "tree runtime created");
        Self {
            root,
            queue_rx,
            config,
            step: 0,
            stale_since_report: 0,
        }
    }

    /// Render with fresh top-level props.
    ///
    /// Replaces the root's stored definition and performs a full top-down
    /// pass. This is the host's entry point whenever it wants an updated
    /// rendering outside the action loop.
    #[instrument(skip_all, fields(runner = %self.config.runner_id), err)]
    pub fn render(&mut self, workflow: W) -> Result<W::Rendering, RuntimeError> {
        self.root.set_definition(workflow);
        Ok(self.root.render()?)
    }

    /// Apply the next queued action if one is pending. Non-blocking.
    ///
    /// Returns `Ok(None)` when the queue is empty (or held only stale
    /// actions, which are discarded and counted, never applied).
    pub fn try_step(&mut self) -> Result<Option<TreeUpdate<W>>, RuntimeError> {
        loop {
            match self.queue_rx.try_recv() {
                Ok(queued) => {
                    if let Some(update) = self.dispatch(queued)? {
                        return Ok(Some(update));
                    }
                }
                Err(flume::TryRecvError::Empty | flume::TryRecvError::Disconnected) => {
                    return Ok(None);
                }
            }
        }
    }

    /// Await the next applied action and return its update.
    ///
    /// Stale actions are discarded while waiting. This is the canonical
    /// async driver: loop on it and push each update's rendering at the
    /// platform.
    #[instrument(skip_all, fields(runner = %self.config.runner_id), err)]
    pub async fn next_update(&mut self) -> Result<TreeUpdate<W>, RuntimeError> {
        loop {
            let queued = self
                .queue_rx
                .recv_async()
                .await
                .expect("root node holds a queue sender");
            if let Some(update) = self.dispatch(queued)? {
                return Ok(update);
            }
        }
    }

    /// Apply every action already in the queue, one step (and one render
    /// pass) each, and return the updates in order. Does not wait for
    /// in-flight workers.
    pub fn drain(&mut self) -> Result<Vec<TreeUpdate<W>>, RuntimeError> {
        let mut updates = Vec::new();
        while let Some(update) = self.try_step()? {
            updates.push(update);
        }
        Ok(updates)
    }

    /// Point-in-time diagnostic snapshot of the tree.
    #[must_use]
    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            runner: self.config.runner_id.clone(),
            taken_at: chrono::Utc::now(),
            step: self.step,
            root: self.root.summary(),
        }
    }

    /// Steps applied so far.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// One Applying → Rendering transition for a single queue entry.
    fn dispatch(&mut self, queued: QueuedAction) -> Result<Option<TreeUpdate<W>>, RuntimeError> {
        let QueuedAction {
            target,
            source,
            action,
        } = queued;
        match self.root.apply(target, action)? {
            ApplyOutcome::NotFound(_) => {
                self.stale_since_report += 1;
                tracing::debug!(
                    runner = %self.config.runner_id,
                    target = %target,
                    "discarding stale action for torn-down node"
                );
                Ok(None)
            }
            ApplyOutcome::Applied(output) => {
                let output = output.map(|out| {
                    *out.downcast::<W::Output>()
                        .expect("root node yields the root output type")
                });
                self.step += 1;
                let rendering = self.root.render()?;
                let report = StepReport {
                    step: self.step,
                    target,
                    source,
                    output_published: output.is_some(),
                    stale_discarded: mem::take(&mut self.stale_since_report),
                };
                tracing::debug!(
                    runner = %self.config.runner_id,
                    step = report.step,
                    target = %target,
                    output_published = report.output_published,
                    "step complete"
                );
                Ok(Some(TreeUpdate {
                    step: self.step,
                    rendering,
                    output,
                    report,
                }))
            }
        }
    }
}

impl<W: Workflow> Drop for TreeRunner<W> {
    fn drop(&mut self) {
        tracing::info!(runner = %self.config.runner_id, step = self.step, "tree runtime torn down");
    }
}
