//! Running worker subscriptions and their per-pass reconciliation support.
//!
//! A subscription pairs the spawned delivery task with an equivalence probe
//! built from the worker that started it. Reconciliation (performed by the
//! node at the end of each render pass) matches this pass's declarations
//! against the previous pass's subscriptions: equivalent declarations keep
//! the running task untouched, unmatched old subscriptions are cancelled
//! before any newly declared worker starts.

use std::any::Any;
use tokio::task::JoinHandle;

use crate::types::short_type_name;

use super::worker::{Worker, WorkerOutlet};

/// Type-erased equivalence test against a candidate worker declaration.
pub(crate) trait WorkerProbe: Send {
    /// True when `candidate` is the same concrete worker type and the
    /// original worker judges it equivalent.
    fn matches(&self, candidate: &dyn Any) -> bool;

    /// Worker type label for diagnostics.
    fn kind(&self) -> &'static str;
}

struct TypedProbe<K: Worker> {
    worker: std::sync::Arc<K>,
}

impl<K: Worker> WorkerProbe for TypedProbe<K> {
    fn matches(&self, candidate: &dyn Any) -> bool {
        candidate
            .downcast_ref::<K>()
            .is_some_and(|other| self.worker.matches(other))
    }

    fn kind(&self) -> &'static str {
        short_type_name::<K>()
    }
}

/// One live worker subscription owned by a node.
///
/// Dropping the subscription aborts the delivery task, which is how
/// cancellation propagates structurally: tearing down a node drops its
/// subscriptions (and its children, recursively) with no further
/// bookkeeping. Events the task already enqueued stay in the queue.
pub(crate) struct WorkerSubscription {
    probe: Box<dyn WorkerProbe>,
    handle: JoinHandle<()>,
}

impl WorkerSubscription {
    /// Spawn the delivery task for a newly declared worker.
    ///
    /// Failure of the worker's source is pushed through the same outlet as a
    /// terminal event; the bridge never retries.
    pub(crate) fn start<K: Worker>(worker: K, outlet: WorkerOutlet<K::Output>) -> Self {
        let worker = std::sync::Arc::new(worker);
        let probe: Box<dyn WorkerProbe> = Box::new(TypedProbe {
            worker: std::sync::Arc::clone(&worker),
        });
        tracing::debug!(worker = probe.kind(), "starting worker subscription");
        let handle = tokio::spawn(async move {
            let task_outlet = outlet.clone();
            if let Err(error) = worker.run(task_outlet).await {
                tracing::debug!(error = %error, "worker terminated with failure");
                let _ = outlet.fail(error).await;
            }
        });
        Self { probe, handle }
    }

    /// Equivalence test against a candidate declared this pass.
    pub(crate) fn matches(&self, candidate: &dyn Any) -> bool {
        self.probe.matches(candidate)
    }

    pub(crate) fn kind(&self) -> &'static str {
        self.probe.kind()
    }
}

impl Drop for WorkerSubscription {
    fn drop(&mut self) {
        tracing::debug!(worker = self.probe.kind(), "cancelling worker subscription");
        self.handle.abort();
    }
}
