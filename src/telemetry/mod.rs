//! Tracing setup and serializable tree diagnostics.
//!
//! Two concerns live here: [`init`], the conventional subscriber wiring for
//! binaries and tests, and the [`TreeSnapshot`]/[`NodeSummary`] types a
//! [`TreeRunner`](crate::runtime::TreeRunner) produces on demand so hosts
//! can log, export, or assert on tree shape without reaching into nodes.
//!
//! # Examples
//!
//! ```rust,no_run
//! renderloom::telemetry::init();
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::types::NodeId;

/// Install the default tracing subscriber: `RUST_LOG`-driven env filter,
/// compact fmt layer, and an [`ErrorLayer`] so spans are captured into
/// error reports.
///
/// Idempotent: a second call (or a subscriber installed by the host) wins
/// silently.
pub fn init() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init();
}

/// Diagnostic summary of one node and its subtree.
///
/// `key` is the slot key under the parent (`None` for the root). Children
/// are ordered by node id, which follows creation order: stable across
/// passes for diagnostics even though reconciliation itself ignores order.
#[derive(Clone, Debug, Serialize)]
pub struct NodeSummary {
    /// The node's tree-unique id.
    pub id: NodeId,
    /// Workflow type label.
    pub kind: String,
    /// Slot key under the parent; `None` for the root.
    pub key: Option<String>,
    /// Render passes this node has performed.
    pub generation: u64,
    /// Live worker subscriptions.
    pub workers: usize,
    /// Summaries of the live children.
    pub children: Vec<NodeSummary>,
}

/// Point-in-time diagnostic view of a whole tree.
#[derive(Clone, Debug, Serialize)]
pub struct TreeSnapshot {
    /// Runner id from [`RuntimeConfig`](crate::runtime::RuntimeConfig).
    pub runner: String,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
    /// Steps (actions applied) so far.
    pub step: u64,
    /// The root node's subtree summary.
    pub root: NodeSummary,
}

/// Render a snapshot as an indented one-node-per-line listing.
///
/// ```text
/// loom-1a2b3c4d step=3
/// Shell #0 gen=4 workers=0
///   Editor[left] #1 gen=4 workers=1
///   Editor[right] #2 gen=4 workers=0
/// ```
#[must_use]
pub fn render_tree(snapshot: &TreeSnapshot) -> String {
    let mut out = format!("{} step={}\n", snapshot.runner, snapshot.step);
    render_node(&snapshot.root, 0, &mut out);
    out
}

fn render_node(node: &NodeSummary, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let slot = node
        .key
        .as_ref()
        .map(|key| format!("[{key}]"))
        .unwrap_or_default();
    out.push_str(&format!(
        "{indent}{}{slot} {} gen={} workers={}\n",
        node.kind, node.id, node.generation, node.workers
    ));
    for child in &node.children {
        render_node(child, depth + 1, out);
    }
}
