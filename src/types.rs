//! Core identity types for the renderloom render tree.
//!
//! This module defines the fundamental types used throughout the system to
//! identify live nodes and to match children across render passes. These are
//! the core domain concepts that define what a render tree *is*.
//!
//! # Key Types
//!
//! - [`NodeId`]: Unique identity of a live node in the tree
//! - [`IdAllocator`]: Tree-wide monotonic id source shared by all nodes
//! - [`ChildKey`]: Identity of a child slot, `(workflow type, caller key)`
//!
//! # Examples
//!
//! ```rust
//! use renderloom::types::IdAllocator;
//!
//! let ids = IdAllocator::default();
//! let first = ids.next();
//! let second = ids.next();
//! assert_ne!(first, second);
//! ```

use serde::Serialize;
use std::any::{self, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identity of a live node within one render tree.
///
/// Ids are allocated from a single [`IdAllocator`] shared across the tree, so
/// an id is never reused even after its node is torn down. Queued actions
/// carry the id of the node they target; an action whose target no longer
/// exists is stale and gets discarded, never re-routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic [`NodeId`] source shared by every node of one tree.
///
/// Cloning the allocator shares the underlying counter; ids stay unique
/// across the whole tree regardless of which node requests them.
#[derive(Clone, Debug, Default)]
pub struct IdAllocator {
    next: Arc<AtomicU64>,
}

impl IdAllocator {
    /// Allocate the next id. Never returns the same id twice for one tree.
    pub fn next(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Identity of a child slot within its parent: the child's workflow type
/// plus the caller-supplied key string.
///
/// Two children of the same workflow type are distinct slots exactly when
/// their keys differ; requesting the same `(type, key)` twice in one render
/// pass is a programmer error. Equality and hashing ignore the human-readable
/// kind label, which exists only for diagnostics.
#[derive(Clone, Debug)]
pub struct ChildKey {
    type_id: TypeId,
    key: String,
    kind: &'static str,
}

impl ChildKey {
    /// Build the key for a child of workflow type `T` under `key`.
    pub fn of<T: 'static>(key: impl Into<String>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            key: key.into(),
            kind: short_type_name::<T>(),
        }
    }

    /// The caller-supplied key string.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human-readable label of the child's workflow type.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl PartialEq for ChildKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.key == other.key
    }
}

impl Eq for ChildKey {}

impl Hash for ChildKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.kind, self.key)
    }
}

/// Last path segment of a type name, for spans and snapshots.
///
/// `my_app::screens::Greeter` renders as `Greeter`; generic parameters are
/// dropped.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
