//! The [`Workflow`] trait: the unit of composition in a render tree.
//!
//! A workflow is an immutable *description* of a piece of stateful behavior:
//! it declares a `State` it owns, an `Action` type that is the only way that
//! state changes, an `Output` it can emit to its parent, and a `Rendering`
//! value it produces for its parent (or the host) on every render pass.
//!
//! The workflow value itself carries the props: a parent constructs a fresh
//! value each pass and hands it to
//! [`RenderContext::render_child`](crate::context::RenderContext::render_child),
//! exactly like the host hands one to
//! [`TreeRunner::render`](crate::runtime::TreeRunner::render). A child that
//! is re-requested under the same `(type, key)` keeps its `State` and only
//! has its stored definition replaced, so props flow freely while state
//! stays put.
//!
//! # Design Principles
//!
//! - **Stateless definitions**: a workflow value holds configuration, never
//!   live state; many nodes may be driven by equal definitions
//! - **Single writer**: `State` is mutated only inside [`update`], one action
//!   at a time, between render passes
//! - **Pure passes**: `render` reads state and declares children, sinks, and
//!   workers through the context; it must not cause effects of its own
//!
//! # Examples
//!
//! ```rust
//! use renderloom::context::{ContextError, RenderContext};
//! use renderloom::sink::Sink;
//! use renderloom::workflow::Workflow;
//!
//! struct Counter {
//!     step: i64,
//! }
//!
//! enum CounterAction {
//!     Bump,
//! }
//!
//! struct CounterScreen {
//!     value: i64,
//!     bump: Sink<CounterAction>,
//! }
//!
//! impl Workflow for Counter {
//!     type State = i64;
//!     type Action = CounterAction;
//!     type Output = ();
//!     type Rendering = CounterScreen;
//!
//!     fn initial_state(&self) -> i64 {
//!         0
//!     }
//!
//!     fn render(
//!         &self,
//!         state: &i64,
//!         ctx: &RenderContext<Self>,
//!     ) -> Result<CounterScreen, ContextError> {
//!         Ok(CounterScreen {
//!             value: *state,
//!             bump: ctx.make_sink()?,
//!         })
//!     }
//!
//!     fn update(&self, state: &mut i64, action: CounterAction) -> Option<()> {
//!         match action {
//!             CounterAction::Bump => {
//!                 *state += self.step;
//!                 None
//!             }
//!         }
//!     }
//! }
//! ```

use crate::context::{ContextError, RenderContext};

/// A composable unit of state, rendering, and output.
///
/// Implementations are plain values; the tree owns one
/// [`WorkflowNode`](crate::node::WorkflowNode) per live `(type, key)` slot
/// and calls back into the definition for every pass and every action.
///
/// # Errors
///
/// `render` returns the [`ContextError`] of any context operation it
/// forwards with `?`. Such errors are programmer errors (duplicate child
/// key, context used after its pass) and abort the whole render pass; they
/// are not recoverable conditions to branch on.
pub trait Workflow: Sized + Send + 'static {
    /// State owned exclusively by this workflow's node.
    type State: Send + 'static;

    /// The only vocabulary for changing `State`. Applied by [`update`],
    /// one at a time, in queue order.
    ///
    /// [`update`]: Workflow::update
    type Action: Send + 'static;

    /// Event emitted upward to the parent; the parent maps it into one of
    /// its own actions at the `render_child` call site.
    type Output: Send + 'static;

    /// Value produced for the parent (or host) on every render pass.
    type Rendering: 'static;

    /// State for a freshly created node. Called once per `(type, key)` slot
    /// lifetime; re-requested children keep their state.
    fn initial_state(&self) -> Self::State;

    /// Produce this pass's rendering, declaring children, sinks, and worker
    /// subscriptions through `ctx`. The context is revoked when this call
    /// returns.
    fn render(
        &self,
        state: &Self::State,
        ctx: &RenderContext<Self>,
    ) -> Result<Self::Rendering, ContextError>;

    /// Apply one action to the state, optionally emitting an output for the
    /// parent. Must be total over every reachable `State`/`Action` pair.
    fn update(&self, state: &mut Self::State, action: Self::Action) -> Option<Self::Output>;
}
