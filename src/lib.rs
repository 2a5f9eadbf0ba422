//! # Renderloom: Unidirectional-Data-Flow Render-Tree Runtime
//!
//! Renderloom composes stateful workflow units into a tree. Each unit renders
//! a value every pass, may emit discrete outputs to its parent, and changes
//! its own state only through actions applied one at a time from a single
//! ordered queue, no matter how many threads, callbacks, or background
//! tasks produced them.
//!
//! ## Core Concepts
//!
//! - **Workflow**: an immutable definition of State/Action/Output/Rendering
//!   with pure `render` and `update` functions
//! - **WorkflowNode**: the live, stateful instance of a workflow in the tree
//! - **RenderContext**: the per-pass façade for composing children, making
//!   sinks, and declaring workers; valid only inside one render call
//! - **Sink**: a retained handle that enqueues actions from anywhere
//! - **Worker**: an external async event source bridged into the queue, kept
//!   alive across passes by equivalence instead of being restarted
//! - **TreeRunner**: the loop that applies one action, re-renders, and
//!   republishes the rendering and any root output
//!
//! ## Quick Start
//!
//! ```
//! use renderloom::context::{ContextError, RenderContext};
//! use renderloom::runtime::TreeRunner;
//! use renderloom::sink::Sink;
//! use renderloom::workflow::Workflow;
//!
//! struct Greeter;
//!
//! enum GreeterAction {
//!     Toggle,
//! }
//!
//! struct GreeterScreen {
//!     greeting: String,
//!     toggle: Sink<GreeterAction>,
//! }
//!
//! impl Workflow for Greeter {
//!     type State = String;
//!     type Action = GreeterAction;
//!     type Output = ();
//!     type Rendering = GreeterScreen;
//!
//!     fn initial_state(&self) -> String {
//!         "Hello".to_string()
//!     }
//!
//!     fn render(
//!         &self,
//!         state: &String,
//!         ctx: &RenderContext<Self>,
//!     ) -> Result<GreeterScreen, ContextError> {
//!         Ok(GreeterScreen {
//!             greeting: state.clone(),
//!             toggle: ctx.make_sink()?,
//!         })
//!     }
//!
//!     fn update(&self, state: &mut String, action: GreeterAction) -> Option<()> {
//!         match action {
//!             GreeterAction::Toggle => {
//!                 *state = if state == "Hello" { "Goodbye" } else { "Hello" }.to_string();
//!                 None
//!             }
//!         }
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut runner = TreeRunner::new(Greeter);
//!
//! // The host renders whenever it wants a fresh view model...
//! let screen = runner.render(Greeter)?;
//! assert_eq!(screen.greeting, "Hello");
//!
//! // ...and platform callbacks fire retained sinks.
//! screen.toggle.send(GreeterAction::Toggle)?;
//! let update = runner.next_update().await?;
//! assert_eq!(update.rendering.greeting, "Goodbye");
//! # Ok(())
//! # }
//! ```
//!
//! ## Composition
//!
//! Parents request children inside `render` with
//! [`render_child`](crate::context::RenderContext::render_child), passing a
//! key and an output map. Children are matched to the previous pass by
//! `(workflow type, key)`: a re-requested slot keeps its node and state, an
//! abandoned slot is torn down (its workers cancelled, its own children
//! torn down recursively) before the pass completes. Requesting the same
//! slot twice in one pass is a programmer error
//! ([`DuplicateChildKey`](crate::context::ContextError::DuplicateChildKey)),
//! as is using a context after its pass
//! ([`UseAfterRender`](crate::context::ContextError::UseAfterRender)).
//!
//! ## Workers
//!
//! External async sources implement [`Worker`](crate::workers::Worker) with
//! an equivalence test; declaring the same ongoing work every pass keeps the
//! subscription running without restarts. See [`workers`] for the bridge
//! rules and [`context`](crate::context) for the declaring operations.
//!
//! ## Module Guide
//!
//! - [`workflow`] - The `Workflow` trait
//! - [`context`] - Per-pass render context and its errors
//! - [`node`] - Live tree nodes
//! - [`sink`] - Retained action handles and the queue envelope
//! - [`workers`] - Worker trait, subscription bridge, stream adapter
//! - [`runtime`] - `TreeRunner` loop and configuration
//! - [`telemetry`] - Tracing setup and serializable tree snapshots
//! - [`types`] - Node ids and child keys

pub mod context;
pub mod node;
pub mod runtime;
pub mod sink;
pub mod telemetry;
pub mod types;
pub mod workers;
pub mod workflow;
