//! Worker subscription bridge: external asynchronous sources as actions.
//!
//! The module is organised around the [`Worker`] trait, the running
//! subscription state a node owns per declared worker, and the
//! [`StreamSource`] adapter for plain streams.
//!
//! Subscriptions run as tokio tasks, so a render pass that starts a worker
//! must complete inside a tokio runtime context. Trees that never declare
//! workers have no such requirement.

pub mod stream;
pub(crate) mod subscription;
pub mod worker;

pub use stream::StreamSource;
pub use worker::{Worker, WorkerError, WorkerOutlet};
