//! Runtime execution: the [`TreeRunner`] loop and its configuration.

pub mod config;
pub mod runner;

pub use config::RuntimeConfig;
pub use runner::{RuntimeError, StepReport, TreeRunner, TreeUpdate};
