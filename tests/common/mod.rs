pub mod fixtures;
pub mod workers;

pub use fixtures::*;
pub use workers::*;
