pub mod error;
pub mod metrics;

pub use error::{GlueError, Result, UnitFailure};
