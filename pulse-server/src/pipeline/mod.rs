//! Pipeline execution
//!
//! The runner wraps individual operations with progress persistence and
//! step logging; the executor maps a variant's operations onto real work
//! against the store and the external collaborators.

mod error;
mod executor;
mod runner;

pub use error::PipelineError;
pub use executor::PipelineExecutor;
pub use runner::{RunContext, StepRunner};
