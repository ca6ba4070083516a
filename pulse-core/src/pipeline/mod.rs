//! Pipeline vocabulary
//!
//! The static registries the runner and the UI share: operations (the
//! finest-grained unit of pipeline work), steps (the coarser user-facing
//! progress labels), pipeline variants (fixed ordered operation lists),
//! and variant detection over an observed step log.

pub mod detect;
pub mod step;
pub mod variant;

pub use detect::detect_variant;
pub use step::{Operation, Step, step_display_name};
pub use variant::PipelineVariant;
