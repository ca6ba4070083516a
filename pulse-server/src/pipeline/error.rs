//! Pipeline error type

use std::time::Duration;

use pulse_core::domain::data::TransformerKind;
use pulse_core::pipeline::step::Step;

use crate::store::StoreError;

/// A step-level pipeline failure
///
/// The runner records the rendered message and re-throws the error
/// unchanged; whatever lands in `Metric.last_error` is this `Display`
/// output.
#[derive(Debug)]
pub enum PipelineError {
    /// The third-party proxy fetch failed.
    Source(String),
    /// Generation or execution of transformer code failed.
    Transformer(String),
    /// A persistence write/read inside the pipeline failed.
    Store(StoreError),
    /// The step outlived the configured per-step deadline.
    Timeout { step: Step, after: Duration },
    /// A variant that reuses transformer code found none stored.
    MissingTransformer(TransformerKind),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::Source(msg) => write!(f, "source fetch failed: {}", msg),
            PipelineError::Transformer(msg) => write!(f, "transformer failed: {}", msg),
            PipelineError::Store(err) => write!(f, "storage failed: {}", err),
            PipelineError::Timeout { step, after } => write!(
                f,
                "step '{}' timed out after {}s",
                step.as_str(),
                after.as_secs()
            ),
            PipelineError::MissingTransformer(kind) => {
                write!(f, "no {} transformer has been generated yet", kind.as_str())
            }
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        PipelineError::Store(err)
    }
}
