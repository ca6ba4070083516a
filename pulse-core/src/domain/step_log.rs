//! Step log domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::step::{Operation, Step};

/// An append-only record of one step attempt
///
/// Written by the pipeline runner after every operation, never updated or
/// deleted by the pipeline itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepLogEntry {
    pub id: Uuid,
    pub metric_id: Uuid,
    pub run_id: Uuid,
    /// Absent for lightweight status entries written outside a timed
    /// operation.
    pub operation: Option<Operation>,
    pub step: Step,
    pub display_name: String,
    pub status: StepStatus,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
    pub duration_ms: i64,
    pub error: Option<String>,
    /// Opaque result payload the operation chose to attach.
    pub result: Option<serde_json::Value>,
}

/// Outcome of a step attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    Completed,
    Failed,
}
