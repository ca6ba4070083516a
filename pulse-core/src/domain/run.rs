//! Pipeline run domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::step::Step;
use crate::pipeline::variant::PipelineVariant;

/// One pipeline execution for a metric
///
/// The run row is what distinguishes two concurrent triggers for the same
/// metric: the metric's `current_step` mirrors the latest write for cheap
/// polling, but the run is the authoritative record of a single execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub metric_id: Uuid,
    pub variant: PipelineVariant,
    pub status: RunStatus,
    pub current_step: Option<Step>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

impl PipelineRun {
    pub fn is_live(&self) -> bool {
        self.status == RunStatus::Running
    }
}
