//! Metric domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tracked KPI metric
///
/// `current_step` and `last_error` are the durable pipeline state the UI
/// polls while a refresh is in flight. They are written exclusively by the
/// pipeline runner and cleared on completion or explicit failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Integration key the source proxy uses to locate raw data
    /// (e.g. "jira", "salesforce").
    pub integration: String,
    /// Step identifier of the step currently executing, if any.
    pub current_step: Option<String>,
    pub last_error: Option<String>,
    pub last_fetched_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Chart record produced for this metric.
    pub chart_id: Uuid,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Metric {
    /// Whether a pipeline appears to be in flight for this metric.
    pub fn is_processing(&self) -> bool {
        self.current_step.is_some()
    }
}
