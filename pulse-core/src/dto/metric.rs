//! Metric and pipeline DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to create a new metric
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMetric {
    pub name: String,
    pub integration: String,
}

/// Acknowledgement returned by the pipeline-triggering endpoints
///
/// `started` is false when a live run already exists for the metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAck {
    pub success: bool,
    pub started: bool,
    pub run_id: Option<Uuid>,
}

/// Poll target for the in-flight progress bar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricProgress {
    pub is_processing: bool,
    pub current_step: Option<String>,
    pub error: Option<String>,
}

/// Lighter-weight poll shape used by card-level UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricStatus {
    pub id: Uuid,
    pub refresh_status: Option<String>,
    pub last_error: Option<String>,
}

/// Batch poll request for dashboard-level UI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusRequest {
    pub metric_ids: Vec<Uuid>,
}
