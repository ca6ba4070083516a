//! Time-series and transformer domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single normalized time-series point produced by the ingestion
/// transformer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub value: f64,
    pub label: Option<String>,
}

/// Which of the two generated transformers a record refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformerKind {
    /// Raw payload -> time-series points.
    Ingestion,
    /// Time-series points -> chart configuration.
    Chart,
}

impl TransformerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformerKind::Ingestion => "ingestion",
            TransformerKind::Chart => "chart",
        }
    }
}

/// Generated transformation code for a metric
///
/// The code itself is opaque to Pulse; it is produced and executed by the
/// external generated-code service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformer {
    pub metric_id: Uuid,
    pub kind: TransformerKind,
    pub code: String,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}
