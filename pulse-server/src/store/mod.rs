//! Storage seam
//!
//! The service and pipeline layers talk to persistence through the `Store`
//! trait rather than a concrete pool, so the runner's observable behavior
//! can be exercised against an in-memory implementation. `PgStore` is the
//! production implementation backed by the sqlx repositories.

mod memory;
mod pg;

use async_trait::async_trait;
use uuid::Uuid;

use pulse_core::domain::data::{TimeSeriesPoint, Transformer, TransformerKind};
use pulse_core::domain::lease::EditLease;
use pulse_core::domain::metric::Metric;
use pulse_core::domain::run::{PipelineRun, RunStatus};
use pulse_core::domain::step_log::StepLogEntry;
use pulse_core::domain::team::Team;
use pulse_core::pipeline::step::Step;

pub use memory::MemoryStore;
pub use pg::PgStore;

/// Storage error type
#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    /// A uniqueness rule rejected the write (one live run per metric).
    Conflict(String),
}

impl StoreError {
    /// Whether the error is a uniqueness conflict rather than a fault.
    pub fn is_conflict(&self) -> bool {
        match self {
            StoreError::Conflict(_) => true,
            StoreError::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            StoreError::Database(_) => false,
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "database error: {}", err),
            StoreError::Conflict(msg) => write!(f, "conflict: {}", msg),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence operations the service and pipeline layers depend on
#[async_trait]
pub trait Store: Send + Sync {
    // Metrics
    async fn create_metric(&self, metric: Metric) -> Result<()>;
    async fn find_metric(&self, id: Uuid) -> Result<Option<Metric>>;
    /// Batch lookup scoped to one organization; ids the org does not own
    /// are silently absent from the result.
    async fn find_metrics(&self, org_id: Uuid, ids: &[Uuid]) -> Result<Vec<Metric>>;
    async fn set_current_step(&self, metric_id: Uuid, step: Option<Step>) -> Result<()>;
    /// Clear step and error, stamp `last_fetched_at`.
    async fn mark_metric_completed(
        &self,
        metric_id: Uuid,
        fetched_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;
    /// Clear step, persist `last_error`.
    async fn mark_metric_failed(&self, metric_id: Uuid, error: &str) -> Result<()>;

    // Pipeline runs
    async fn create_run(&self, run: PipelineRun) -> Result<()>;
    async fn find_run(&self, id: Uuid) -> Result<Option<PipelineRun>>;
    async fn find_live_run(&self, metric_id: Uuid) -> Result<Option<PipelineRun>>;
    async fn set_run_step(&self, run_id: Uuid, step: Option<Step>) -> Result<()>;
    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        finished_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()>;

    // Step log
    async fn append_step_log(&self, entry: StepLogEntry) -> Result<()>;
    async fn find_step_logs(&self, metric_id: Uuid) -> Result<Vec<StepLogEntry>>;

    // Time-series data and generated artifacts
    async fn delete_points(&self, metric_id: Uuid) -> Result<u64>;
    async fn replace_points(&self, metric_id: Uuid, points: &[TimeSeriesPoint]) -> Result<()>;
    async fn find_points(&self, metric_id: Uuid) -> Result<Vec<TimeSeriesPoint>>;
    async fn save_transformer(&self, transformer: Transformer) -> Result<()>;
    async fn delete_transformer(&self, metric_id: Uuid, kind: TransformerKind) -> Result<bool>;
    async fn find_transformer(
        &self,
        metric_id: Uuid,
        kind: TransformerKind,
    ) -> Result<Option<Transformer>>;
    async fn save_chart_config(
        &self,
        chart_id: Uuid,
        metric_id: Uuid,
        config: serde_json::Value,
    ) -> Result<()>;

    // Edit leases
    async fn find_lease(&self, resource_id: Uuid) -> Result<Option<EditLease>>;
    async fn upsert_lease(&self, lease: EditLease) -> Result<()>;
    /// Bump `last_seen` for a lease the caller holds. Returns false if the
    /// caller holds no lease on the resource.
    async fn touch_lease(
        &self,
        resource_id: Uuid,
        holder_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool>;
    async fn delete_lease(&self, resource_id: Uuid, holder_id: Uuid) -> Result<bool>;

    // Teams
    async fn create_team(&self, team: Team) -> Result<()>;
    async fn find_team(&self, id: Uuid) -> Result<Option<Team>>;
}
