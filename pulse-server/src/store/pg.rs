//! Postgres-backed store
//!
//! Thin delegation onto the repository functions; all SQL lives there.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use pulse_core::domain::data::{TimeSeriesPoint, Transformer, TransformerKind};
use pulse_core::domain::lease::EditLease;
use pulse_core::domain::metric::Metric;
use pulse_core::domain::run::{PipelineRun, RunStatus};
use pulse_core::domain::step_log::StepLogEntry;
use pulse_core::domain::team::Team;
use pulse_core::pipeline::step::Step;

use crate::repository::{data, lease, metric, run, step_log, team};
use crate::store::{Result, Store};

/// Production store backed by a Postgres pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_metric(&self, m: Metric) -> Result<()> {
        Ok(metric::create(&self.pool, &m).await?)
    }

    async fn find_metric(&self, id: Uuid) -> Result<Option<Metric>> {
        Ok(metric::find_by_id(&self.pool, id).await?)
    }

    async fn find_metrics(&self, org_id: Uuid, ids: &[Uuid]) -> Result<Vec<Metric>> {
        Ok(metric::find_by_ids(&self.pool, org_id, ids).await?)
    }

    async fn set_current_step(&self, metric_id: Uuid, step: Option<Step>) -> Result<()> {
        Ok(metric::set_current_step(&self.pool, metric_id, step).await?)
    }

    async fn mark_metric_completed(
        &self,
        metric_id: Uuid,
        fetched_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        Ok(metric::mark_completed(&self.pool, metric_id, fetched_at).await?)
    }

    async fn mark_metric_failed(&self, metric_id: Uuid, error: &str) -> Result<()> {
        Ok(metric::mark_failed(&self.pool, metric_id, error).await?)
    }

    async fn create_run(&self, r: PipelineRun) -> Result<()> {
        Ok(run::create(&self.pool, &r).await?)
    }

    async fn find_run(&self, id: Uuid) -> Result<Option<PipelineRun>> {
        Ok(run::find_by_id(&self.pool, id).await?)
    }

    async fn find_live_run(&self, metric_id: Uuid) -> Result<Option<PipelineRun>> {
        Ok(run::find_live_by_metric(&self.pool, metric_id).await?)
    }

    async fn set_run_step(&self, run_id: Uuid, step: Option<Step>) -> Result<()> {
        Ok(run::set_step(&self.pool, run_id, step).await?)
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        finished_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        Ok(run::finish(&self.pool, run_id, status, finished_at).await?)
    }

    async fn append_step_log(&self, entry: StepLogEntry) -> Result<()> {
        Ok(step_log::append(&self.pool, &entry).await?)
    }

    async fn find_step_logs(&self, metric_id: Uuid) -> Result<Vec<StepLogEntry>> {
        Ok(step_log::find_by_metric(&self.pool, metric_id).await?)
    }

    async fn delete_points(&self, metric_id: Uuid) -> Result<u64> {
        Ok(data::delete_points(&self.pool, metric_id).await?)
    }

    async fn replace_points(&self, metric_id: Uuid, points: &[TimeSeriesPoint]) -> Result<()> {
        Ok(data::replace_points(&self.pool, metric_id, points).await?)
    }

    async fn find_points(&self, metric_id: Uuid) -> Result<Vec<TimeSeriesPoint>> {
        Ok(data::find_points(&self.pool, metric_id).await?)
    }

    async fn save_transformer(&self, transformer: Transformer) -> Result<()> {
        Ok(data::save_transformer(&self.pool, &transformer).await?)
    }

    async fn delete_transformer(&self, metric_id: Uuid, kind: TransformerKind) -> Result<bool> {
        Ok(data::delete_transformer(&self.pool, metric_id, kind).await?)
    }

    async fn find_transformer(
        &self,
        metric_id: Uuid,
        kind: TransformerKind,
    ) -> Result<Option<Transformer>> {
        Ok(data::find_transformer(&self.pool, metric_id, kind).await?)
    }

    async fn save_chart_config(
        &self,
        chart_id: Uuid,
        metric_id: Uuid,
        config: serde_json::Value,
    ) -> Result<()> {
        Ok(data::save_chart_config(&self.pool, chart_id, metric_id, &config).await?)
    }

    async fn find_lease(&self, resource_id: Uuid) -> Result<Option<EditLease>> {
        Ok(lease::find_by_resource(&self.pool, resource_id).await?)
    }

    async fn upsert_lease(&self, l: EditLease) -> Result<()> {
        Ok(lease::upsert(&self.pool, &l).await?)
    }

    async fn touch_lease(
        &self,
        resource_id: Uuid,
        holder_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool> {
        Ok(lease::touch(&self.pool, resource_id, holder_id, now).await?)
    }

    async fn delete_lease(&self, resource_id: Uuid, holder_id: Uuid) -> Result<bool> {
        Ok(lease::delete(&self.pool, resource_id, holder_id).await?)
    }

    async fn create_team(&self, t: Team) -> Result<()> {
        Ok(team::create(&self.pool, &t).await?)
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>> {
        Ok(team::find_by_id(&self.pool, id).await?)
    }
}
