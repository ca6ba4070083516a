//! In-memory store
//!
//! Backs unit tests for the runner, the trigger, and the lease manager.
//! Uses Arc<Mutex<...>> maps for thread-safe access across tasks, in the
//! same shape as the Postgres tables.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use pulse_core::domain::data::{TimeSeriesPoint, Transformer, TransformerKind};
use pulse_core::domain::lease::EditLease;
use pulse_core::domain::metric::Metric;
use pulse_core::domain::run::{PipelineRun, RunStatus};
use pulse_core::domain::step_log::StepLogEntry;
use pulse_core::domain::team::Team;
use pulse_core::pipeline::step::Step;

use crate::store::{Result, Store, StoreError};

#[derive(Default)]
struct Inner {
    metrics: HashMap<Uuid, Metric>,
    runs: HashMap<Uuid, PipelineRun>,
    step_logs: Vec<StepLogEntry>,
    points: HashMap<Uuid, Vec<TimeSeriesPoint>>,
    transformers: HashMap<(Uuid, TransformerKind), Transformer>,
    charts: HashMap<Uuid, serde_json::Value>,
    leases: HashMap<Uuid, EditLease>,
    teams: HashMap<Uuid, Team>,
}

/// In-memory implementation of `Store`
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct lease write, for tests that need to age a lease.
    pub fn set_lease_last_seen(&self, resource_id: Uuid, last_seen: chrono::DateTime<chrono::Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(lease) = inner.leases.get_mut(&resource_id) {
            lease.last_seen = last_seen;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_metric(&self, metric: Metric) -> Result<()> {
        self.inner.lock().unwrap().metrics.insert(metric.id, metric);
        Ok(())
    }

    async fn find_metric(&self, id: Uuid) -> Result<Option<Metric>> {
        Ok(self.inner.lock().unwrap().metrics.get(&id).cloned())
    }

    async fn find_metrics(&self, org_id: Uuid, ids: &[Uuid]) -> Result<Vec<Metric>> {
        let inner = self.inner.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| inner.metrics.get(id))
            .filter(|m| m.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn set_current_step(&self, metric_id: Uuid, step: Option<Step>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(metric) = inner.metrics.get_mut(&metric_id) {
            metric.current_step = step.map(|s| s.as_str().to_string());
            metric.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn mark_metric_completed(
        &self,
        metric_id: Uuid,
        fetched_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(metric) = inner.metrics.get_mut(&metric_id) {
            metric.current_step = None;
            metric.last_error = None;
            metric.last_fetched_at = Some(fetched_at);
            metric.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn mark_metric_failed(&self, metric_id: Uuid, error: &str) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(metric) = inner.metrics.get_mut(&metric_id) {
            metric.current_step = None;
            metric.last_error = Some(error.to_string());
            metric.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn create_run(&self, run: PipelineRun) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        // Same uniqueness rule the live-run index enforces in Postgres.
        if run.is_live()
            && inner
                .runs
                .values()
                .any(|r| r.metric_id == run.metric_id && r.is_live())
        {
            return Err(StoreError::Conflict(format!(
                "a live run already exists for metric {}",
                run.metric_id
            )));
        }
        inner.runs.insert(run.id, run);
        Ok(())
    }

    async fn find_run(&self, id: Uuid) -> Result<Option<PipelineRun>> {
        Ok(self.inner.lock().unwrap().runs.get(&id).cloned())
    }

    async fn find_live_run(&self, metric_id: Uuid) -> Result<Option<PipelineRun>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .runs
            .values()
            .find(|r| r.metric_id == metric_id && r.is_live())
            .cloned())
    }

    async fn set_run_step(&self, run_id: Uuid, step: Option<Step>) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(run) = inner.runs.get_mut(&run_id) {
            run.current_step = step;
        }
        Ok(())
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        status: RunStatus,
        finished_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(run) = inner.runs.get_mut(&run_id) {
            run.status = status;
            run.current_step = None;
            run.finished_at = Some(finished_at);
        }
        Ok(())
    }

    async fn append_step_log(&self, entry: StepLogEntry) -> Result<()> {
        self.inner.lock().unwrap().step_logs.push(entry);
        Ok(())
    }

    async fn find_step_logs(&self, metric_id: Uuid) -> Result<Vec<StepLogEntry>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .step_logs
            .iter()
            .filter(|e| e.metric_id == metric_id)
            .cloned()
            .collect())
    }

    async fn delete_points(&self, metric_id: Uuid) -> Result<u64> {
        let removed = self.inner.lock().unwrap().points.remove(&metric_id);
        Ok(removed.map(|p| p.len() as u64).unwrap_or(0))
    }

    async fn replace_points(&self, metric_id: Uuid, points: &[TimeSeriesPoint]) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .points
            .insert(metric_id, points.to_vec());
        Ok(())
    }

    async fn find_points(&self, metric_id: Uuid) -> Result<Vec<TimeSeriesPoint>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .points
            .get(&metric_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_transformer(&self, transformer: Transformer) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .transformers
            .insert((transformer.metric_id, transformer.kind), transformer);
        Ok(())
    }

    async fn delete_transformer(&self, metric_id: Uuid, kind: TransformerKind) -> Result<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transformers
            .remove(&(metric_id, kind))
            .is_some())
    }

    async fn find_transformer(
        &self,
        metric_id: Uuid,
        kind: TransformerKind,
    ) -> Result<Option<Transformer>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .transformers
            .get(&(metric_id, kind))
            .cloned())
    }

    async fn save_chart_config(
        &self,
        chart_id: Uuid,
        _metric_id: Uuid,
        config: serde_json::Value,
    ) -> Result<()> {
        self.inner.lock().unwrap().charts.insert(chart_id, config);
        Ok(())
    }

    async fn find_lease(&self, resource_id: Uuid) -> Result<Option<EditLease>> {
        Ok(self.inner.lock().unwrap().leases.get(&resource_id).cloned())
    }

    async fn upsert_lease(&self, lease: EditLease) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .leases
            .insert(lease.resource_id, lease);
        Ok(())
    }

    async fn touch_lease(
        &self,
        resource_id: Uuid,
        holder_id: Uuid,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.leases.get_mut(&resource_id) {
            Some(lease) if lease.holder_id == holder_id => {
                lease.last_seen = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_lease(&self, resource_id: Uuid, holder_id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.leases.get(&resource_id) {
            Some(lease) if lease.holder_id == holder_id => {
                inner.leases.remove(&resource_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_team(&self, team: Team) -> Result<()> {
        self.inner.lock().unwrap().teams.insert(team.id, team);
        Ok(())
    }

    async fn find_team(&self, id: Uuid) -> Result<Option<Team>> {
        Ok(self.inner.lock().unwrap().teams.get(&id).cloned())
    }
}
