//! Pipeline executor
//!
//! Maps each operation of a pipeline variant onto real work against the
//! store and the external collaborators, threading the fetched payload,
//! normalized points, and chart configuration through the run. Steps
//! execute strictly in the variant's order; there is no parallel step
//! execution within a run.

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use pulse_core::domain::data::{TimeSeriesPoint, Transformer, TransformerKind};
use pulse_core::domain::metric::Metric;
use pulse_core::pipeline::step::Operation;
use pulse_core::pipeline::variant::PipelineVariant;

use crate::clients::{SourceClient, TransformerClient};
use crate::pipeline::runner::{RunContext, StepRunner};
use crate::pipeline::PipelineError;
use crate::store::Store;

/// Executes full pipeline runs
pub struct PipelineExecutor {
    store: Arc<dyn Store>,
    source: Arc<dyn SourceClient>,
    transformer: Arc<dyn TransformerClient>,
    step_timeout: Duration,
}

/// Values produced by earlier operations and consumed by later ones.
/// Never persisted; dies with the run.
#[derive(Default)]
struct RunState {
    raw: Option<serde_json::Value>,
    ingestion_code: Option<String>,
    chart_code: Option<String>,
    points: Option<Vec<TimeSeriesPoint>>,
    chart_config: Option<serde_json::Value>,
}

impl PipelineExecutor {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn SourceClient>,
        transformer: Arc<dyn TransformerClient>,
        step_timeout: Duration,
    ) -> Self {
        Self {
            store,
            source,
            transformer,
            step_timeout,
        }
    }

    /// Runs a full pipeline to completion.
    ///
    /// This is the fault boundary for detached execution: every error path
    /// ends in `fail()`, so a crashed step never leaves the metric stuck
    /// showing "in progress".
    pub async fn execute(&self, metric: Metric, run_id: Uuid, variant: PipelineVariant) {
        let ctx = RunContext {
            metric_id: metric.id,
            org_id: metric.org_id,
            chart_id: metric.chart_id,
            run_id,
            store: Arc::clone(&self.store),
        };
        let runner = StepRunner::new(ctx, variant, self.step_timeout);

        tracing::info!(
            "Starting {} pipeline for metric {} (run {})",
            variant.as_str(),
            metric.id,
            run_id
        );

        match self.run_operations(&metric, &runner).await {
            Ok(()) => {
                if let Err(err) = runner.complete().await {
                    tracing::error!("Failed to finalize run {}: {}", run_id, err);
                }
            }
            Err(err) => {
                if let Err(persist_err) = runner.fail(&err.to_string()).await {
                    tracing::error!(
                        "Failed to persist failure of run {}: {}",
                        run_id,
                        persist_err
                    );
                }
            }
        }
    }

    async fn run_operations(
        &self,
        metric: &Metric,
        runner: &StepRunner,
    ) -> Result<(), PipelineError> {
        let mut state = RunState::default();

        for &op in runner.variant().operations() {
            match op {
                Operation::Fetch => {
                    let raw = runner
                        .run(op, self.source.fetch_raw(&metric.integration, metric.id))
                        .await?;
                    state.raw = Some(raw);
                }
                Operation::DeleteData => {
                    runner
                        .run(op, async {
                            let removed = self.store.delete_points(metric.id).await?;
                            Ok(removed)
                        })
                        .await?;
                }
                Operation::DeleteIngestionTransformer => {
                    runner
                        .run(op, async {
                            // No-op for brand-new metrics.
                            let deleted = self
                                .store
                                .delete_transformer(metric.id, TransformerKind::Ingestion)
                                .await?;
                            Ok(deleted)
                        })
                        .await?;
                }
                Operation::DeleteChartTransformer => {
                    runner
                        .run(op, async {
                            let deleted = self
                                .store
                                .delete_transformer(metric.id, TransformerKind::Chart)
                                .await?;
                            Ok(deleted)
                        })
                        .await?;
                }
                Operation::GenerateIngestionTransformer => {
                    let code = runner
                        .run(op, async {
                            let sample = self.raw_payload(&state)?;
                            let code = self
                                .transformer
                                .generate(TransformerKind::Ingestion, sample)
                                .await?;
                            self.store
                                .save_transformer(Transformer {
                                    metric_id: metric.id,
                                    kind: TransformerKind::Ingestion,
                                    code: code.clone(),
                                    generated_at: chrono::Utc::now(),
                                })
                                .await?;
                            Ok(code)
                        })
                        .await?;
                    state.ingestion_code = Some(code);
                }
                Operation::ExecuteIngestionTransformer => {
                    // Lookups run inside the step so a missing stored
                    // transformer is logged as a failure of this step.
                    let points = runner
                        .run(op, async {
                            let code = self
                                .transformer_code(metric.id, TransformerKind::Ingestion, &state)
                                .await?;
                            let raw = self.raw_payload(&state)?;
                            let output = self
                                .transformer
                                .execute(TransformerKind::Ingestion, &code, raw)
                                .await?;
                            let points: Vec<TimeSeriesPoint> = serde_json::from_value(output)
                                .map_err(|e| {
                                    PipelineError::Transformer(format!(
                                        "ingestion output is not a point list: {}",
                                        e
                                    ))
                                })?;
                            Ok(points)
                        })
                        .await?;
                    state.points = Some(points);
                }
                Operation::SaveData => {
                    runner
                        .run(op, async {
                            let points = state.points.as_deref().ok_or_else(|| {
                                PipelineError::Transformer(
                                    "no normalized points available to save".to_string(),
                                )
                            })?;
                            self.store.replace_points(metric.id, points).await?;
                            Ok(points.len())
                        })
                        .await?;
                }
                Operation::GenerateChartTransformer => {
                    let code = runner
                        .run(op, async {
                            let sample = self.points_value(metric.id, &state).await?;
                            let code = self
                                .transformer
                                .generate(TransformerKind::Chart, &sample)
                                .await?;
                            self.store
                                .save_transformer(Transformer {
                                    metric_id: metric.id,
                                    kind: TransformerKind::Chart,
                                    code: code.clone(),
                                    generated_at: chrono::Utc::now(),
                                })
                                .await?;
                            Ok(code)
                        })
                        .await?;
                    state.chart_code = Some(code);
                }
                Operation::ExecuteChartTransformer => {
                    let config = runner
                        .run(op, async {
                            let code = self
                                .transformer_code(metric.id, TransformerKind::Chart, &state)
                                .await?;
                            let input = self.points_value(metric.id, &state).await?;
                            self.transformer
                                .execute(TransformerKind::Chart, &code, &input)
                                .await
                        })
                        .await?;
                    state.chart_config = Some(config);
                }
                Operation::SaveChart => {
                    runner
                        .run(op, async {
                            let config = state.chart_config.clone().ok_or_else(|| {
                                PipelineError::Transformer(
                                    "no chart configuration available to save".to_string(),
                                )
                            })?;
                            self.store
                                .save_chart_config(metric.chart_id, metric.id, config)
                                .await?;
                            Ok(())
                        })
                        .await?;
                }
            }
        }

        Ok(())
    }

    fn raw_payload<'a>(&self, state: &'a RunState) -> Result<&'a serde_json::Value, PipelineError> {
        state.raw.as_ref().ok_or_else(|| {
            PipelineError::Source("no raw payload was fetched this run".to_string())
        })
    }

    /// Code generated earlier in this run, or the stored transformer for
    /// variants that reuse existing code.
    async fn transformer_code(
        &self,
        metric_id: Uuid,
        kind: TransformerKind,
        state: &RunState,
    ) -> Result<String, PipelineError> {
        let cached = match kind {
            TransformerKind::Ingestion => state.ingestion_code.clone(),
            TransformerKind::Chart => state.chart_code.clone(),
        };

        if let Some(code) = cached {
            return Ok(code);
        }

        self.store
            .find_transformer(metric_id, kind)
            .await?
            .map(|t| t.code)
            .ok_or(PipelineError::MissingTransformer(kind))
    }

    /// Points from this run, falling back to stored points for variants
    /// that never fetch (chart-only).
    async fn points_value(
        &self,
        metric_id: Uuid,
        state: &RunState,
    ) -> Result<serde_json::Value, PipelineError> {
        let points = match &state.points {
            Some(points) => points.clone(),
            None => self.store.find_points(metric_id).await?,
        };

        serde_json::to_value(points)
            .map_err(|e| PipelineError::Transformer(format!("points are not serializable: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use async_trait::async_trait;
    use pulse_core::domain::run::{PipelineRun, RunStatus};
    use pulse_core::domain::step_log::StepStatus;
    use pulse_core::pipeline::step::Step;

    struct StubSource {
        fail: bool,
    }

    #[async_trait]
    impl SourceClient for StubSource {
        async fn fetch_raw(
            &self,
            _integration: &str,
            _metric_id: Uuid,
        ) -> Result<serde_json::Value, PipelineError> {
            if self.fail {
                return Err(PipelineError::Source("proxy unreachable".to_string()));
            }
            Ok(serde_json::json!({ "rows": [ { "day": "2024-01-01", "count": 3 } ] }))
        }
    }

    struct StubTransformer;

    #[async_trait]
    impl TransformerClient for StubTransformer {
        async fn generate(
            &self,
            kind: TransformerKind,
            _sample: &serde_json::Value,
        ) -> Result<String, PipelineError> {
            Ok(format!("generated {} code", kind.as_str()))
        }

        async fn execute(
            &self,
            kind: TransformerKind,
            _code: &str,
            _input: &serde_json::Value,
        ) -> Result<serde_json::Value, PipelineError> {
            match kind {
                TransformerKind::Ingestion => Ok(serde_json::json!([
                    { "timestamp": "2024-01-01T00:00:00Z", "value": 3.0, "label": null }
                ])),
                TransformerKind::Chart => Ok(serde_json::json!({ "type": "line" })),
            }
        }
    }

    async fn seed_metric(store: &MemoryStore) -> Metric {
        let now = chrono::Utc::now();
        let metric = Metric {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            name: "signups".to_string(),
            integration: "hubspot".to_string(),
            current_step: None,
            last_error: None,
            last_fetched_at: None,
            chart_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        store.create_metric(metric.clone()).await.unwrap();
        metric
    }

    async fn seed_run(store: &MemoryStore, metric_id: Uuid, variant: PipelineVariant) -> Uuid {
        let run = PipelineRun {
            id: Uuid::new_v4(),
            metric_id,
            variant,
            status: RunStatus::Running,
            current_step: None,
            started_at: chrono::Utc::now(),
            finished_at: None,
        };
        let id = run.id;
        store.create_run(run).await.unwrap();
        id
    }

    fn executor(store: &MemoryStore, fail_fetch: bool) -> PipelineExecutor {
        PipelineExecutor::new(
            Arc::new(store.clone()),
            Arc::new(StubSource { fail: fail_fetch }),
            Arc::new(StubTransformer),
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_hard_refresh_completes_every_operation_in_order() {
        let store = MemoryStore::new();
        let metric = seed_metric(&store).await;
        let run_id = seed_run(&store, metric.id, PipelineVariant::HardRefresh).await;

        executor(&store, false)
            .execute(metric.clone(), run_id, PipelineVariant::HardRefresh)
            .await;

        let logs = store.find_step_logs(metric.id).await.unwrap();
        let expected = PipelineVariant::HardRefresh.operations();

        assert_eq!(logs.len(), expected.len());
        for (entry, op) in logs.iter().zip(expected) {
            assert_eq!(entry.status, StepStatus::Completed);
            assert_eq!(entry.operation, Some(*op));
        }

        let updated = store.find_metric(metric.id).await.unwrap().unwrap();
        assert!(updated.current_step.is_none());
        assert!(updated.last_fetched_at.is_some());

        let run = store.find_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_soft_refresh_reuses_stored_transformers() {
        let store = MemoryStore::new();
        let metric = seed_metric(&store).await;
        for kind in [TransformerKind::Ingestion, TransformerKind::Chart] {
            store
                .save_transformer(Transformer {
                    metric_id: metric.id,
                    kind,
                    code: "stored code".to_string(),
                    generated_at: chrono::Utc::now(),
                })
                .await
                .unwrap();
        }
        let run_id = seed_run(&store, metric.id, PipelineVariant::SoftRefresh).await;

        executor(&store, false)
            .execute(metric.clone(), run_id, PipelineVariant::SoftRefresh)
            .await;

        let run = store.find_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);

        let points = store.find_points(metric.id).await.unwrap();
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_refresh_without_transformers_fails_cleanly() {
        let store = MemoryStore::new();
        let metric = seed_metric(&store).await;
        let run_id = seed_run(&store, metric.id, PipelineVariant::SoftRefresh).await;

        executor(&store, false)
            .execute(metric.clone(), run_id, PipelineVariant::SoftRefresh)
            .await;

        let updated = store.find_metric(metric.id).await.unwrap().unwrap();
        assert!(updated.current_step.is_none());
        assert!(
            updated
                .last_error
                .as_deref()
                .unwrap()
                .contains("transformer")
        );

        let run = store.find_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);

        // The missing stored transformer is logged as a failure of the
        // executing step, not silently dropped before it.
        let logs = store.find_step_logs(metric.id).await.unwrap();
        let failed = logs
            .iter()
            .filter(|e| e.status == StepStatus::Failed)
            .collect::<Vec<_>>();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].step, Step::ExecutingIngestionTransformer);
        assert_eq!(
            failed[0].operation,
            Some(Operation::ExecuteIngestionTransformer)
        );
        assert!(failed[0].error.as_deref().unwrap().contains("transformer"));
    }

    #[tokio::test]
    async fn test_failed_fetch_aborts_and_records_error() {
        let store = MemoryStore::new();
        let metric = seed_metric(&store).await;
        let run_id = seed_run(&store, metric.id, PipelineVariant::HardRefresh).await;

        executor(&store, true)
            .execute(metric.clone(), run_id, PipelineVariant::HardRefresh)
            .await;

        let logs = store.find_step_logs(metric.id).await.unwrap();
        // The pipeline aborts at the first failure; nothing after it runs.
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepStatus::Failed);

        let updated = store.find_metric(metric.id).await.unwrap().unwrap();
        assert!(updated.current_step.is_none());
        assert_eq!(
            updated.last_error.as_deref(),
            Some("source fetch failed: proxy unreachable")
        );
    }

    #[tokio::test]
    async fn test_chart_only_uses_stored_points_and_skips_fetch() {
        let store = MemoryStore::new();
        let metric = seed_metric(&store).await;
        store
            .replace_points(
                metric.id,
                &[TimeSeriesPoint {
                    timestamp: chrono::Utc::now(),
                    value: 7.0,
                    label: None,
                }],
            )
            .await
            .unwrap();
        let run_id = seed_run(&store, metric.id, PipelineVariant::ChartOnly).await;

        executor(&store, true) // fetch would fail, but chart-only never fetches
            .execute(metric.clone(), run_id, PipelineVariant::ChartOnly)
            .await;

        let run = store.find_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);

        let logs = store.find_step_logs(metric.id).await.unwrap();
        assert_eq!(logs.len(), PipelineVariant::ChartOnly.operations().len());
    }
}
