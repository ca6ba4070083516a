//! Metric Service
//!
//! Business logic for metric management, pipeline triggering, and the
//! polling queries. The triggering path is fire-and-forget: the caller
//! gets its acknowledgment as soon as the initial step is persisted, and
//! the pipeline itself runs as a detached task.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use pulse_core::domain::metric::Metric;
use pulse_core::domain::run::{PipelineRun, RunStatus};
use pulse_core::domain::step_log::StepLogEntry;
use pulse_core::dto::metric::{CreateMetric, MetricProgress, MetricStatus, TriggerAck};
use pulse_core::pipeline::variant::PipelineVariant;

use crate::pipeline::PipelineExecutor;
use crate::store::{Store, StoreError};

/// Service error type
#[derive(Debug)]
pub enum MetricError {
    NotFound(Uuid),
    ValidationError(String),
    StorageError(StoreError),
}

impl From<StoreError> for MetricError {
    fn from(err: StoreError) -> Self {
        MetricError::StorageError(err)
    }
}

pub type Result<T> = std::result::Result<T, MetricError>;

/// Create a new metric
pub async fn create_metric(
    store: &Arc<dyn Store>,
    org_id: Uuid,
    req: CreateMetric,
) -> Result<Metric> {
    validate_metric_request(&req)?;

    let now = chrono::Utc::now();
    let metric = Metric {
        id: Uuid::new_v4(),
        org_id,
        name: req.name,
        integration: req.integration,
        current_step: None,
        last_error: None,
        last_fetched_at: None,
        chart_id: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
    };

    store.create_metric(metric.clone()).await?;

    tracing::info!("Metric created: {} ({})", metric.name, metric.id);

    Ok(metric)
}

/// Get a metric, verifying the caller's organization owns it
///
/// A metric belonging to another organization reads as not-found so the
/// endpoint cannot be used to probe for existence.
pub async fn get_metric(store: &Arc<dyn Store>, org_id: Uuid, id: Uuid) -> Result<Metric> {
    let metric = store
        .find_metric(id)
        .await?
        .filter(|m| m.org_id == org_id)
        .ok_or(MetricError::NotFound(id))?;

    Ok(metric)
}

/// Trigger a pipeline for a metric and return immediately
///
/// Performs exactly two synchronous actions before detaching: the access
/// check and persisting the initial step (plus the run row that makes the
/// execution addressable). If a run is already live for the metric the
/// trigger is refused with `started: false` instead of racing it.
pub async fn start_pipeline(
    store: &Arc<dyn Store>,
    executor: &Arc<PipelineExecutor>,
    org_id: Uuid,
    metric_id: Uuid,
    variant: PipelineVariant,
) -> Result<TriggerAck> {
    let metric = get_metric(store, org_id, metric_id).await?;

    if let Some(live) = store.find_live_run(metric_id).await? {
        tracing::info!(
            "Refusing {} trigger for metric {}: run {} is still live",
            variant.as_str(),
            metric_id,
            live.id
        );
        return Ok(TriggerAck {
            success: true,
            started: false,
            run_id: None,
        });
    }

    let initial_step = variant.operations().first().map(|op| op.step());

    let run = PipelineRun {
        id: Uuid::new_v4(),
        metric_id,
        variant,
        status: RunStatus::Running,
        current_step: initial_step,
        started_at: chrono::Utc::now(),
        finished_at: None,
    };
    let run_id = run.id;

    // The live-run check above is a fast path; the unique live-run index
    // is what actually closes the race between simultaneous triggers.
    if let Err(err) = store.create_run(run).await {
        if err.is_conflict() {
            tracing::info!(
                "Refusing {} trigger for metric {}: lost the race to a concurrent trigger",
                variant.as_str(),
                metric_id
            );
            return Ok(TriggerAck {
                success: true,
                started: false,
                run_id: None,
            });
        }
        return Err(err.into());
    }
    store.set_current_step(metric_id, initial_step).await?;

    tracing::info!(
        "Starting {} pipeline for metric {} in the background (run {})",
        variant.as_str(),
        metric_id,
        run_id
    );

    // Fire-and-forget: the executor owns the fault boundary, so every
    // outcome of the detached task ends in complete() or fail().
    let executor = Arc::clone(executor);
    tokio::spawn(async move {
        executor.execute(metric, run_id, variant).await;
    });

    Ok(TriggerAck {
        success: true,
        started: true,
        run_id: Some(run_id),
    })
}

/// Poll target for the in-flight progress bar
pub async fn get_progress(store: &Arc<dyn Store>, org_id: Uuid, id: Uuid) -> Result<MetricProgress> {
    let metric = get_metric(store, org_id, id).await?;

    Ok(MetricProgress {
        is_processing: metric.is_processing(),
        current_step: metric.current_step,
        error: metric.last_error,
    })
}

/// Card-level status poll
pub async fn get_status(store: &Arc<dyn Store>, org_id: Uuid, id: Uuid) -> Result<MetricStatus> {
    let metric = get_metric(store, org_id, id).await?;
    Ok(status_of(&metric))
}

/// Dashboard-level batch status poll
///
/// One store query for N metrics; ids the organization does not own are
/// simply absent from the map, so one bad id cannot fail a whole poll.
pub async fn get_batch_status(
    store: &Arc<dyn Store>,
    org_id: Uuid,
    ids: &[Uuid],
) -> Result<HashMap<Uuid, MetricStatus>> {
    let metrics = store.find_metrics(org_id, ids).await?;

    Ok(metrics.iter().map(|m| (m.id, status_of(m))).collect())
}

/// Step history for a metric, oldest first
pub async fn get_step_logs(
    store: &Arc<dyn Store>,
    org_id: Uuid,
    id: Uuid,
) -> Result<Vec<StepLogEntry>> {
    // Verify ownership first; the log itself carries no org scoping.
    let _metric = get_metric(store, org_id, id).await?;

    let logs = store.find_step_logs(id).await?;
    Ok(logs)
}

fn status_of(metric: &Metric) -> MetricStatus {
    MetricStatus {
        id: metric.id,
        refresh_status: metric.current_step.clone(),
        last_error: metric.last_error.clone(),
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate_metric_request(req: &CreateMetric) -> Result<()> {
    if req.name.trim().is_empty() {
        return Err(MetricError::ValidationError(
            "Metric name cannot be empty".to_string(),
        ));
    }

    if req.name.len() > 255 {
        return Err(MetricError::ValidationError(
            "Metric name is too long (max 255 characters)".to_string(),
        ));
    }

    if req.integration.trim().is_empty() {
        return Err(MetricError::ValidationError(
            "Metric integration cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{SourceClient, TransformerClient};
    use crate::pipeline::PipelineError;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pulse_core::domain::data::TransformerKind;
    use std::time::Duration;

    struct SlowSource;

    #[async_trait]
    impl SourceClient for SlowSource {
        async fn fetch_raw(
            &self,
            _integration: &str,
            _metric_id: Uuid,
        ) -> std::result::Result<serde_json::Value, PipelineError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(serde_json::json!({}))
        }
    }

    struct FastSource;

    #[async_trait]
    impl SourceClient for FastSource {
        async fn fetch_raw(
            &self,
            _integration: &str,
            _metric_id: Uuid,
        ) -> std::result::Result<serde_json::Value, PipelineError> {
            Ok(serde_json::json!({ "rows": [] }))
        }
    }

    struct StubTransformer;

    #[async_trait]
    impl TransformerClient for StubTransformer {
        async fn generate(
            &self,
            _kind: TransformerKind,
            _sample: &serde_json::Value,
        ) -> std::result::Result<String, PipelineError> {
            Ok("code".to_string())
        }

        async fn execute(
            &self,
            kind: TransformerKind,
            _code: &str,
            _input: &serde_json::Value,
        ) -> std::result::Result<serde_json::Value, PipelineError> {
            match kind {
                TransformerKind::Ingestion => Ok(serde_json::json!([])),
                TransformerKind::Chart => Ok(serde_json::json!({ "type": "bar" })),
            }
        }
    }

    fn deps(
        store: &MemoryStore,
        source: Arc<dyn SourceClient>,
    ) -> (Arc<dyn Store>, Arc<PipelineExecutor>) {
        let store: Arc<dyn Store> = Arc::new(store.clone());
        let executor = Arc::new(PipelineExecutor::new(
            Arc::clone(&store),
            source,
            Arc::new(StubTransformer),
            Duration::from_secs(60),
        ));
        (store, executor)
    }

    async fn seed(store: &Arc<dyn Store>, org_id: Uuid) -> Metric {
        create_metric(
            store,
            org_id,
            CreateMetric {
                name: "revenue".to_string(),
                integration: "stripe".to_string(),
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_trigger_sets_initial_step_before_returning() {
        let memory = MemoryStore::new();
        let (store, executor) = deps(&memory, Arc::new(SlowSource));
        let org = Uuid::new_v4();
        let metric = seed(&store, org).await;

        let ack = start_pipeline(&store, &executor, org, metric.id, PipelineVariant::SoftRefresh)
            .await
            .unwrap();

        assert!(ack.success);
        assert!(ack.started);

        // The ack comes back while the fetch is still sleeping; the poller
        // must already see the initial step.
        let progress = get_progress(&store, org, metric.id).await.unwrap();
        assert!(progress.is_processing);
        assert_eq!(progress.current_step.as_deref(), Some("fetching-api-data"));
    }

    #[tokio::test]
    async fn test_double_trigger_is_refused_while_run_is_live() {
        let memory = MemoryStore::new();
        let (store, executor) = deps(&memory, Arc::new(SlowSource));
        let org = Uuid::new_v4();
        let metric = seed(&store, org).await;

        let first = start_pipeline(&store, &executor, org, metric.id, PipelineVariant::SoftRefresh)
            .await
            .unwrap();
        assert!(first.started);

        let second =
            start_pipeline(&store, &executor, org, metric.id, PipelineVariant::HardRefresh)
                .await
                .unwrap();
        assert!(second.success);
        assert!(!second.started);
        assert!(second.run_id.is_none());
    }

    #[tokio::test]
    async fn test_second_live_run_insert_is_a_conflict() {
        let memory = MemoryStore::new();
        let (store, _executor) = deps(&memory, Arc::new(FastSource));
        let org = Uuid::new_v4();
        let metric = seed(&store, org).await;

        let run = |id: Uuid, status: RunStatus| PipelineRun {
            id,
            metric_id: metric.id,
            variant: PipelineVariant::SoftRefresh,
            status,
            current_step: None,
            started_at: chrono::Utc::now(),
            finished_at: None,
        };

        let first = Uuid::new_v4();
        store.create_run(run(first, RunStatus::Running)).await.unwrap();

        // One live run per metric; a simultaneous second insert loses.
        let err = store
            .create_run(run(Uuid::new_v4(), RunStatus::Running))
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // A finished run no longer blocks a new one.
        store
            .finish_run(first, RunStatus::Failed, chrono::Utc::now())
            .await
            .unwrap();
        store
            .create_run(run(Uuid::new_v4(), RunStatus::Running))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_simultaneous_triggers_start_exactly_one_run() {
        let memory = MemoryStore::new();
        let (store, executor) = deps(&memory, Arc::new(SlowSource));
        let org = Uuid::new_v4();
        let metric = seed(&store, org).await;

        let (a, b) = tokio::join!(
            start_pipeline(&store, &executor, org, metric.id, PipelineVariant::SoftRefresh),
            start_pipeline(&store, &executor, org, metric.id, PipelineVariant::SoftRefresh),
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(a.success && b.success);
        assert_eq!(a.started as u8 + b.started as u8, 1);
    }

    #[tokio::test]
    async fn test_detached_run_eventually_completes() {
        let memory = MemoryStore::new();
        let (store, executor) = deps(&memory, Arc::new(FastSource));
        let org = Uuid::new_v4();
        let metric = seed(&store, org).await;

        let ack = start_pipeline(&store, &executor, org, metric.id, PipelineVariant::HardRefresh)
            .await
            .unwrap();
        let run_id = ack.run_id.unwrap();

        // Poll the way the UI would until the background task finishes.
        let mut finished = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let run = store.find_run(run_id).await.unwrap().unwrap();
            if run.status != RunStatus::Running {
                assert_eq!(run.status, RunStatus::Succeeded);
                finished = true;
                break;
            }
        }
        assert!(finished, "pipeline run never finished");

        let progress = get_progress(&store, org, metric.id).await.unwrap();
        assert!(!progress.is_processing);
        assert!(progress.error.is_none());
    }

    #[tokio::test]
    async fn test_foreign_org_reads_as_not_found() {
        let memory = MemoryStore::new();
        let (store, executor) = deps(&memory, Arc::new(FastSource));
        let org = Uuid::new_v4();
        let metric = seed(&store, org).await;

        let other_org = Uuid::new_v4();
        let result =
            start_pipeline(&store, &executor, other_org, metric.id, PipelineVariant::SoftRefresh)
                .await;
        assert!(matches!(result, Err(MetricError::NotFound(_))));

        let result = get_progress(&store, other_org, metric.id).await;
        assert!(matches!(result, Err(MetricError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_batch_status_skips_foreign_and_unknown_ids() {
        let memory = MemoryStore::new();
        let (store, _executor) = deps(&memory, Arc::new(FastSource));
        let org = Uuid::new_v4();
        let mine = seed(&store, org).await;
        let theirs = seed(&store, Uuid::new_v4()).await;

        let ids = [mine.id, theirs.id, Uuid::new_v4()];
        let map = get_batch_status(&store, org, &ids).await.unwrap();

        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&mine.id));
    }

    #[test]
    fn test_validate_empty_name() {
        let req = CreateMetric {
            name: "".to_string(),
            integration: "stripe".to_string(),
        };
        assert!(matches!(
            validate_metric_request(&req),
            Err(MetricError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_empty_integration() {
        let req = CreateMetric {
            name: "revenue".to_string(),
            integration: " ".to_string(),
        };
        assert!(matches!(
            validate_metric_request(&req),
            Err(MetricError::ValidationError(_))
        ));
    }
}
