//! Step runner
//!
//! The runner is an observability wrapper around pipeline operations: it
//! persists the current step *before* the work starts (so a poller can see
//! "about to do X" even while X is slow), times the work, appends a step
//! log entry, and re-throws failures unchanged. Recovery policy lives in
//! the caller; the runner never swallows an error.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use pulse_core::domain::run::RunStatus;
use pulse_core::domain::step_log::{StepLogEntry, StepStatus};
use pulse_core::pipeline::step::{Operation, Step};
use pulse_core::pipeline::variant::PipelineVariant;

use crate::pipeline::PipelineError;
use crate::store::Store;

/// Short-lived context for one pipeline invocation
#[derive(Clone)]
pub struct RunContext {
    pub metric_id: Uuid,
    pub org_id: Uuid,
    /// The chart record this run produces.
    pub chart_id: Uuid,
    pub run_id: Uuid,
    pub store: Arc<dyn Store>,
}

/// Executes operations with progress persistence and step logging
pub struct StepRunner {
    ctx: RunContext,
    variant: PipelineVariant,
    step_timeout: Duration,
}

impl StepRunner {
    pub fn new(ctx: RunContext, variant: PipelineVariant, step_timeout: Duration) -> Self {
        Self {
            ctx,
            variant,
            step_timeout,
        }
    }

    pub fn variant(&self) -> PipelineVariant {
        self.variant
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Runs one operation: persist step, execute under the per-step
    /// deadline, log the attempt, and hand the result back unchanged.
    pub async fn run<T, Fut>(&self, operation: Operation, work: Fut) -> Result<T, PipelineError>
    where
        T: serde::Serialize,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let step = operation.step();

        // Write-before-execute: the poller must observe the step while the
        // work is still in flight.
        self.persist_step(Some(step)).await?;

        let started_at = chrono::Utc::now();
        let start = std::time::Instant::now();

        let outcome = match tokio::time::timeout(self.step_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout {
                step,
                after: self.step_timeout,
            }),
        };

        let finished_at = chrono::Utc::now();
        let duration_ms = start.elapsed().as_millis() as i64;

        match outcome {
            Ok(value) => {
                let result = serde_json::to_value(&value).ok().filter(|v| !v.is_null());

                self.ctx
                    .store
                    .append_step_log(self.entry(
                        Some(operation),
                        step,
                        StepStatus::Completed,
                        started_at,
                        finished_at,
                        duration_ms,
                        None,
                        result,
                    ))
                    .await?;

                Ok(value)
            }
            Err(err) => {
                tracing::warn!(
                    "Step '{}' failed for metric {}: {}",
                    step.as_str(),
                    self.ctx.metric_id,
                    err
                );

                // A log write failure must not mask the original error.
                if let Err(log_err) = self
                    .ctx
                    .store
                    .append_step_log(self.entry(
                        Some(operation),
                        step,
                        StepStatus::Failed,
                        started_at,
                        finished_at,
                        duration_ms,
                        Some(err.to_string()),
                        None,
                    ))
                    .await
                {
                    tracing::error!(
                        "Failed to log step failure for metric {}: {}",
                        self.ctx.metric_id,
                        log_err
                    );
                }

                Err(err)
            }
        }
    }

    /// Persists the step and a lightweight log entry for work performed by
    /// a collaborator outside `run()`. No operation is timed.
    pub async fn set_status(&self, step: Step) -> Result<(), PipelineError> {
        self.persist_step(Some(step)).await?;

        let now = chrono::Utc::now();
        self.ctx
            .store
            .append_step_log(self.entry(
                None,
                step,
                StepStatus::Completed,
                now,
                now,
                0,
                None,
                None,
            ))
            .await?;

        Ok(())
    }

    /// Clears pipeline state after a successful run and stamps the fetch
    /// time.
    pub async fn complete(&self) -> Result<(), PipelineError> {
        let now = chrono::Utc::now();
        self.ctx
            .store
            .mark_metric_completed(self.ctx.metric_id, now)
            .await?;
        self.ctx
            .store
            .finish_run(self.ctx.run_id, RunStatus::Succeeded, now)
            .await?;

        tracing::info!("Pipeline run {} completed", self.ctx.run_id);

        Ok(())
    }

    /// Clears the step and records the failure so the poller sees a
    /// failed, retriable metric instead of one stuck "in progress".
    pub async fn fail(&self, error: &str) -> Result<(), PipelineError> {
        self.ctx
            .store
            .mark_metric_failed(self.ctx.metric_id, error)
            .await?;
        self.ctx
            .store
            .finish_run(self.ctx.run_id, RunStatus::Failed, chrono::Utc::now())
            .await?;

        tracing::info!("Pipeline run {} failed: {}", self.ctx.run_id, error);

        Ok(())
    }

    async fn persist_step(&self, step: Option<Step>) -> Result<(), PipelineError> {
        self.ctx
            .store
            .set_current_step(self.ctx.metric_id, step)
            .await?;
        self.ctx.store.set_run_step(self.ctx.run_id, step).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn entry(
        &self,
        operation: Option<Operation>,
        step: Step,
        status: StepStatus,
        started_at: chrono::DateTime<chrono::Utc>,
        finished_at: chrono::DateTime<chrono::Utc>,
        duration_ms: i64,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> StepLogEntry {
        StepLogEntry {
            id: Uuid::new_v4(),
            metric_id: self.ctx.metric_id,
            run_id: self.ctx.run_id,
            operation,
            step,
            display_name: step.display_name().to_string(),
            status,
            started_at,
            finished_at,
            duration_ms,
            error,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pulse_core::domain::metric::Metric;
    use pulse_core::domain::run::PipelineRun;

    async fn runner_with_store(timeout: Duration) -> (StepRunner, MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let metric_id = Uuid::new_v4();
        let run_id = Uuid::new_v4();
        let now = chrono::Utc::now();

        let metric = Metric {
            id: metric_id,
            org_id: Uuid::new_v4(),
            name: "revenue".to_string(),
            integration: "stripe".to_string(),
            current_step: None,
            last_error: None,
            last_fetched_at: None,
            chart_id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };

        let run = PipelineRun {
            id: run_id,
            metric_id,
            variant: PipelineVariant::SoftRefresh,
            status: RunStatus::Running,
            current_step: None,
            started_at: now,
            finished_at: None,
        };

        let org_id = metric.org_id;
        let chart_id = metric.chart_id;

        store.create_metric(metric).await.unwrap();
        store.create_run(run).await.unwrap();

        let ctx = RunContext {
            metric_id,
            org_id,
            chart_id,
            run_id,
            store: Arc::new(store.clone()),
        };

        (
            StepRunner::new(ctx, PipelineVariant::SoftRefresh, timeout),
            store,
            metric_id,
        )
    }

    #[tokio::test]
    async fn test_step_is_visible_before_work_resolves() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_secs(5)).await;

        let observer = store.clone();
        let value = runner
            .run(Operation::Fetch, async move {
                // A concurrent poll issued mid-step must already see it.
                let metric = observer.find_metric(metric_id).await.unwrap().unwrap();
                assert_eq!(metric.current_step.as_deref(), Some("fetching-api-data"));
                Ok::<_, PipelineError>(42)
            })
            .await
            .unwrap();

        assert_eq!(value, 42);

        // run() itself never clears the step; only complete()/fail() do.
        let metric = store.find_metric(metric_id).await.unwrap().unwrap();
        assert_eq!(metric.current_step.as_deref(), Some("fetching-api-data"));
    }

    #[tokio::test]
    async fn test_successful_run_appends_completed_entry_with_result() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_secs(5)).await;

        runner
            .run(Operation::SaveData, async { Ok::<_, PipelineError>(17usize) })
            .await
            .unwrap();

        let logs = store.find_step_logs(metric_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepStatus::Completed);
        assert_eq!(logs[0].operation, Some(Operation::SaveData));
        assert_eq!(logs[0].step, Step::SavingTimeseriesData);
        assert_eq!(logs[0].result, Some(serde_json::json!(17)));
        assert!(logs[0].error.is_none());
    }

    #[tokio::test]
    async fn test_failed_run_rethrows_and_logs_exactly_once() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_secs(5)).await;

        let err = runner
            .run::<(), _>(Operation::Fetch, async {
                Err(PipelineError::Source("boom".to_string()))
            })
            .await
            .unwrap_err();

        // The original error propagates unchanged.
        assert_eq!(err.to_string(), "source fetch failed: boom");

        let logs = store.find_step_logs(metric_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepStatus::Failed);
        assert_eq!(logs[0].error.as_deref(), Some("source fetch failed: boom"));
    }

    #[tokio::test]
    async fn test_step_times_out() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_millis(20)).await;

        let err = runner
            .run::<(), _>(Operation::Fetch, async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Timeout { .. }));

        let logs = store.find_step_logs(metric_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].status, StepStatus::Failed);
    }

    #[tokio::test]
    async fn test_complete_clears_step_and_stamps_fetch_time() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_secs(5)).await;

        runner
            .run(Operation::Fetch, async { Ok::<_, PipelineError>(()) })
            .await
            .unwrap();
        runner.complete().await.unwrap();

        let metric = store.find_metric(metric_id).await.unwrap().unwrap();
        assert!(metric.current_step.is_none());
        assert!(metric.last_error.is_none());
        assert!(metric.last_fetched_at.is_some());

        let run = store.find_run(runner.context().run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_fail_clears_step_and_records_error() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_secs(5)).await;

        runner.fail("source fetch failed: boom").await.unwrap();

        let metric = store.find_metric(metric_id).await.unwrap().unwrap();
        assert!(metric.current_step.is_none());
        assert_eq!(metric.last_error.as_deref(), Some("source fetch failed: boom"));

        let run = store.find_run(runner.context().run_id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[tokio::test]
    async fn test_set_status_writes_lightweight_entry() {
        let (runner, store, metric_id) = runner_with_store(Duration::from_secs(5)).await;

        runner.set_status(Step::SavingChartConfig).await.unwrap();

        let metric = store.find_metric(metric_id).await.unwrap().unwrap();
        assert_eq!(metric.current_step.as_deref(), Some("saving-chart-config"));

        let logs = store.find_step_logs(metric_id).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].operation, None);
        assert_eq!(logs[0].duration_ms, 0);
    }
}
