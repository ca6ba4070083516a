//! Pipeline Run Repository
//!
//! Handles all database operations related to pipeline runs.

use pulse_core::domain::run::{PipelineRun, RunStatus};
use pulse_core::pipeline::step::Step;
use pulse_core::pipeline::variant::PipelineVariant;
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new run
pub async fn create(pool: &PgPool, run: &PipelineRun) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO pipeline_runs (id, metric_id, variant, status, current_step,
                                   started_at, finished_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(run.id)
    .bind(run.metric_id)
    .bind(run.variant.as_str())
    .bind(status_to_string(run.status))
    .bind(run.current_step.map(|s| s.as_str()))
    .bind(run.started_at)
    .bind(run.finished_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a run by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<PipelineRun>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, metric_id, variant, status, current_step, started_at, finished_at
        FROM pipeline_runs
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find the live (still running) run for a metric, if any
pub async fn find_live_by_metric(
    pool: &PgPool,
    metric_id: Uuid,
) -> Result<Option<PipelineRun>, sqlx::Error> {
    let row = sqlx::query_as::<_, RunRow>(
        r#"
        SELECT id, metric_id, variant, status, current_step, started_at, finished_at
        FROM pipeline_runs
        WHERE metric_id = $1 AND status = 'Running'
        ORDER BY started_at DESC
        LIMIT 1
        "#,
    )
    .bind(metric_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Set or clear the run's current step
pub async fn set_step(
    pool: &PgPool,
    run_id: Uuid,
    step: Option<Step>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipeline_runs
        SET current_step = $1
        WHERE id = $2
        "#,
    )
    .bind(step.map(|s| s.as_str()))
    .bind(run_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Move a run to a terminal status
pub async fn finish(
    pool: &PgPool,
    run_id: Uuid,
    status: RunStatus,
    finished_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE pipeline_runs
        SET status = $1, current_step = NULL, finished_at = $2
        WHERE id = $3
        "#,
    )
    .bind(status_to_string(status))
    .bind(finished_at)
    .bind(run_id)
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn status_to_string(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Running => "Running",
        RunStatus::Succeeded => "Succeeded",
        RunStatus::Failed => "Failed",
    }
}

fn string_to_status(s: &str) -> RunStatus {
    match s {
        "Succeeded" => RunStatus::Succeeded,
        "Failed" => RunStatus::Failed,
        _ => RunStatus::Running,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunRow {
    id: Uuid,
    metric_id: Uuid,
    variant: String,
    status: String,
    current_step: Option<String>,
    started_at: chrono::DateTime<chrono::Utc>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<RunRow> for PipelineRun {
    fn from(row: RunRow) -> Self {
        PipelineRun {
            id: row.id,
            metric_id: row.metric_id,
            variant: PipelineVariant::parse(&row.variant).unwrap_or(PipelineVariant::SoftRefresh),
            status: string_to_status(&row.status),
            current_step: row.current_step.as_deref().and_then(Step::parse),
            started_at: row.started_at,
            finished_at: row.finished_at,
        }
    }
}
