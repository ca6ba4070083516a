//! Step Log Repository
//!
//! Handles all database operations related to step log entries.
//! Entries are append-only; nothing in the pipeline updates or deletes them.

use pulse_core::domain::step_log::{StepLogEntry, StepStatus};
use pulse_core::pipeline::step::{Operation, Step};
use sqlx::PgPool;
use uuid::Uuid;

/// Append a step log entry
pub async fn append(pool: &PgPool, entry: &StepLogEntry) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO step_logs (id, metric_id, run_id, operation, step, display_name,
                               status, started_at, finished_at, duration_ms, error, result)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(entry.id)
    .bind(entry.metric_id)
    .bind(entry.run_id)
    .bind(entry.operation.map(|o| o.as_str()))
    .bind(entry.step.as_str())
    .bind(&entry.display_name)
    .bind(status_to_string(entry.status))
    .bind(entry.started_at)
    .bind(entry.finished_at)
    .bind(entry.duration_ms)
    .bind(&entry.error)
    .bind(&entry.result)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get all step log entries for a metric, oldest first
pub async fn find_by_metric(
    pool: &PgPool,
    metric_id: Uuid,
) -> Result<Vec<StepLogEntry>, sqlx::Error> {
    let rows = sqlx::query_as::<_, StepLogRow>(
        r#"
        SELECT id, metric_id, run_id, operation, step, display_name, status,
               started_at, finished_at, duration_ms, error, result
        FROM step_logs
        WHERE metric_id = $1
        ORDER BY started_at ASC
        "#,
    )
    .bind(metric_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

// =============================================================================
// Helper Functions
// =============================================================================

fn status_to_string(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => "completed",
        StepStatus::Failed => "failed",
    }
}

fn string_to_status(s: &str) -> StepStatus {
    match s {
        "failed" => StepStatus::Failed,
        _ => StepStatus::Completed,
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct StepLogRow {
    id: Uuid,
    metric_id: Uuid,
    run_id: Uuid,
    operation: Option<String>,
    step: String,
    display_name: String,
    status: String,
    started_at: chrono::DateTime<chrono::Utc>,
    finished_at: chrono::DateTime<chrono::Utc>,
    duration_ms: i64,
    error: Option<String>,
    result: Option<serde_json::Value>,
}

impl From<StepLogRow> for StepLogEntry {
    fn from(row: StepLogRow) -> Self {
        StepLogEntry {
            id: row.id,
            metric_id: row.metric_id,
            run_id: row.run_id,
            operation: row.operation.as_deref().and_then(Operation::parse),
            step: Step::parse(&row.step).unwrap_or(Step::FetchingApiData),
            display_name: row.display_name,
            status: string_to_status(&row.status),
            started_at: row.started_at,
            finished_at: row.finished_at,
            duration_ms: row.duration_ms,
            error: row.error,
            result: row.result,
        }
    }
}
