//! Metric Repository
//!
//! Handles all database operations related to metrics.

use pulse_core::domain::metric::Metric;
use pulse_core::pipeline::step::Step;
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new metric
pub async fn create(pool: &PgPool, metric: &Metric) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO metrics (id, org_id, name, integration, current_step, last_error,
                             last_fetched_at, chart_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(metric.id)
    .bind(metric.org_id)
    .bind(&metric.name)
    .bind(&metric.integration)
    .bind(&metric.current_step)
    .bind(&metric.last_error)
    .bind(metric.last_fetched_at)
    .bind(metric.chart_id)
    .bind(metric.created_at)
    .bind(metric.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a metric by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Metric>, sqlx::Error> {
    let row = sqlx::query_as::<_, MetricRow>(
        r#"
        SELECT id, org_id, name, integration, current_step, last_error,
               last_fetched_at, chart_id, created_at, updated_at
        FROM metrics
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Find metrics by ID, scoped to one organization
///
/// Stays a single-table query: this backs the dashboard poll and is called
/// at sub-second intervals while pipelines are in flight.
pub async fn find_by_ids(
    pool: &PgPool,
    org_id: Uuid,
    ids: &[Uuid],
) -> Result<Vec<Metric>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MetricRow>(
        r#"
        SELECT id, org_id, name, integration, current_step, last_error,
               last_fetched_at, chart_id, created_at, updated_at
        FROM metrics
        WHERE org_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(org_id)
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Set or clear the currently-running step
pub async fn set_current_step(
    pool: &PgPool,
    metric_id: Uuid,
    step: Option<Step>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE metrics
        SET current_step = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(step.map(|s| s.as_str()))
    .bind(chrono::Utc::now())
    .bind(metric_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear pipeline state after a successful run and stamp the fetch time
pub async fn mark_completed(
    pool: &PgPool,
    metric_id: Uuid,
    fetched_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE metrics
        SET current_step = NULL, last_error = NULL, last_fetched_at = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(fetched_at)
    .bind(chrono::Utc::now())
    .bind(metric_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Clear the step and persist the failure message
pub async fn mark_failed(
    pool: &PgPool,
    metric_id: Uuid,
    error: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE metrics
        SET current_step = NULL, last_error = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(error)
    .bind(chrono::Utc::now())
    .bind(metric_id)
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct MetricRow {
    id: Uuid,
    org_id: Uuid,
    name: String,
    integration: String,
    current_step: Option<String>,
    last_error: Option<String>,
    last_fetched_at: Option<chrono::DateTime<chrono::Utc>>,
    chart_id: Uuid,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<MetricRow> for Metric {
    fn from(row: MetricRow) -> Self {
        Metric {
            id: row.id,
            org_id: row.org_id,
            name: row.name,
            integration: row.integration,
            current_step: row.current_step,
            last_error: row.last_error,
            last_fetched_at: row.last_fetched_at,
            chart_id: row.chart_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
