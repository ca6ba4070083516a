//! Data Repository
//!
//! Handles database operations for time-series points, generated
//! transformers, and chart configurations.

use pulse_core::domain::data::{TimeSeriesPoint, Transformer, TransformerKind};
use sqlx::PgPool;
use uuid::Uuid;

/// Delete all points for a metric, returning how many were removed
pub async fn delete_points(pool: &PgPool, metric_id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM timeseries_points WHERE metric_id = $1")
        .bind(metric_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Replace a metric's points with a freshly normalized set
pub async fn replace_points(
    pool: &PgPool,
    metric_id: Uuid,
    points: &[TimeSeriesPoint],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM timeseries_points WHERE metric_id = $1")
        .bind(metric_id)
        .execute(&mut *tx)
        .await?;

    for point in points {
        sqlx::query(
            r#"
            INSERT INTO timeseries_points (metric_id, timestamp, value, label)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(metric_id)
        .bind(point.timestamp)
        .bind(point.value)
        .bind(&point.label)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(())
}

/// Get all points for a metric, oldest first
pub async fn find_points(
    pool: &PgPool,
    metric_id: Uuid,
) -> Result<Vec<TimeSeriesPoint>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PointRow>(
        r#"
        SELECT timestamp, value, label
        FROM timeseries_points
        WHERE metric_id = $1
        ORDER BY timestamp ASC
        "#,
    )
    .bind(metric_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Insert or replace a generated transformer
pub async fn save_transformer(
    pool: &PgPool,
    transformer: &Transformer,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO transformers (metric_id, kind, code, generated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (metric_id, kind)
        DO UPDATE SET code = $3, generated_at = $4
        "#,
    )
    .bind(transformer.metric_id)
    .bind(transformer.kind.as_str())
    .bind(&transformer.code)
    .bind(transformer.generated_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Delete a transformer; a no-op for brand-new metrics
pub async fn delete_transformer(
    pool: &PgPool,
    metric_id: Uuid,
    kind: TransformerKind,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM transformers WHERE metric_id = $1 AND kind = $2")
        .bind(metric_id)
        .bind(kind.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Find a transformer by metric and kind
pub async fn find_transformer(
    pool: &PgPool,
    metric_id: Uuid,
    kind: TransformerKind,
) -> Result<Option<Transformer>, sqlx::Error> {
    let row = sqlx::query_as::<_, TransformerRow>(
        r#"
        SELECT metric_id, kind, code, generated_at
        FROM transformers
        WHERE metric_id = $1 AND kind = $2
        "#,
    )
    .bind(metric_id)
    .bind(kind.as_str())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Insert or replace the chart configuration for a metric's chart record
pub async fn save_chart_config(
    pool: &PgPool,
    chart_id: Uuid,
    metric_id: Uuid,
    config: &serde_json::Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO chart_configs (chart_id, metric_id, config, updated_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (chart_id)
        DO UPDATE SET config = $3, updated_at = $4
        "#,
    )
    .bind(chart_id)
    .bind(metric_id)
    .bind(config)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct PointRow {
    timestamp: chrono::DateTime<chrono::Utc>,
    value: f64,
    label: Option<String>,
}

impl From<PointRow> for TimeSeriesPoint {
    fn from(row: PointRow) -> Self {
        TimeSeriesPoint {
            timestamp: row.timestamp,
            value: row.value,
            label: row.label,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransformerRow {
    metric_id: Uuid,
    kind: String,
    code: String,
    generated_at: chrono::DateTime<chrono::Utc>,
}

impl From<TransformerRow> for Transformer {
    fn from(row: TransformerRow) -> Self {
        Transformer {
            metric_id: row.metric_id,
            kind: match row.kind.as_str() {
                "chart" => TransformerKind::Chart,
                _ => TransformerKind::Ingestion,
            },
            code: row.code,
            generated_at: row.generated_at,
        }
    }
}
