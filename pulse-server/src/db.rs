use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create metrics table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS metrics (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL,
            integration VARCHAR(255) NOT NULL,
            current_step VARCHAR(64),
            last_error TEXT,
            last_fetched_at TIMESTAMPTZ,
            chart_id UUID NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create pipeline runs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_runs (
            id UUID PRIMARY KEY,
            metric_id UUID NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
            variant VARCHAR(50) NOT NULL,
            status VARCHAR(50) NOT NULL,
            current_step VARCHAR(64),
            started_at TIMESTAMPTZ NOT NULL,
            finished_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create step logs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS step_logs (
            id UUID PRIMARY KEY,
            metric_id UUID NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
            run_id UUID NOT NULL REFERENCES pipeline_runs(id) ON DELETE CASCADE,
            operation VARCHAR(64),
            step VARCHAR(64) NOT NULL,
            display_name VARCHAR(255) NOT NULL,
            status VARCHAR(50) NOT NULL,
            started_at TIMESTAMPTZ NOT NULL,
            finished_at TIMESTAMPTZ NOT NULL,
            duration_ms BIGINT NOT NULL,
            error TEXT,
            result JSONB
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create time series points table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS timeseries_points (
            id SERIAL PRIMARY KEY,
            metric_id UUID NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
            timestamp TIMESTAMPTZ NOT NULL,
            value DOUBLE PRECISION NOT NULL,
            label TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create transformers table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transformers (
            metric_id UUID NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
            kind VARCHAR(20) NOT NULL,
            code TEXT NOT NULL,
            generated_at TIMESTAMPTZ NOT NULL,
            PRIMARY KEY (metric_id, kind)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create chart configs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chart_configs (
            chart_id UUID PRIMARY KEY,
            metric_id UUID NOT NULL REFERENCES metrics(id) ON DELETE CASCADE,
            config JSONB NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create teams table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id UUID PRIMARY KEY,
            org_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create edit leases table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS edit_leases (
            resource_id UUID PRIMARY KEY,
            holder_id UUID NOT NULL,
            holder_name VARCHAR(255),
            last_seen TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_metrics_org_id ON metrics(org_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_runs_metric_status ON pipeline_runs(metric_id, status)",
    )
    .execute(pool)
    .await?;

    // At most one live run per metric; makes the trigger's live-run
    // refusal atomic instead of check-then-act.
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_pipeline_runs_one_live ON pipeline_runs(metric_id) WHERE status = 'Running'",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_step_logs_metric_id ON step_logs(metric_id, started_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_timeseries_points_metric_id ON timeseries_points(metric_id, timestamp)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
