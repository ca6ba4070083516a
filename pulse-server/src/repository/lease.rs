//! Edit Lease Repository
//!
//! Handles all database operations related to edit leases.
//! One row per resource, enforced by the unique resource_id key.

use pulse_core::domain::lease::EditLease;
use sqlx::PgPool;
use uuid::Uuid;

/// Find the lease for a resource
pub async fn find_by_resource(
    pool: &PgPool,
    resource_id: Uuid,
) -> Result<Option<EditLease>, sqlx::Error> {
    let row = sqlx::query_as::<_, LeaseRow>(
        r#"
        SELECT resource_id, holder_id, holder_name, last_seen
        FROM edit_leases
        WHERE resource_id = $1
        "#,
    )
    .bind(resource_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Insert or replace the lease for a resource
pub async fn upsert(pool: &PgPool, lease: &EditLease) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO edit_leases (resource_id, holder_id, holder_name, last_seen)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (resource_id)
        DO UPDATE SET holder_id = $2, holder_name = $3, last_seen = $4
        "#,
    )
    .bind(lease.resource_id)
    .bind(lease.holder_id)
    .bind(&lease.holder_name)
    .bind(lease.last_seen)
    .execute(pool)
    .await?;

    Ok(())
}

/// Bump `last_seen` for a lease the caller holds
///
/// Returns false (and writes nothing) if the caller holds no lease on the
/// resource, so a stray heartbeat cannot create or extend anything.
pub async fn touch(
    pool: &PgPool,
    resource_id: Uuid,
    holder_id: Uuid,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE edit_leases
        SET last_seen = $1
        WHERE resource_id = $2 AND holder_id = $3
        "#,
    )
    .bind(now)
    .bind(resource_id)
    .bind(holder_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete the caller's lease row if present
pub async fn delete(
    pool: &PgPool,
    resource_id: Uuid,
    holder_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM edit_leases WHERE resource_id = $1 AND holder_id = $2")
        .bind(resource_id)
        .bind(holder_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct LeaseRow {
    resource_id: Uuid,
    holder_id: Uuid,
    holder_name: Option<String>,
    last_seen: chrono::DateTime<chrono::Utc>,
}

impl From<LeaseRow> for EditLease {
    fn from(row: LeaseRow) -> Self {
        EditLease {
            resource_id: row.resource_id,
            holder_id: row.holder_id,
            holder_name: row.holder_name,
            last_seen: row.last_seen,
        }
    }
}
