//! Team Repository
//!
//! Minimal team access for lease ownership checks.

use pulse_core::domain::team::Team;
use sqlx::PgPool;
use uuid::Uuid;

/// Insert a new team
pub async fn create(pool: &PgPool, team: &Team) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO teams (id, org_id, name)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(team.id)
    .bind(team.org_id)
    .bind(&team.name)
    .execute(pool)
    .await?;

    Ok(())
}

/// Find a team by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Team>, sqlx::Error> {
    let row = sqlx::query_as::<_, TeamRow>(
        r#"
        SELECT id, org_id, name
        FROM teams
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: Uuid,
    org_id: Uuid,
    name: String,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            org_id: row.org_id,
            name: row.name,
        }
    }
}
