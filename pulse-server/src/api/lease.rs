//! Edit lease endpoints
//!
//! Advisory exclusive-edit lease over a team's shared dashboard. Every
//! lease call verifies the caller's organization owns the team first.

use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use pulse_core::domain::team::Team;
use pulse_core::dto::lease::{AcquireRequest, LeaseAcquire, LeaseCheck};

use crate::api::AppState;
use crate::api::caller::Caller;
use crate::api::error::{ApiError, ApiResult};
use crate::service::lease_service::{LeaseManager, verify_team};

#[derive(Debug, serde::Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

/// POST /team/create
pub async fn create_team(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateTeamRequest>,
) -> ApiResult<Json<Team>> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Team name cannot be empty".to_string()));
    }

    let team = Team {
        id: Uuid::new_v4(),
        org_id: caller.org_id,
        name: req.name.trim().to_string(),
    };
    state.store.create_team(team.clone()).await?;

    tracing::info!("Created team {} ({})", team.id, team.name);

    Ok(Json(team))
}

/// POST /team/{id}/lease/check
pub async fn check(
    State(state): State<AppState>,
    caller: Caller,
    Path(team_id): Path<Uuid>,
) -> ApiResult<Json<LeaseCheck>> {
    verify_team(&state.store, caller.org_id, team_id).await?;

    let manager = LeaseManager::new(state.store.clone(), state.lease_timeout);
    let check = manager.check(team_id, caller.user_id).await?;

    Ok(Json(check))
}

/// POST /team/{id}/lease/acquire
pub async fn acquire(
    State(state): State<AppState>,
    caller: Caller,
    Path(team_id): Path<Uuid>,
    Json(req): Json<AcquireRequest>,
) -> ApiResult<Json<LeaseAcquire>> {
    verify_team(&state.store, caller.org_id, team_id).await?;

    let manager = LeaseManager::new(state.store.clone(), state.lease_timeout);
    let acquired = manager
        .acquire(team_id, caller.user_id, req.user_name)
        .await?;

    Ok(Json(acquired))
}

/// POST /team/{id}/lease/heartbeat
pub async fn heartbeat(
    State(state): State<AppState>,
    caller: Caller,
    Path(team_id): Path<Uuid>,
) -> ApiResult<()> {
    verify_team(&state.store, caller.org_id, team_id).await?;

    let manager = LeaseManager::new(state.store.clone(), state.lease_timeout);
    manager.heartbeat(team_id, caller.user_id).await?;

    Ok(())
}

/// POST /team/{id}/lease/release
pub async fn release(
    State(state): State<AppState>,
    caller: Caller,
    Path(team_id): Path<Uuid>,
) -> ApiResult<()> {
    verify_team(&state.store, caller.org_id, team_id).await?;

    let manager = LeaseManager::new(state.store.clone(), state.lease_timeout);
    manager.release(team_id, caller.user_id).await?;

    Ok(())
}
