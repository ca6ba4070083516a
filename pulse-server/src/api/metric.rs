//! Metric endpoints
//!
//! Creation, pipeline triggers, and the polling surface the dashboard
//! uses while a pipeline run is in flight.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use pulse_core::domain::metric::Metric;
use pulse_core::domain::step_log::{StepLogEntry, StepStatus};
use pulse_core::dto::metric::{
    BatchStatusRequest, CreateMetric, MetricProgress, MetricStatus, TriggerAck,
};
use pulse_core::pipeline::{PipelineVariant, detect_variant};

use crate::api::caller::Caller;
use crate::api::error::ApiResult;
use crate::api::AppState;
use crate::service::metric_service;

/// POST /metric/create
///
/// Creates the metric and immediately fires the full create pipeline for
/// it, so a brand-new metric starts fetching without a second call.
pub async fn create_metric(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CreateMetric>,
) -> ApiResult<Json<Metric>> {
    let metric = metric_service::create_metric(&state.store, caller.org_id, req).await?;

    tracing::info!("Created metric {} ({})", metric.id, metric.name);

    metric_service::start_pipeline(
        &state.store,
        &state.executor,
        caller.org_id,
        metric.id,
        PipelineVariant::Create,
    )
    .await?;

    Ok(Json(metric))
}

/// GET /metric/{id}
pub async fn get_metric(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Metric>> {
    let metric = metric_service::get_metric(&state.store, caller.org_id, id).await?;
    Ok(Json(metric))
}

/// POST /metric/{id}/refresh
///
/// Re-runs the pipeline with the transformers already on file.
pub async fn refresh(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TriggerAck>> {
    trigger(state, caller, id, PipelineVariant::SoftRefresh).await
}

/// POST /metric/{id}/regenerate
///
/// Full rebuild: drops stored data and transformers, then regenerates
/// everything from a fresh fetch.
pub async fn regenerate(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TriggerAck>> {
    trigger(state, caller, id, PipelineVariant::HardRefresh).await
}

async fn trigger(
    state: AppState,
    caller: Caller,
    id: Uuid,
    variant: PipelineVariant,
) -> ApiResult<Json<TriggerAck>> {
    let ack = metric_service::start_pipeline(
        &state.store,
        &state.executor,
        caller.org_id,
        id,
        variant,
    )
    .await?;

    if ack.started {
        tracing::info!("Started {} pipeline for metric {}", variant.as_str(), id);
    }

    Ok(Json(ack))
}

/// GET /metric/{id}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MetricProgress>> {
    let progress = metric_service::get_progress(&state.store, caller.org_id, id).await?;
    Ok(Json(progress))
}

/// GET /metric/{id}/status
pub async fn get_status(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MetricStatus>> {
    let status = metric_service::get_status(&state.store, caller.org_id, id).await?;
    Ok(Json(status))
}

/// POST /metric/status/batch
pub async fn batch_status(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<BatchStatusRequest>,
) -> ApiResult<Json<HashMap<Uuid, MetricStatus>>> {
    let statuses =
        metric_service::get_batch_status(&state.store, caller.org_id, &req.metric_ids).await?;
    Ok(Json(statuses))
}

/// Step history plus the run shape inferred from it
#[derive(Debug, Serialize)]
pub struct StepHistory {
    pub detected_variant: PipelineVariant,
    pub steps: Vec<StepLogEntry>,
}

/// GET /metric/{id}/steps
pub async fn get_steps(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StepHistory>> {
    let steps = metric_service::get_step_logs(&state.store, caller.org_id, id).await?;

    let completed: Vec<_> = steps
        .iter()
        .filter(|entry| entry.status == StepStatus::Completed)
        .map(|entry| entry.step)
        .collect();
    let detected_variant = detect_variant(&completed);

    Ok(Json(StepHistory {
        detected_variant,
        steps,
    }))
}
