//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::lease::LeaseError;
use crate::service::metric::MetricError;
use crate::store::StoreError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    StorageError(StoreError),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::StorageError(err) => {
                tracing::error!("Storage error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::StorageError(err)
    }
}

impl From<MetricError> for ApiError {
    fn from(err: MetricError) -> Self {
        match err {
            MetricError::NotFound(id) => ApiError::NotFound(format!("Metric {} not found", id)),
            MetricError::ValidationError(msg) => ApiError::BadRequest(msg),
            MetricError::StorageError(err) => ApiError::StorageError(err),
        }
    }
}

impl From<LeaseError> for ApiError {
    fn from(err: LeaseError) -> Self {
        match err {
            LeaseError::TeamNotFound(id) => ApiError::NotFound(format!("Team {} not found", id)),
            LeaseError::StorageError(err) => ApiError::StorageError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
