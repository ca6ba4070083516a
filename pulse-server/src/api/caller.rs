//! Caller context extractor
//!
//! Authentication proper is handled upstream; by the time a request
//! reaches these handlers the gateway has attached the authenticated
//! organization and user as headers. This extractor reads them and
//! rejects requests that arrive without the context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::api::error::ApiError;

/// The authenticated caller: organization scope plus user identity
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub org_id: Uuid,
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let org_id = header_uuid(parts, "x-org-id")?;
        let user_id = header_uuid(parts, "x-user-id")?;

        Ok(Caller { org_id, user_id })
    }
}

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, ApiError> {
    let value = parts
        .headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {} header", name)))?
        .to_str()
        .map_err(|_| ApiError::BadRequest(format!("Invalid {} header", name)))?;

    Uuid::parse_str(value).map_err(|_| ApiError::BadRequest(format!("Invalid {} header", name)))
}
