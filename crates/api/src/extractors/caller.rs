//! Caller identity extractor.
//!
//! Credentials are verified upstream; the authenticated user id reaches the
//! service in the `X-User-Id` header.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use shared::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated caller of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthenticated("Missing X-User-Id header".to_string()))?;

        let user_id = raw
            .trim()
            .parse::<UserId>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ApiError::Unauthenticated("Invalid X-User-Id header".to_string()))?;

        Ok(Caller { user_id })
    }
}
