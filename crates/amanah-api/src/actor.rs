//! The `X-Actor-Id` extractor.
//!
//! Authentication happens upstream; the proxy in front of this API sets the
//! header to the admin account id it authenticated.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// The id of the admin performing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorId(pub Uuid);

impl<S: Send + Sync> FromRequestParts<S> for ActorId {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .headers
      .get(ACTOR_HEADER)
      .and_then(|v| v.to_str().ok())
      .and_then(|s| Uuid::parse_str(s.trim()).ok())
      .map(ActorId)
      .ok_or(ApiError::Unauthenticated)
  }
}
