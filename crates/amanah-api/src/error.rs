//! API error type and [`axum::response::IntoResponse`] implementation.

use amanah_core::Error as CoreError;
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// No usable `X-Actor-Id` header on a route that needs one.
  #[error("missing or malformed actor id")]
  Unauthenticated,

  #[error("not permitted")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<CoreError> for ApiError {
  fn from(err: CoreError) -> Self {
    match err {
      CoreError::Validation(m) => ApiError::BadRequest(m),
      CoreError::Unauthorized => ApiError::Forbidden,
      e @ (CoreError::NotFound { .. } | CoreError::RecordNotFound(_)) => {
        ApiError::NotFound(e.to_string())
      }
      e @ CoreError::Conflict(_) => ApiError::Conflict(e.to_string()),
      CoreError::Serialization(e) => ApiError::Store(Box::new(e)),
      CoreError::Store(e) => ApiError::Store(e),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
      ApiError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        error!(error = %e, "store failure");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
