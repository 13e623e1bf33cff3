//! Error types for `amanah-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::record::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input or an illegal target status. Shown to the caller as is.
  #[error("validation error: {0}")]
  Validation(String),

  /// Missing capability, self-protection or escalation violation. The
  /// precise reason is logged, never returned.
  #[error("not permitted")]
  Unauthorized,

  #[error("{kind} {id} not found")]
  NotFound { kind: EntityKind, id: Uuid },

  /// Lookup by id alone, before the kind is known.
  #[error("record {0} not found")]
  RecordNotFound(Uuid),

  /// Another writer committed first. Re-read and retry at most once.
  #[error("{0} was modified concurrently")]
  Conflict(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  /// Box a backend error. A validation failure raised by the backend, such
  /// as a uniqueness constraint, is lifted back out of its chain.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(&err);
    while let Some(current) = source {
      if let Some(Self::Validation(message)) = current.downcast_ref::<Self>() {
        return Self::Validation(message.clone());
      }
      source = current.source();
    }
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
