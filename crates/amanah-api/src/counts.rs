//! Handlers for `GET /counts/{kind}` and `GET /dashboard`.

use amanah_core::{
  Workflow,
  clock::Clock,
  counts::{DashboardSummary, StatusCounts},
  record::EntityKind,
  store::RecordStore,
};
use axum::{
  Json,
  extract::{Path, State},
};

use crate::{actor::ActorId, error::ApiError};

/// `GET /counts/{kind}`
pub async fn by_kind<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(kind): Path<EntityKind>,
) -> Result<Json<StatusCounts>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Ok(Json(wf.aggregate_counts(actor, kind).await?))
}

/// `GET /dashboard`
pub async fn dashboard<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
) -> Result<Json<DashboardSummary>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Ok(Json(wf.dashboard(actor).await?))
}
