//! Handlers for `/records` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/records?kind=<kind>[&status=<status>]` | Newest first |
//! | `POST`   | `/records` | Public submission; body is a tagged payload |
//! | `GET`    | `/records/{id}` | 404 if not found |
//! | `PUT`    | `/records/{id}` | Body: `{"payload":{..},"version":3}` |
//! | `DELETE` | `/records/{id}?kind=<kind>` | Returns the recounted statuses |
//! | `POST`   | `/records/{id}/transition` | Body: `{"kind":..,"status":..,"notes":..}` |
//! | `POST`   | `/records/{id}/actions/{action}` | Body: `{"kind":..,"notes":..}` |

use amanah_core::{
  TransitionOutcome, Workflow,
  clock::Clock,
  counts::StatusCounts,
  lifecycle::{TransitionExtra, WorkflowAction},
  record::{EntityKind, EntityRecord, NewRecord, Payload, Status},
  store::RecordStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::ActorId, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub kind:   EntityKind,
  pub status: Option<Status>,
}

/// `GET /records?kind=<kind>[&status=<status>]`
pub async fn list<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<EntityRecord>>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let records = wf.list_by_status(actor, params.kind, params.status).await?;
  Ok(Json(records))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /records`, body: `{"kind":"mosque","data":{..}}`
pub async fn create<S, C>(
  State(wf): State<Workflow<S, C>>,
  Json(payload): Json<Payload>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let record = wf.register(NewRecord::new(payload)).await?;
  Ok((StatusCode::CREATED, Json(record)))
}

// ─── Get / edit / delete ─────────────────────────────────────────────────────

/// `GET /records/{id}`
pub async fn get_one<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(id): Path<Uuid>,
) -> Result<Json<EntityRecord>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Ok(Json(wf.get_record(actor, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  pub payload: Payload,
  /// The version the client last read; omitted means "whatever is stored".
  pub version: Option<i64>,
}

/// `PUT /records/{id}`
pub async fn update<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<EntityRecord>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let record = wf.edit_record(actor, id, body.payload, body.version).await?;
  Ok(Json(record))
}

#[derive(Debug, Deserialize)]
pub struct KindParam {
  pub kind: EntityKind,
}

/// `DELETE /records/{id}?kind=<kind>`
pub async fn delete_one<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(id): Path<Uuid>,
  Query(params): Query<KindParam>,
) -> Result<Json<StatusCounts>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Ok(Json(wf.delete_record(actor, params.kind, id).await?))
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub kind:   EntityKind,
  pub status: Status,
  #[serde(default)]
  pub notes:  String,
  #[serde(flatten)]
  pub extra:  TransitionExtra,
}

/// `POST /records/{id}/transition`
pub async fn transition<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(id): Path<Uuid>,
  Json(body): Json<TransitionBody>,
) -> Result<Json<TransitionOutcome>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let outcome = wf
    .transition(actor, body.kind, id, body.status, &body.notes, &body.extra)
    .await?;
  Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ActionBody {
  pub kind:  EntityKind,
  #[serde(default)]
  pub notes: String,
  #[serde(flatten)]
  pub extra: TransitionExtra,
}

/// `POST /records/{id}/actions/{action}`, e.g. `.../actions/approve`
pub async fn action<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path((id, action)): Path<(Uuid, WorkflowAction)>,
  Json(body): Json<ActionBody>,
) -> Result<Json<TransitionOutcome>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let outcome = wf
    .apply_action(actor, body.kind, id, action, &body.notes, &body.extra)
    .await?;
  Ok(Json(outcome))
}
