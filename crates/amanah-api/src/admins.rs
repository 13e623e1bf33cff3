//! Handlers for `/admins` and `/authorize`.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/admins` | Read on users |
//! | `POST`   | `/admins` | Body: `{"username":..,"display_name":..,"role":..}` |
//! | `PATCH`  | `/admins/{id}` | Partial edit; optional `version` |
//! | `DELETE` | `/admins/{id}` | 204; never the caller's own account |
//! | `GET`    | `/authorize?module=..&capability=..` | `{"allowed":bool}` |

use amanah_core::{
  Workflow,
  clock::Clock,
  permission::{AdminAccount, AdminUpdate, Capability, Module, NewAdmin},
  store::RecordStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{actor::ActorId, error::ApiError};

/// `GET /admins`
pub async fn list<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
) -> Result<Json<Vec<AdminAccount>>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Ok(Json(wf.list_admins(actor).await?))
}

/// `POST /admins`
pub async fn create<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Json(body): Json<NewAdmin>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let account = wf.create_admin(actor, body).await?;
  Ok((StatusCode::CREATED, Json(account)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBody {
  #[serde(flatten)]
  pub update:  AdminUpdate,
  pub version: Option<i64>,
}

/// `PATCH /admins/{id}`
pub async fn update<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<AdminAccount>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Ok(Json(wf.update_admin(actor, id, body.update, body.version).await?))
}

/// `DELETE /admins/{id}`
pub async fn delete_one<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  wf.delete_admin(actor, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeParams {
  pub module:     Module,
  pub capability: Capability,
}

/// `GET /authorize?module=<module>&capability=<capability>`
pub async fn authorize<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Query(params): Query<AuthorizeParams>,
) -> Json<Value>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let allowed = wf.authorize(actor, params.module, params.capability).await;
  Json(json!({ "allowed": allowed }))
}
