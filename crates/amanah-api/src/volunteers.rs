//! Handlers for the volunteer match views.
//!
//! `page` and `limit` default to 1 and 20 when omitted.

use amanah_core::{
  Workflow,
  clock::Clock,
  matching::{MatchPage, MatchScope, PageRequest},
  record::Status,
  store::RecordStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct MatchParams {
  /// Omitted means the all-mosques view: general offers only.
  pub mosque_id: Option<Uuid>,
  pub status:    Option<Status>,
  pub page:      Option<u32>,
  pub limit:     Option<u32>,
}

impl MatchParams {
  fn page_request(&self) -> PageRequest {
    let default = PageRequest::default();
    PageRequest::new(
      self.page.unwrap_or(default.page),
      self.limit.unwrap_or(default.limit),
    )
  }
}

/// `GET /volunteers/matches[?mosque_id=..][&status=..][&page=..][&limit=..]`
pub async fn matches<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Query(params): Query<MatchParams>,
) -> Result<Json<MatchPage>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let scope = params.mosque_id.map_or(MatchScope::AllMosques, MatchScope::Mosque);
  let page = wf
    .match_volunteers(actor, scope, params.status, params.page_request())
    .await?;
  Ok(Json(page))
}

/// `GET /volunteers/users/{user_id}[?status=..][&page=..][&limit=..]`
///
/// `mosque_id` is ignored here.
pub async fn for_user<S, C>(
  State(wf): State<Workflow<S, C>>,
  ActorId(actor): ActorId,
  Path(user_id): Path<Uuid>,
  Query(params): Query<MatchParams>,
) -> Result<Json<MatchPage>, ApiError>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  let page = wf
    .match_volunteers(actor, MatchScope::Volunteer(user_id), params.status, params.page_request())
    .await?;
  Ok(Json(page))
}
