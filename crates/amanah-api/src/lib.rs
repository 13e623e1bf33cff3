//! JSON REST API for Amanah.
//!
//! Exposes an axum [`Router`] over a [`Workflow`] backed by any
//! [`amanah_core::store::RecordStore`]. Authentication and TLS belong to the
//! proxy in front; it identifies the caller through the `X-Actor-Id` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", amanah_api::api_router(workflow.clone()))
//! ```

pub mod actor;
pub mod admins;
pub mod counts;
pub mod error;
pub mod records;
pub mod volunteers;

use amanah_core::{Workflow, clock::Clock, store::RecordStore};
use axum::{
  Router,
  routing::{get, post, put},
};

pub use actor::{ACTOR_HEADER, ActorId};
pub use error::ApiError;

/// Build a fully-materialised API router for `workflow`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(workflow: Workflow<S, C>) -> Router<()>
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Router::new()
    // Records
    .route("/records", get(records::list::<S, C>).post(records::create::<S, C>))
    .route(
      "/records/{id}",
      get(records::get_one::<S, C>)
        .put(records::update::<S, C>)
        .delete(records::delete_one::<S, C>),
    )
    .route("/records/{id}/transition", post(records::transition::<S, C>))
    .route("/records/{id}/actions/{action}", post(records::action::<S, C>))
    // Counts
    .route("/counts/{kind}", get(counts::by_kind::<S, C>))
    .route("/dashboard", get(counts::dashboard::<S, C>))
    // Volunteers
    .route("/volunteers/matches", get(volunteers::matches::<S, C>))
    .route("/volunteers/users/{user_id}", get(volunteers::for_user::<S, C>))
    // Admin accounts
    .route("/admins", get(admins::list::<S, C>).post(admins::create::<S, C>))
    .route(
      "/admins/{id}",
      put(admins::update::<S, C>)
        .patch(admins::update::<S, C>)
        .delete(admins::delete_one::<S, C>),
    )
    .route("/authorize", get(admins::authorize::<S, C>))
    .with_state(workflow)
}
