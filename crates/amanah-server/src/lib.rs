//! HTTP server assembly for Amanah.
//!
//! Holds the runtime configuration and mounts the JSON API under `/api`
//! with request tracing. The binary in `main.rs` wires these to a SQLite
//! store.

use std::path::PathBuf;

use amanah_core::{Workflow, clock::Clock, matching::DEFAULT_MAX_PAGE_SIZE, store::RecordStore};
use axum::Router;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// under `AMANAH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:            String,
  #[serde(default = "default_port")]
  pub port:            u16,
  #[serde(default = "default_store_path")]
  pub store_path:      PathBuf,
  /// Upper bound on `limit` for paginated views.
  #[serde(default = "default_max_page_size")]
  pub max_page_size:   u32,
  /// Username of the super admin created when the store has no accounts.
  #[serde(default)]
  pub bootstrap_admin: Option<String>,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("amanah.db") }

fn default_max_page_size() -> u32 { DEFAULT_MAX_PAGE_SIZE }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the top-level [`Router`]: the API nested under `/api`, traced.
pub fn router<S, C>(workflow: Workflow<S, C>) -> Router
where
  S: RecordStore + 'static,
  C: Clock + Clone + 'static,
{
  Router::new()
    .nest("/api", amanah_api::api_router(workflow))
    .layer(TraceLayer::new_for_http())
}
