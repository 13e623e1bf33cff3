//! The `RecordStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `amanah-store-sqlite`).
//! The workflow orchestrator and the HTTP layer depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  permission::{AdminAccount, NewAdmin},
  record::{EntityKind, EntityRecord, NewRecord, Status},
};

// ─── Query and result types ──────────────────────────────────────────────────

/// Parameters for [`RecordStore::list_records`].
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub kinds:  Vec<EntityKind>,
  pub status: Option<Status>,
}

impl RecordQuery {
  pub fn kind(kind: EntityKind) -> Self { Self { kinds: vec![kind], status: None } }

  pub fn with_status(mut self, status: Option<Status>) -> Self {
    self.status = status;
    self
  }
}

/// Raw `(status, count)` groups for one kind, read in the same transaction as
/// the write they follow.
pub type GroupedCounts = Vec<(Status, u64)>;

/// Outcome of a version-conditioned write.
#[derive(Debug, Clone)]
pub enum CommitOutcome<T> {
  Committed(T),
  /// The stored version no longer matched; nothing was written.
  Conflict,
  /// No row with that id exists.
  Missing,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a record store backend.
///
/// Every mutating method on an existing row is conditioned on the version the
/// caller read, so two writers racing on the same record can never merge
/// their fields: exactly one commits and the other observes
/// [`CommitOutcome::Conflict`].
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Records ───────────────────────────────────────────────────────────

  /// Persist a new record in the initial status, stamped `now`, version 0.
  fn insert_record(
    &self,
    input: NewRecord,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<EntityRecord, Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get_record(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<EntityRecord>, Self::Error>> + Send + '_;

  /// Records matching `query`, most recently created first.
  fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<EntityRecord>, Self::Error>> + Send + 'a;

  /// Live `(status, count)` groups for `kind`.
  fn count_by_status(
    &self,
    kind: EntityKind,
  ) -> impl Future<Output = Result<GroupedCounts, Self::Error>> + Send + '_;

  /// Overwrite a record with `next` if its stored version is still
  /// `expected_version`, then regroup the counts of its kind. Both happen in
  /// one transaction.
  fn commit_record<'a>(
    &'a self,
    next: &'a EntityRecord,
    expected_version: i64,
  ) -> impl Future<Output = Result<CommitOutcome<GroupedCounts>, Self::Error>> + Send + 'a;

  /// Delete a record if its stored version is still `expected_version`, then
  /// regroup the counts of its kind in the same transaction.
  fn delete_record(
    &self,
    id: Uuid,
    expected_version: i64,
  ) -> impl Future<Output = Result<CommitOutcome<GroupedCounts>, Self::Error>> + Send + '_;

  // ── Admin accounts ────────────────────────────────────────────────────

  /// Persist a new, active admin account.
  fn insert_admin(
    &self,
    input: NewAdmin,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<AdminAccount, Self::Error>> + Send + '_;

  fn get_admin(
    &self,
    admin_id: Uuid,
  ) -> impl Future<Output = Result<Option<AdminAccount>, Self::Error>> + Send + '_;

  /// Look up an account by its unique username.
  fn find_admin<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<AdminAccount>, Self::Error>> + Send + 'a;

  fn list_admins(
    &self,
  ) -> impl Future<Output = Result<Vec<AdminAccount>, Self::Error>> + Send + '_;

  /// Overwrite an account with `next` if its stored version is still
  /// `expected_version`.
  fn commit_admin<'a>(
    &'a self,
    next: &'a AdminAccount,
    expected_version: i64,
  ) -> impl Future<Output = Result<CommitOutcome<()>, Self::Error>> + Send + 'a;

  /// Delete an account if its stored version is still `expected_version`.
  fn delete_admin(
    &self,
    admin_id: Uuid,
    expected_version: i64,
  ) -> impl Future<Output = Result<CommitOutcome<()>, Self::Error>> + Send + '_;
}
