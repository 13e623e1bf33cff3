//! The workflow orchestrator, the single entry point for callers.
//!
//! Every action runs the same sequence: resolve the actor, authorize
//! against the module of the record's kind, load the record, compute the
//! transition, commit it conditioned on the version that was read, and
//! regroup the kind's counts inside that same commit. The orchestrator keeps
//! no state of its own between calls.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  clock::{Clock, SystemClock},
  counts::{DashboardSummary, StatusCounts},
  lifecycle::{self, TransitionExtra, WorkflowAction},
  matching::{self, DEFAULT_MAX_PAGE_SIZE, MatchPage, MatchScope, PageRequest},
  permission::{Actor, AdminAccount, AdminUpdate, Capability, Module, NewAdmin, Role},
  record::{EntityKind, EntityRecord, NewRecord, Payload, Status},
  store::{CommitOutcome, RecordQuery, RecordStore},
};

/// What a successful transition hands back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
  pub record:         EntityRecord,
  pub updated_counts: StatusCounts,
}

/// Orchestrates workflow actions over a [`RecordStore`].
///
/// Cloning is cheap; the store is reference-counted.
#[derive(Debug)]
pub struct Workflow<S, C = SystemClock> {
  store:         Arc<S>,
  clock:         C,
  max_page_size: u32,
}

impl<S, C: Clone> Clone for Workflow<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:         Arc::clone(&self.store),
      clock:         self.clock.clone(),
      max_page_size: self.max_page_size,
    }
  }
}

impl<S: RecordStore> Workflow<S, SystemClock> {
  pub fn new(store: Arc<S>) -> Self { Self::with_clock(store, SystemClock) }
}

impl<S, C> Workflow<S, C>
where
  S: RecordStore,
  C: Clock,
{
  pub fn with_clock(store: Arc<S>, clock: C) -> Self {
    Self { store, clock, max_page_size: DEFAULT_MAX_PAGE_SIZE }
  }

  pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
    self.max_page_size = max_page_size.max(1);
    self
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Identity & authorization ──────────────────────────────────────────

  /// Resolve `actor_id` to an active admin. Unknown and deactivated accounts
  /// are both refused.
  async fn resolve(&self, actor_id: Uuid) -> Result<Actor> {
    let account = self.store.get_admin(actor_id).await.map_err(Error::store)?;
    account
      .as_ref()
      .and_then(Actor::from_account)
      .ok_or_else(|| deny(actor_id, "unknown or inactive account"))
  }

  async fn resolve_with(
    &self,
    actor_id: Uuid,
    module: Module,
    capability: Capability,
  ) -> Result<Actor> {
    let actor = self.resolve(actor_id).await?;
    require(&actor, module, capability)?;
    Ok(actor)
  }

  /// Whether `actor_id` holds `capability` on `module`. Never fails: an
  /// unknown actor or an unreachable store both answer `false`.
  pub async fn authorize(&self, actor_id: Uuid, module: Module, capability: Capability) -> bool {
    match self.resolve(actor_id).await {
      Ok(actor) => actor.can(module, capability),
      Err(err) => {
        debug!(%actor_id, %module, %capability, error = %err, "authorization check failed");
        false
      }
    }
  }

  // ── Records ───────────────────────────────────────────────────────────

  /// Submit a new registration. Records always enter the workflow pending.
  pub async fn register(&self, input: NewRecord) -> Result<EntityRecord> {
    let now = self.clock.now();
    let input = NewRecord::new(lifecycle::submission(input.payload));
    let record = self.store.insert_record(input, now).await.map_err(Error::store)?;
    info!(record = %record.id, kind = %record.kind(), "record registered");
    Ok(record)
  }

  pub async fn get_record(&self, actor_id: Uuid, id: Uuid) -> Result<EntityRecord> {
    let actor = self.resolve(actor_id).await?;
    let record = self.load_any(id).await?;
    require(&actor, record.kind().module(), Capability::Read)?;
    Ok(record)
  }

  pub async fn list_by_status(
    &self,
    actor_id: Uuid,
    kind: EntityKind,
    status: Option<Status>,
  ) -> Result<Vec<EntityRecord>> {
    self.resolve_with(actor_id, kind.module(), Capability::Read).await?;
    require_workflow_kind(kind)?;
    if let Some(status) = status {
      require_legal(kind, status)?;
    }

    let query = RecordQuery::kind(kind).with_status(status);
    let records = self.store.list_records(&query).await.map_err(Error::store)?;
    debug!(%kind, ?status, count = records.len(), "listed records");
    Ok(records)
  }

  /// Live per-status counts for `kind`, read from the store.
  pub async fn aggregate_counts(&self, actor_id: Uuid, kind: EntityKind) -> Result<StatusCounts> {
    self.resolve_with(actor_id, kind.module(), Capability::Read).await?;
    self.recount(kind).await
  }

  async fn recount(&self, kind: EntityKind) -> Result<StatusCounts> {
    if !kind.is_workflow_target() {
      return Ok(StatusCounts::empty(kind));
    }
    let groups = self.store.count_by_status(kind).await.map_err(Error::store)?;
    Ok(StatusCounts::from_grouped(kind, groups))
  }

  /// Counts for every workflow kind the actor may read.
  pub async fn dashboard(&self, actor_id: Uuid) -> Result<DashboardSummary> {
    let actor = self.resolve(actor_id).await?;
    let mut all = Vec::new();
    for kind in EntityKind::workflow_kinds() {
      if actor.can(kind.module(), Capability::Read) {
        all.push(self.recount(kind).await?);
      }
    }
    Ok(DashboardSummary::from_counts(all))
  }

  /// Move record `id` of `kind` to `target`.
  pub async fn transition(
    &self,
    actor_id: Uuid,
    kind: EntityKind,
    id: Uuid,
    target: Status,
    notes: &str,
    extra: &TransitionExtra,
  ) -> Result<TransitionOutcome> {
    let actor = self.resolve_with(actor_id, kind.module(), Capability::Write).await?;
    require_workflow_kind(kind)?;
    require_legal(kind, target)?;

    let current = self.load(kind, id).await?;
    let next = lifecycle::transition(&current, target, &actor, notes, extra, self.clock.now())?;

    let groups = match self
      .store
      .commit_record(&next, current.version)
      .await
      .map_err(Error::store)?
    {
      CommitOutcome::Committed(groups) => groups,
      CommitOutcome::Conflict => {
        warn!(record = %id, %kind, %actor_id, "transition lost a concurrent write");
        return Err(Error::Conflict(id));
      }
      CommitOutcome::Missing => return Err(Error::NotFound { kind, id }),
    };

    info!(
      record = %id,
      %kind,
      from = %current.status,
      to = %next.status,
      %actor_id,
      "transition committed"
    );
    Ok(TransitionOutcome {
      record:         next,
      updated_counts: StatusCounts::from_grouped(kind, groups),
    })
  }

  /// Resolve a named action for `kind` and apply it as a transition.
  pub async fn apply_action(
    &self,
    actor_id: Uuid,
    kind: EntityKind,
    id: Uuid,
    action: WorkflowAction,
    notes: &str,
    extra: &TransitionExtra,
  ) -> Result<TransitionOutcome> {
    let target = action.target(kind)?;
    self.transition(actor_id, kind, id, target, notes, extra).await
  }

  /// Replace a record's payload. `expected_version`, when given, must match
  /// the stored version.
  pub async fn edit_record(
    &self,
    actor_id: Uuid,
    id: Uuid,
    payload: Payload,
    expected_version: Option<i64>,
  ) -> Result<EntityRecord> {
    let actor = self.resolve(actor_id).await?;
    let current = self.load_any(id).await?;
    let kind = current.kind();
    require(&actor, kind.module(), Capability::Write)?;

    if expected_version.is_some_and(|v| v != current.version) {
      return Err(Error::Conflict(id));
    }
    let next = lifecycle::edit(&current, payload, self.clock.now())?;

    match self
      .store
      .commit_record(&next, current.version)
      .await
      .map_err(Error::store)?
    {
      CommitOutcome::Committed(_) => {
        info!(record = %id, %kind, %actor_id, "record edited");
        Ok(next)
      }
      CommitOutcome::Conflict => Err(Error::Conflict(id)),
      CommitOutcome::Missing => Err(Error::NotFound { kind, id }),
    }
  }

  /// Delete a record and return the recounted statuses of its kind.
  pub async fn delete_record(
    &self,
    actor_id: Uuid,
    kind: EntityKind,
    id: Uuid,
  ) -> Result<StatusCounts> {
    self.resolve_with(actor_id, kind.module(), Capability::Delete).await?;
    let current = self.load(kind, id).await?;

    match self
      .store
      .delete_record(id, current.version)
      .await
      .map_err(Error::store)?
    {
      CommitOutcome::Committed(groups) => {
        info!(record = %id, %kind, %actor_id, "record deleted");
        Ok(StatusCounts::from_grouped(kind, groups))
      }
      CommitOutcome::Conflict => Err(Error::Conflict(id)),
      CommitOutcome::Missing => Err(Error::NotFound { kind, id }),
    }
  }

  async fn load_any(&self, id: Uuid) -> Result<EntityRecord> {
    self
      .store
      .get_record(id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::RecordNotFound(id))
  }

  /// Load a record and check it is of the kind the caller named.
  async fn load(&self, kind: EntityKind, id: Uuid) -> Result<EntityRecord> {
    match self.store.get_record(id).await.map_err(Error::store)? {
      Some(record) if record.kind() == kind => Ok(record),
      _ => Err(Error::NotFound { kind, id }),
    }
  }

  // ── Volunteer matching ────────────────────────────────────────────────

  /// Applications and offers visible in `scope`, newest first, one page.
  pub async fn match_volunteers(
    &self,
    actor_id: Uuid,
    scope: MatchScope,
    status: Option<Status>,
    page: PageRequest,
  ) -> Result<MatchPage> {
    self.resolve_with(actor_id, Module::Volunteers, Capability::Read).await?;
    let page = page.validate(self.max_page_size)?;

    let query = RecordQuery {
      kinds: vec![EntityKind::VolunteerApplication, EntityKind::VolunteerOffer],
      status,
    };
    let candidates = self.store.list_records(&query).await.map_err(Error::store)?;
    Ok(matching::compose(scope, status, candidates, page))
  }

  // ── Admin accounts ────────────────────────────────────────────────────

  pub async fn list_admins(&self, actor_id: Uuid) -> Result<Vec<AdminAccount>> {
    self.resolve_with(actor_id, Module::Users, Capability::Read).await?;
    self.store.list_admins().await.map_err(Error::store)
  }

  pub async fn create_admin(&self, actor_id: Uuid, input: NewAdmin) -> Result<AdminAccount> {
    let actor = self.resolve_with(actor_id, Module::Users, Capability::Write).await?;
    if !actor.may_assign(input.role, None) {
      return Err(deny(actor_id, "cannot create an account in the top tier"));
    }
    if !actor.may_grant(&input.resolved_permissions()) {
      return Err(deny(actor_id, "cannot grant permissions it does not hold"));
    }

    let input = normalize(input)?;
    if self.store.find_admin(&input.username).await.map_err(Error::store)?.is_some() {
      return Err(Error::validation(format!("username {:?} is taken", input.username)));
    }

    let account = self
      .store
      .insert_admin(input, self.clock.now())
      .await
      .map_err(Error::store)?;
    info!(admin = %account.admin_id, role = %account.role, %actor_id, "admin account created");
    Ok(account)
  }

  pub async fn update_admin(
    &self,
    actor_id: Uuid,
    admin_id: Uuid,
    update: AdminUpdate,
    expected_version: Option<i64>,
  ) -> Result<AdminAccount> {
    let actor = self.resolve_with(actor_id, Module::Users, Capability::Write).await?;
    let current = self.load_admin(admin_id).await?;
    if expected_version.is_some_and(|v| v != current.version) {
      return Err(Error::Conflict(admin_id));
    }

    let role = update.role.unwrap_or(current.role);
    if !actor.may_assign(role, Some(current.role)) {
      return Err(deny(actor_id, "cannot edit an account into or out of the top tier"));
    }
    if admin_id == actor_id && update.is_active == Some(false) {
      return Err(deny(actor_id, "cannot deactivate own account"));
    }
    if let Some(grid) = &update.permissions {
      if admin_id == actor_id {
        return Err(deny(actor_id, "cannot edit own permissions"));
      }
      if !actor.may_grant(grid) {
        return Err(deny(actor_id, "cannot grant permissions it does not hold"));
      }
    }
    if let Some(name) = &update.display_name
      && name.trim().is_empty()
    {
      return Err(Error::validation("display name must not be empty"));
    }

    let mut next = current.clone();
    update.apply_to(&mut next);
    next.updated_at = self.clock.now();
    next.version = current.version + 1;

    if holds_top(&current) && !holds_top(&next) && !self.other_top_remains(admin_id).await? {
      return Err(deny(actor_id, "would leave no active super admin"));
    }

    match self
      .store
      .commit_admin(&next, current.version)
      .await
      .map_err(Error::store)?
    {
      CommitOutcome::Committed(()) => {
        info!(admin = %admin_id, role = %next.role, %actor_id, "admin account updated");
        Ok(next)
      }
      CommitOutcome::Conflict => Err(Error::Conflict(admin_id)),
      CommitOutcome::Missing => Err(Error::NotFound { kind: EntityKind::AdminAccount, id: admin_id }),
    }
  }

  pub async fn delete_admin(&self, actor_id: Uuid, admin_id: Uuid) -> Result<()> {
    let actor = self.resolve_with(actor_id, Module::Users, Capability::Delete).await?;
    if admin_id == actor_id {
      return Err(deny(actor_id, "cannot delete own account"));
    }

    let current = self.load_admin(admin_id).await?;
    if current.role.is_top() && !actor.role.is_top() {
      return Err(deny(actor_id, "cannot delete a top-tier account"));
    }
    if holds_top(&current) && !self.other_top_remains(admin_id).await? {
      return Err(deny(actor_id, "would leave no active super admin"));
    }

    match self
      .store
      .delete_admin(admin_id, current.version)
      .await
      .map_err(Error::store)?
    {
      CommitOutcome::Committed(()) => {
        info!(admin = %admin_id, %actor_id, "admin account deleted");
        Ok(())
      }
      CommitOutcome::Conflict => Err(Error::Conflict(admin_id)),
      CommitOutcome::Missing => Err(Error::NotFound { kind: EntityKind::AdminAccount, id: admin_id }),
    }
  }

  /// Create the first super admin when no accounts exist yet. Returns `None`
  /// if the store already has accounts.
  pub async fn bootstrap_super_admin(&self, username: &str) -> Result<Option<AdminAccount>> {
    if !self.store.list_admins().await.map_err(Error::store)?.is_empty() {
      return Ok(None);
    }
    let input = normalize(NewAdmin::new(username, Role::SuperAdmin))?;
    let account = self
      .store
      .insert_admin(input, self.clock.now())
      .await
      .map_err(Error::store)?;
    info!(admin = %account.admin_id, username = %account.username, "bootstrap super admin created");
    Ok(Some(account))
  }

  /// Whether an active top-tier account other than `admin_id` exists.
  async fn other_top_remains(&self, admin_id: Uuid) -> Result<bool> {
    let admins = self.store.list_admins().await.map_err(Error::store)?;
    Ok(admins.iter().any(|a| a.admin_id != admin_id && holds_top(a)))
  }

  async fn load_admin(&self, admin_id: Uuid) -> Result<AdminAccount> {
    self
      .store
      .get_admin(admin_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound { kind: EntityKind::AdminAccount, id: admin_id })
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Log the precise reason and return the opaque error.
fn deny(actor_id: Uuid, reason: &str) -> Error {
  warn!(%actor_id, reason, "request denied");
  Error::Unauthorized
}

fn require(actor: &Actor, module: Module, capability: Capability) -> Result<()> {
  if actor.can(module, capability) {
    Ok(())
  } else {
    Err(deny(actor.actor_id, &format!("lacks {capability} on {module}")))
  }
}

fn holds_top(account: &AdminAccount) -> bool { account.is_active && account.role.is_top() }

fn require_workflow_kind(kind: EntityKind) -> Result<()> {
  if kind.is_workflow_target() {
    Ok(())
  } else {
    Err(Error::validation(format!("{kind} is not a workflow target")))
  }
}

fn require_legal(kind: EntityKind, status: Status) -> Result<()> {
  if kind.allows(status) {
    Ok(())
  } else {
    Err(Error::validation(format!("{status} is not a legal status for {kind}")))
  }
}

fn normalize(mut input: NewAdmin) -> Result<NewAdmin> {
  input.username = input.username.trim().to_owned();
  if input.username.is_empty() {
    return Err(Error::validation("username must not be empty"));
  }
  if input.display_name.trim().is_empty() {
    input.display_name = input.username.clone();
  }
  Ok(input)
}
