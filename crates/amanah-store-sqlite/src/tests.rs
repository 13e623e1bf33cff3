//! Integration tests for `SqliteStore` and the workflow orchestrator against
//! an in-memory database.

use std::sync::Arc;

use amanah_core::{
  Error, Workflow,
  clock::FixedClock,
  lifecycle::{TransitionExtra, WorkflowAction},
  matching::{MatchScope, MatchSource, PageRequest},
  permission::{AdminAccount, AdminUpdate, Capability, Module, NewAdmin, PermissionGrid, Role},
  record::{
    BusinessDetails, ContactInfo, EntityKind, HalalCertification, MosqueDetails, NewRecord,
    Payload, Status, VolunteerApplication, VolunteerOffer,
  },
  store::{CommitOutcome, RecordQuery, RecordStore},
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn t0() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap() }

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn contact() -> ContactInfo {
  ContactInfo { email: "office@example.org".into(), phone: None }
}

fn mosque(name: &str) -> NewRecord {
  NewRecord::new(Payload::Mosque(MosqueDetails {
    name:          name.into(),
    address:       "1 High Street".into(),
    city:          "Leeds".into(),
    contact:       contact(),
    imam_name:     None,
    capacity:      Some(400),
    registered_by: None,
  }))
}

fn business(name: &str) -> NewRecord {
  NewRecord::new(Payload::Business(BusinessDetails {
    name:     name.into(),
    category: "butcher".into(),
    address:  "2 Market Row".into(),
    contact:  contact(),
    owner_id: None,
  }))
}

fn halal(business_id: Uuid) -> NewRecord {
  NewRecord::new(Payload::HalalCertification(HalalCertification {
    business_id,
    business_name:      "Crescent Meats".into(),
    product_categories: vec!["poultry".into()],
    certificate_number: None,
    expiry_date:        None,
    issued_at:          None,
  }))
}

fn application(mosque_id: Uuid, volunteer_id: Uuid) -> NewRecord {
  NewRecord::new(Payload::VolunteerApplication(VolunteerApplication {
    mosque_id,
    volunteer_id,
    name:         "Aisha".into(),
    email:        "aisha@example.org".into(),
    skills:       vec!["teaching".into()],
    availability: Some("weekends".into()),
    message:      None,
  }))
}

fn offer(volunteer_id: Uuid, general: bool) -> NewRecord {
  NewRecord::new(Payload::VolunteerOffer(VolunteerOffer {
    volunteer_id,
    name:             "Yusuf".into(),
    email:            "yusuf@example.org".into(),
    skills:           vec![],
    availability:     None,
    is_general_offer: general,
    preferred_mosque: None,
  }))
}

fn no_extra() -> TransitionExtra { TransitionExtra::default() }

struct Harness {
  wf:    Workflow<SqliteStore, FixedClock>,
  clock: FixedClock,
  root:  AdminAccount,
}

async fn harness() -> Harness {
  let clock = FixedClock::new(t0());
  let wf = Workflow::with_clock(Arc::new(store().await), clock.clone());
  let root = wf
    .bootstrap_super_admin("root")
    .await
    .unwrap()
    .expect("first bootstrap creates an account");
  Harness { wf, clock, root }
}

impl Harness {
  async fn admin(&self, username: &str, role: Role, grid: PermissionGrid) -> AdminAccount {
    let input = NewAdmin { permissions: Some(grid), ..NewAdmin::new(username, role) };
    self.wf.create_admin(self.root.admin_id, input).await.unwrap()
  }

  async fn register_at(&self, input: NewRecord, offset_secs: i64) -> Uuid {
    self.clock.set(t0() + Duration::seconds(offset_secs));
    self.wf.register(input).await.unwrap().id
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_record() {
  let s = store().await;
  let created = s.insert_record(mosque("Al-Noor"), t0()).await.unwrap();
  assert_eq!(created.status, Status::Pending);
  assert_eq!(created.version, 0);
  assert!(created.responder.is_none());

  let fetched = s.get_record(created.id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_record_missing_returns_none() {
  let s = store().await;
  assert!(s.get_record(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_records_filters_and_sorts_newest_first() {
  let s = store().await;
  let older = s.insert_record(mosque("Older"), t0()).await.unwrap();
  let newer = s
    .insert_record(mosque("Newer"), t0() + Duration::minutes(5))
    .await
    .unwrap();
  s.insert_record(business("Shop"), t0()).await.unwrap();

  let all = s.list_records(&RecordQuery::kind(EntityKind::Mosque)).await.unwrap();
  let ids: Vec<_> = all.iter().map(|r| r.id).collect();
  assert_eq!(ids, vec![newer.id, older.id]);

  let approved = s
    .list_records(&RecordQuery::kind(EntityKind::Mosque).with_status(Some(Status::Approved)))
    .await
    .unwrap();
  assert!(approved.is_empty());

  let none = s.list_records(&RecordQuery::default()).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn stale_commit_conflicts_and_writes_nothing() {
  let s = store().await;
  let base = s.insert_record(mosque("Al-Noor"), t0()).await.unwrap();

  let mut first = base.clone();
  first.status = Status::Approved;
  first.reviewer_notes = Some("looks good".into());
  first.version = 1;

  let mut second = base.clone();
  second.status = Status::Rejected;
  second.reviewer_notes = Some("missing documents".into());
  second.version = 1;

  match s.commit_record(&first, base.version).await.unwrap() {
    CommitOutcome::Committed(groups) => assert_eq!(groups, vec![(Status::Approved, 1)]),
    other => panic!("expected commit, got {other:?}"),
  }
  assert!(matches!(
    s.commit_record(&second, base.version).await.unwrap(),
    CommitOutcome::Conflict
  ));

  let stored = s.get_record(base.id).await.unwrap().unwrap();
  assert_eq!(stored.status, Status::Approved);
  assert_eq!(stored.reviewer_notes.as_deref(), Some("looks good"));
}

#[tokio::test]
async fn commit_unknown_record_is_missing() {
  let s = store().await;
  let mut ghost = s.insert_record(mosque("Ghost"), t0()).await.unwrap();
  ghost.id = Uuid::new_v4();
  assert!(matches!(s.commit_record(&ghost, 0).await.unwrap(), CommitOutcome::Missing));
}

#[tokio::test]
async fn delete_record_regroups_counts() {
  let s = store().await;
  let a = s.insert_record(mosque("A"), t0()).await.unwrap();
  s.insert_record(mosque("B"), t0()).await.unwrap();

  assert!(matches!(s.delete_record(a.id, 7).await.unwrap(), CommitOutcome::Conflict));
  match s.delete_record(a.id, 0).await.unwrap() {
    CommitOutcome::Committed(groups) => assert_eq!(groups, vec![(Status::Pending, 1)]),
    other => panic!("expected commit, got {other:?}"),
  }
  assert!(matches!(s.delete_record(a.id, 0).await.unwrap(), CommitOutcome::Missing));
}

// ─── Admin accounts ──────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_accounts_roundtrip() {
  let s = store().await;
  let created = s
    .insert_admin(NewAdmin::new("fatima", Role::Moderator), t0())
    .await
    .unwrap();
  assert!(created.is_active);
  assert_eq!(created.permissions, PermissionGrid::default());

  let found = s.find_admin("fatima").await.unwrap().unwrap();
  assert_eq!(found, created);
  assert!(s.find_admin("nobody").await.unwrap().is_none());

  let mut next = created.clone();
  next.display_name = "Fatima Z.".into();
  next.version = 1;
  assert!(matches!(s.commit_admin(&next, 0).await.unwrap(), CommitOutcome::Committed(())));
  assert!(matches!(s.commit_admin(&next, 0).await.unwrap(), CommitOutcome::Conflict));

  assert!(matches!(s.delete_admin(created.admin_id, 1).await.unwrap(), CommitOutcome::Committed(())));
  assert!(s.list_admins().await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_username_is_rejected_by_the_store() {
  let s = store().await;
  s.insert_admin(NewAdmin::new("omar", Role::Admin), t0()).await.unwrap();
  let err = s.insert_admin(NewAdmin::new("omar", Role::Admin), t0()).await.unwrap_err();
  assert!(matches!(err, crate::Error::Core(Error::Validation(ref m)) if m.contains("omar")));

  // The orchestrator surfaces the same constraint as a validation error.
  assert!(matches!(Error::store(err), Error::Validation(_)));
}

// ─── Workflow: transitions ───────────────────────────────────────────────────

#[tokio::test]
async fn approve_returns_counts_that_match_a_recount() {
  let h = harness().await;
  let a = h.register_at(mosque("A"), 0).await;
  h.register_at(mosque("B"), 1).await;
  let actor = h.root.admin_id;

  let outcome = h
    .wf
    .transition(actor, EntityKind::Mosque, a, Status::Approved, "verified", &no_extra())
    .await
    .unwrap();

  assert_eq!(outcome.record.status, Status::Approved);
  assert_eq!(outcome.record.reviewer_notes.as_deref(), Some("verified"));
  let responder = outcome.record.responder.clone().unwrap();
  assert_eq!(responder.actor_id, actor);
  assert_eq!(responder.responded_at, t0() + Duration::seconds(1));

  assert_eq!(outcome.updated_counts.get(Status::Approved), 1);
  assert_eq!(outcome.updated_counts.get(Status::Pending), 1);
  let recount = h.wf.aggregate_counts(actor, EntityKind::Mosque).await.unwrap();
  assert_eq!(recount, outcome.updated_counts);
  assert_eq!(recount.total(), 2);
}

#[tokio::test]
async fn illegal_target_leaves_record_untouched() {
  let h = harness().await;
  let id = h.register_at(mosque("A"), 0).await;

  let err = h
    .wf
    .transition(h.root.admin_id, EntityKind::Mosque, id, Status::UnderReview, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let err = h
    .wf
    .apply_action(h.root.admin_id, EntityKind::Business, id, WorkflowAction::Review, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let record = h.wf.get_record(h.root.admin_id, id).await.unwrap();
  assert_eq!(record.status, Status::Pending);
  assert_eq!(record.version, 0);
}

#[tokio::test]
async fn wrong_kind_is_not_found() {
  let h = harness().await;
  let id = h.register_at(mosque("A"), 0).await;
  let err = h
    .wf
    .transition(h.root.admin_id, EntityKind::Business, id, Status::Approved, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound { kind: EntityKind::Business, .. }));
}

#[tokio::test]
async fn read_only_moderator_cannot_transition() {
  let h = harness().await;
  let reader = h.admin("reader", Role::Moderator, PermissionGrid::default()).await;
  let id = h.register_at(mosque("A"), 0).await;

  let err = h
    .wf
    .transition(reader.admin_id, EntityKind::Mosque, id, Status::Approved, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
  assert_eq!(err.to_string(), "not permitted");

  let record = h.wf.get_record(reader.admin_id, id).await.unwrap();
  assert_eq!(record.status, Status::Pending);
}

#[tokio::test]
async fn unknown_and_inactive_actors_are_refused() {
  let h = harness().await;
  let id = h.register_at(mosque("A"), 0).await;
  let err = h.wf.get_record(Uuid::new_v4(), id).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let editor = h.admin("editor", Role::Admin, PermissionGrid::full()).await;
  let update = AdminUpdate { is_active: Some(false), ..Default::default() };
  h.wf.update_admin(h.root.admin_id, editor.admin_id, update, None).await.unwrap();

  let err = h
    .wf
    .transition(editor.admin_id, EntityKind::Mosque, id, Status::Approved, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
  assert!(!h.wf.authorize(editor.admin_id, Module::Mosques, Capability::Read).await);
}

#[tokio::test]
async fn same_status_transition_still_stamps() {
  let h = harness().await;
  let id = h.register_at(business("Shop"), 0).await;
  let actor = h.root.admin_id;

  let first = h
    .wf
    .transition(actor, EntityKind::Business, id, Status::Approved, "first", &no_extra())
    .await
    .unwrap();
  h.clock.advance(Duration::minutes(10));
  let second = h
    .wf
    .transition(actor, EntityKind::Business, id, Status::Approved, "second", &no_extra())
    .await
    .unwrap();

  assert_eq!(second.record.version, first.record.version + 1);
  assert!(second.record.updated_at > first.record.updated_at);
  assert_eq!(second.record.reviewer_notes.as_deref(), Some("second"));
  assert_eq!(second.updated_counts.get(Status::Approved), 1);
}

#[tokio::test]
async fn volunteer_review_action_targets_reviewed() {
  let h = harness().await;
  let id = h.register_at(application(Uuid::new_v4(), Uuid::new_v4()), 0).await;
  let outcome = h
    .wf
    .apply_action(
      h.root.admin_id,
      EntityKind::VolunteerApplication,
      id,
      WorkflowAction::Review,
      "called back",
      &no_extra(),
    )
    .await
    .unwrap();
  assert_eq!(outcome.record.status, Status::Reviewed);
  assert_eq!(outcome.updated_counts.get(Status::Reviewed), 1);
}

#[tokio::test]
async fn halal_certificate_issued_after_review() {
  let h = harness().await;
  let id = h.register_at(halal(Uuid::new_v4()), 0).await;
  let actor = h.root.admin_id;
  let kind = EntityKind::HalalCertification;

  let reviewing = h
    .wf
    .transition(actor, kind, id, Status::UnderReview, "inspection booked", &no_extra())
    .await
    .unwrap();
  assert_eq!(reviewing.record.status, Status::UnderReview);
  assert_eq!(reviewing.updated_counts.counts[&Status::UnderReview], 1);
  assert_eq!(reviewing.updated_counts.counts[&Status::Pending], 0);

  h.clock.set(t0() + Duration::days(3));
  let expiry = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
  let extra = TransitionExtra {
    certificate_number: Some("HC-000123".into()),
    expiry_date:        Some(expiry),
  };
  let approved = h
    .wf
    .transition(actor, kind, id, Status::Approved, "inspection passed", &extra)
    .await
    .unwrap();
  assert_eq!(approved.record.status, Status::Approved);
  assert_eq!(approved.record.version, 2);
  assert_eq!(approved.updated_counts.counts[&Status::Approved], 1);
  assert_eq!(approved.updated_counts.counts[&Status::UnderReview], 0);

  let stored = h.wf.get_record(actor, id).await.unwrap();
  assert_eq!(stored, approved.record);
  let Payload::HalalCertification(cert) = &stored.payload else {
    panic!("payload kind changed");
  };
  assert_eq!(cert.certificate_number.as_deref(), Some("HC-000123"));
  assert_eq!(cert.expiry_date, Some(expiry));
  assert_eq!(cert.issued_at, Some(t0() + Duration::days(3)));
  assert!(cert.is_valid_on(stored.status, NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()));
  assert!(!cert.is_valid_on(stored.status, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()));
  assert_eq!(stored.reviewer_notes.as_deref(), Some("inspection passed"));
}

#[tokio::test]
async fn submitted_certificate_fields_are_discarded() {
  let h = harness().await;
  let NewRecord { payload: Payload::HalalCertification(mut forged) } = halal(Uuid::new_v4()) else {
    unreachable!()
  };
  forged.certificate_number = Some("HC-999999".into());
  forged.expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
  forged.issued_at = Some(t0());

  let id = h
    .register_at(NewRecord::new(Payload::HalalCertification(forged)), 0)
    .await;
  let stored = h.wf.get_record(h.root.admin_id, id).await.unwrap();
  assert_eq!(stored.status, Status::Pending);
  let Payload::HalalCertification(cert) = &stored.payload else {
    panic!("payload kind changed");
  };
  assert!(cert.certificate_number.is_none());
  assert!(cert.expiry_date.is_none());
  assert!(cert.issued_at.is_none());
}

#[tokio::test]
async fn halal_approval_issues_a_certificate() {
  let h = harness().await;
  let id = h.register_at(halal(Uuid::new_v4()), 0).await;
  let actor = h.root.admin_id;
  let expiry = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

  let err = h
    .wf
    .transition(actor, EntityKind::HalalCertification, id, Status::Approved, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let extra = TransitionExtra { certificate_number: None, expiry_date: Some(expiry) };
  let approved = h
    .wf
    .transition(actor, EntityKind::HalalCertification, id, Status::Approved, "ok", &extra)
    .await
    .unwrap();
  let Payload::HalalCertification(cert) = &approved.record.payload else {
    panic!("payload kind changed");
  };
  let number = cert.certificate_number.clone().unwrap();
  assert!(number.starts_with("HC-"));
  assert_eq!(cert.expiry_date, Some(expiry));
  assert_eq!(cert.issued_at, Some(t0()));
  assert!(cert.is_valid_on(approved.record.status, t0().date_naive()));

  let reconsidered = h
    .wf
    .apply_action(
      actor,
      EntityKind::HalalCertification,
      id,
      WorkflowAction::Reconsider,
      "supplier changed",
      &no_extra(),
    )
    .await
    .unwrap();
  assert_eq!(reconsidered.record.status, Status::UnderReview);
  let Payload::HalalCertification(cert) = &reconsidered.record.payload else {
    panic!("payload kind changed");
  };
  assert_eq!(cert.certificate_number.as_deref(), Some(number.as_str()));
  assert!(!cert.is_valid_on(reconsidered.record.status, t0().date_naive()));
}

#[tokio::test]
async fn explicit_certificate_number_is_kept() {
  let h = harness().await;
  let id = h.register_at(halal(Uuid::new_v4()), 0).await;
  let extra = TransitionExtra {
    certificate_number: Some(" HC-CUSTOM-7 ".into()),
    expiry_date:        NaiveDate::from_ymd_opt(2026, 1, 1),
  };
  let outcome = h
    .wf
    .transition(h.root.admin_id, EntityKind::HalalCertification, id, Status::Approved, "", &extra)
    .await
    .unwrap();
  let Payload::HalalCertification(cert) = outcome.record.payload else {
    panic!("payload kind changed");
  };
  assert_eq!(cert.certificate_number.as_deref(), Some("HC-CUSTOM-7"));
}

// ─── Workflow: edits and deletes ─────────────────────────────────────────────

#[tokio::test]
async fn stale_edit_conflicts() {
  let h = harness().await;
  let id = h.register_at(mosque("A"), 0).await;
  let actor = h.root.admin_id;

  let Payload::Mosque(mut details) = h.wf.get_record(actor, id).await.unwrap().payload else {
    panic!("payload kind changed");
  };
  details.city = "Bradford".into();

  h.wf
    .transition(actor, EntityKind::Mosque, id, Status::Approved, "", &no_extra())
    .await
    .unwrap();

  let err = h
    .wf
    .edit_record(actor, id, Payload::Mosque(details.clone()), Some(0))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Conflict(conflicted) if conflicted == id));

  let edited = h
    .wf
    .edit_record(actor, id, Payload::Mosque(details), Some(1))
    .await
    .unwrap();
  assert_eq!(edited.status, Status::Approved);
  assert_eq!(edited.version, 2);
}

#[tokio::test]
async fn edit_cannot_change_kind() {
  let h = harness().await;
  let id = h.register_at(mosque("A"), 0).await;
  let Payload::Business(details) = business("Shop").payload else { unreachable!() };
  let err = h
    .wf
    .edit_record(h.root.admin_id, id, Payload::Business(details), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn delete_requires_capability_and_recounts() {
  let h = harness().await;
  let writer = h
    .admin(
      "writer",
      Role::Admin,
      PermissionGrid::default().with(Module::Mosques, Capability::Write, true),
    )
    .await;
  let a = h.register_at(mosque("A"), 0).await;
  h.register_at(mosque("B"), 1).await;

  let err = h.wf.delete_record(writer.admin_id, EntityKind::Mosque, a).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let counts = h.wf.delete_record(h.root.admin_id, EntityKind::Mosque, a).await.unwrap();
  assert_eq!(counts.get(Status::Pending), 1);
  assert_eq!(counts.total(), 1);
}

// ─── Workflow: admin accounts ────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_runs_once() {
  let h = harness().await;
  assert_eq!(h.root.role, Role::SuperAdmin);
  assert_eq!(h.root.permissions, PermissionGrid::full());
  assert!(h.wf.bootstrap_super_admin("again").await.unwrap().is_none());
}

#[tokio::test]
async fn self_delete_and_self_deactivation_are_denied() {
  let h = harness().await;
  let me = h.root.admin_id;

  assert!(matches!(h.wf.delete_admin(me, me).await, Err(Error::Unauthorized)));
  let update = AdminUpdate { is_active: Some(false), ..Default::default() };
  assert!(matches!(h.wf.update_admin(me, me, update, None).await, Err(Error::Unauthorized)));

  assert_eq!(h.wf.list_admins(me).await.unwrap().len(), 1);
}

#[tokio::test]
async fn admins_cannot_reach_the_top_tier() {
  let h = harness().await;
  let admin = h.admin("manager", Role::Admin, PermissionGrid::full()).await;

  let err = h
    .wf
    .create_admin(admin.admin_id, NewAdmin::new("usurper", Role::SuperAdmin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let promote = AdminUpdate { role: Some(Role::SuperAdmin), ..Default::default() };
  let err = h
    .wf
    .update_admin(admin.admin_id, admin.admin_id, promote, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let rename = AdminUpdate { display_name: Some("Boss".into()), ..Default::default() };
  let err = h
    .wf
    .update_admin(admin.admin_id, h.root.admin_id, rename, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let err = h.wf.delete_admin(admin.admin_id, h.root.admin_id).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let manager = h.wf.store().get_admin(admin.admin_id).await.unwrap().unwrap();
  assert_eq!(manager.role, Role::Admin);
  assert_eq!(manager.version, 0);
  let root = h.wf.store().get_admin(h.root.admin_id).await.unwrap().unwrap();
  assert_eq!(root, h.root);
  assert!(h.wf.store().find_admin("usurper").await.unwrap().is_none());

  let moderator = h
    .wf
    .create_admin(admin.admin_id, NewAdmin::new("helper", Role::Moderator))
    .await
    .unwrap();
  assert_eq!(moderator.permissions, PermissionGrid::default());
}

#[tokio::test]
async fn grants_are_limited_to_the_grantors_own_cells() {
  let h = harness().await;
  let grid = PermissionGrid::default().with(Module::Users, Capability::Write, true);
  let moderator = h.admin("gatekeeper", Role::Moderator, grid).await;
  let id = h.register_at(mosque("Al-Noor"), 0).await;

  let everything = AdminUpdate { permissions: Some(PermissionGrid::full()), ..Default::default() };
  let err = h
    .wf
    .update_admin(moderator.admin_id, moderator.admin_id, everything.clone(), None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let accomplice = NewAdmin {
    permissions: Some(PermissionGrid::full()),
    ..NewAdmin::new("accomplice", Role::Moderator)
  };
  let err = h.wf.create_admin(moderator.admin_id, accomplice).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let peer = h.admin("peer", Role::Moderator, PermissionGrid::default()).await;
  let err = h
    .wf
    .update_admin(moderator.admin_id, peer.admin_id, everything, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  // Cells the grantor holds can still be handed on.
  let reader = AdminUpdate { permissions: Some(PermissionGrid::default()), ..Default::default() };
  h.wf.update_admin(moderator.admin_id, peer.admin_id, reader, None).await.unwrap();

  let stored = h.wf.store().get_admin(moderator.admin_id).await.unwrap().unwrap();
  assert_eq!(stored.permissions, grid);
  let err = h
    .wf
    .transition(moderator.admin_id, EntityKind::Mosque, id, Status::Approved, "", &no_extra())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn own_permissions_cannot_be_edited_even_at_the_top() {
  let h = harness().await;
  let narrower = AdminUpdate { permissions: Some(PermissionGrid::default()), ..Default::default() };
  let err = h
    .wf
    .update_admin(h.root.admin_id, h.root.admin_id, narrower, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
}

#[tokio::test]
async fn last_super_admin_cannot_step_down() {
  let h = harness().await;
  let me = h.root.admin_id;

  let demote = AdminUpdate { role: Some(Role::Moderator), ..Default::default() };
  let err = h.wf.update_admin(me, me, demote.clone(), None).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
  let root = h.wf.store().get_admin(me).await.unwrap().unwrap();
  assert_eq!(root.role, Role::SuperAdmin);
  assert_eq!(root.version, 0);

  // With a successor in place the step down goes through.
  let second = h.admin("second", Role::SuperAdmin, PermissionGrid::full()).await;
  let stepped = h.wf.update_admin(me, me, demote, Some(0)).await.unwrap();
  assert_eq!(stepped.role, Role::Moderator);

  // The successor is now the last one and cannot be removed or demoted by anyone.
  let err = h
    .wf
    .update_admin(
      second.admin_id,
      second.admin_id,
      AdminUpdate { role: Some(Role::Admin), ..Default::default() },
      None,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
  assert!(matches!(h.wf.delete_admin(me, second.admin_id).await, Err(Error::Unauthorized)));
  let second = h.wf.store().get_admin(second.admin_id).await.unwrap().unwrap();
  assert_eq!(second.role, Role::SuperAdmin);
  assert!(second.is_active);
}

#[tokio::test]
async fn super_admin_manages_other_accounts() {
  let h = harness().await;
  let other = h.admin("second", Role::SuperAdmin, PermissionGrid::full()).await;

  let update = AdminUpdate { role: Some(Role::Admin), ..Default::default() };
  let demoted = h
    .wf
    .update_admin(h.root.admin_id, other.admin_id, update, Some(0))
    .await
    .unwrap();
  assert_eq!(demoted.role, Role::Admin);
  assert_eq!(demoted.version, 1);

  h.wf.delete_admin(h.root.admin_id, other.admin_id).await.unwrap();
  let err = h.wf.delete_admin(h.root.admin_id, other.admin_id).await.unwrap_err();
  assert!(matches!(err, Error::NotFound { kind: EntityKind::AdminAccount, .. }));
}

#[tokio::test]
async fn usernames_are_unique_and_non_empty() {
  let h = harness().await;
  let err = h
    .wf
    .create_admin(h.root.admin_id, NewAdmin::new("root", Role::Admin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let err = h
    .wf
    .create_admin(h.root.admin_id, NewAdmin::new("   ", Role::Admin))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

// ─── Workflow: reads ─────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_actors_learn_nothing_about_record_ids() {
  let h = harness().await;
  let id = h.register_at(mosque("Al-Noor"), 0).await;
  let stranger = Uuid::new_v4();
  let missing = Uuid::new_v4();

  assert!(matches!(h.wf.get_record(stranger, id).await, Err(Error::Unauthorized)));
  assert!(matches!(h.wf.get_record(stranger, missing).await, Err(Error::Unauthorized)));

  let payload = mosque("Renamed").payload;
  let err = h.wf.edit_record(stranger, id, payload.clone(), None).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));
  let err = h.wf.edit_record(stranger, missing, payload, None).await.unwrap_err();
  assert!(matches!(err, Error::Unauthorized));

  let err = h.wf.get_record(h.root.admin_id, missing).await.unwrap_err();
  assert!(matches!(err, Error::RecordNotFound(m) if m == missing));
}

#[tokio::test]
async fn list_by_status_rejects_non_workflow_kinds() {
  let h = harness().await;
  let err = h
    .wf
    .list_by_status(h.root.admin_id, EntityKind::AdminAccount, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let err = h
    .wf
    .list_by_status(h.root.admin_id, EntityKind::Mosque, Some(Status::Reviewed))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn dashboard_covers_readable_kinds_only() {
  let h = harness().await;
  h.register_at(mosque("A"), 0).await;
  h.register_at(business("B"), 1).await;

  let grid = PermissionGrid::default()
    .with(Module::Businesses, Capability::Read, false)
    .with(Module::HalalCertifications, Capability::Read, false);
  let viewer = h.admin("viewer", Role::Moderator, grid).await;

  let summary = h.wf.dashboard(viewer.admin_id).await.unwrap();
  let kinds: Vec<_> = summary.kinds.iter().map(|k| k.counts.kind).collect();
  assert!(kinds.contains(&EntityKind::Mosque));
  assert!(!kinds.contains(&EntityKind::Business));
  assert_eq!(summary.total, 1);
  assert_eq!(summary.pending, 1);

  let full = h.wf.dashboard(h.root.admin_id).await.unwrap();
  assert_eq!(full.total, 2);
  assert_eq!(full.verification_rate, 0.0);
}

#[tokio::test]
async fn match_view_merges_applications_and_general_offers() {
  let h = harness().await;
  let here = Uuid::new_v4();
  let elsewhere = Uuid::new_v4();
  let volunteer = Uuid::new_v4();

  let app_here = h.register_at(application(here, volunteer), 0).await;
  h.register_at(application(elsewhere, Uuid::new_v4()), 1).await;
  let general = h.register_at(offer(volunteer, true), 2).await;
  h.register_at(offer(Uuid::new_v4(), false), 3).await;
  let newest = h.register_at(application(here, Uuid::new_v4()), 4).await;

  let page = h
    .wf
    .match_volunteers(h.root.admin_id, MatchScope::Mosque(here), None, PageRequest::new(1, 2))
    .await
    .unwrap();
  assert_eq!(page.pagination.total, 3);
  assert_eq!(page.pagination.total_pages, 2);
  let ids: Vec<_> = page.items.iter().map(|e| e.record.id).collect();
  assert_eq!(ids, vec![newest, general]);
  assert_eq!(page.items[1].source, MatchSource::Offer);

  let second = h
    .wf
    .match_volunteers(h.root.admin_id, MatchScope::Mosque(here), None, PageRequest::new(2, 2))
    .await
    .unwrap();
  assert_eq!(second.items.len(), 1);
  assert_eq!(second.items[0].record.id, app_here);

  let mine = h
    .wf
    .match_volunteers(h.root.admin_id, MatchScope::Volunteer(volunteer), None, PageRequest::default())
    .await
    .unwrap();
  let ids: Vec<_> = mine.items.iter().map(|e| e.record.id).collect();
  assert_eq!(ids, vec![general, app_here]);

  h.wf
    .transition(h.root.admin_id, EntityKind::VolunteerOffer, general, Status::Approved, "", &no_extra())
    .await
    .unwrap();
  let approved = h
    .wf
    .match_volunteers(
      h.root.admin_id,
      MatchScope::AllMosques,
      Some(Status::Approved),
      PageRequest::default(),
    )
    .await
    .unwrap();
  assert_eq!(approved.pagination.total, 1);
  assert_eq!(approved.items[0].record.id, general);
}

#[tokio::test]
async fn match_view_validates_paging() {
  let h = harness().await;
  let wf = h.wf.clone().with_max_page_size(10);
  let scope = MatchScope::AllMosques;

  let err = wf
    .match_volunteers(h.root.admin_id, scope, None, PageRequest::new(0, 5))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let err = wf
    .match_volunteers(h.root.admin_id, scope, None, PageRequest::new(1, 11))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Validation(_)));

  let empty = wf
    .match_volunteers(h.root.admin_id, scope, None, PageRequest::new(3, 10))
    .await
    .unwrap();
  assert!(empty.items.is_empty());
  assert_eq!(empty.pagination.total, 0);
}

#[tokio::test]
async fn authorize_answers_from_the_grid() {
  let h = harness().await;
  let reader = h.admin("reader", Role::Moderator, PermissionGrid::default()).await;
  assert!(h.wf.authorize(reader.admin_id, Module::Mosques, Capability::Read).await);
  assert!(!h.wf.authorize(reader.admin_id, Module::Mosques, Capability::Write).await);
  assert!(!h.wf.authorize(Uuid::new_v4(), Module::Mosques, Capability::Read).await);
}
