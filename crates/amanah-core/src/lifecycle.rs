//! The status state machine shared by every entity kind.
//!
//! Transitions are computed, not applied: [`transition`] takes the current
//! record by reference and returns the next version of it. The caller
//! persists the result conditioned on the old version, so a rejected call
//! can never leave a half-updated record behind.
//!
//! There is no terminal state. Reconsidering a rejected or approved record
//! and returning a record to pending are ordinary transitions; hiding those
//! moves is a policy of the calling surface, not of the machine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::{
  Error, Result,
  permission::{Actor, Capability},
  record::{EntityKind, EntityRecord, Payload, Responder, Status},
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// Kind-specific data accompanying a transition. Only halal certification
/// approval reads it today.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionExtra {
  pub certificate_number: Option<String>,
  pub expiry_date:        Option<NaiveDate>,
}

/// The admin-facing verbs, resolved per kind to a target status.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowAction {
  Approve,
  Reject,
  /// Move into the kind's intermediate review state.
  Review,
  /// Re-open a decided record.
  Reconsider,
  /// Return to pending.
  Reset,
}

impl WorkflowAction {
  pub fn target(self, kind: EntityKind) -> Result<Status> {
    let review_state = match kind {
      EntityKind::HalalCertification => Some(Status::UnderReview),
      EntityKind::VolunteerApplication | EntityKind::VolunteerOffer => {
        Some(Status::Reviewed)
      }
      _ => None,
    };

    let target = match self {
      Self::Approve => Status::Approved,
      Self::Reject => Status::Rejected,
      Self::Reset => Status::Pending,
      Self::Review => review_state.ok_or_else(|| {
        Error::validation(format!("{kind} has no review state"))
      })?,
      Self::Reconsider => match kind {
        EntityKind::HalalCertification => Status::UnderReview,
        _ => Status::Pending,
      },
    };

    if !kind.allows(target) {
      return Err(Error::validation(format!(
        "{self} is not available for {kind}"
      )));
    }
    Ok(target)
  }
}

// ─── Transition ──────────────────────────────────────────────────────────────

/// Compute the record that results from `actor` moving `record` to `target`.
///
/// Every transition, including a same-status resubmission and a return to
/// pending, stamps the responder and `updated_at`, replaces the reviewer
/// notes and bumps the version.
pub fn transition(
  record: &EntityRecord,
  target: Status,
  actor: &Actor,
  notes: &str,
  extra: &TransitionExtra,
  now: DateTime<Utc>,
) -> Result<EntityRecord> {
  let kind = record.kind();

  if !kind.allows(target) {
    return Err(Error::validation(format!(
      "{target} is not a legal status for {kind}"
    )));
  }
  if !actor.can(kind.module(), Capability::Write) {
    return Err(Error::Unauthorized);
  }

  let payload = match (&record.payload, target) {
    (Payload::HalalCertification(cert), Status::Approved) => {
      let expiry_date = extra.expiry_date.ok_or_else(|| {
        Error::validation("an expiry date is required to approve a halal certification")
      })?;
      let certificate_number = match extra.certificate_number.as_deref().map(str::trim) {
        Some(number) if !number.is_empty() => number.to_owned(),
        _ => derive_certificate_number(now),
      };

      let mut cert = cert.clone();
      cert.certificate_number = Some(certificate_number);
      cert.expiry_date = Some(expiry_date);
      cert.issued_at = Some(now);
      Payload::HalalCertification(cert)
    }
    (payload, _) => payload.clone(),
  };

  Ok(EntityRecord {
    id: record.id,
    status: target,
    created_at: record.created_at,
    updated_at: now,
    reviewer_notes: Some(notes.to_owned()),
    responder: Some(Responder { actor_id: actor.actor_id, responded_at: now }),
    version: record.version + 1,
    payload,
  })
}

/// Default certificate number: `HC-` followed by the last six digits of the
/// millisecond timestamp. Not checked against previously issued numbers.
pub fn derive_certificate_number(now: DateTime<Utc>) -> String {
  format!("HC-{:06}", now.timestamp_millis().rem_euclid(1_000_000))
}

/// The payload a public submission is stored with. Certificate fields are
/// only ever issued by approval, so any the submitter filled in are dropped.
pub fn submission(payload: Payload) -> Payload {
  match payload {
    Payload::HalalCertification(mut cert) => {
      cert.certificate_number = None;
      cert.expiry_date = None;
      cert.issued_at = None;
      Payload::HalalCertification(cert)
    }
    other => other,
  }
}

/// Replace a record's payload without touching its workflow state.
pub fn edit(
  record: &EntityRecord,
  payload: Payload,
  now: DateTime<Utc>,
) -> Result<EntityRecord> {
  if payload.kind() != record.kind() {
    return Err(Error::validation(format!(
      "cannot change a {} into a {}",
      record.kind(),
      payload.kind()
    )));
  }
  Ok(EntityRecord {
    updated_at: now,
    version: record.version + 1,
    payload,
    ..record.clone()
  })
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::{
    permission::{Module, PermissionGrid, Role},
    record::{ContactInfo, HalalCertification, MosqueDetails},
  };

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap() }

  fn writer() -> Actor {
    Actor {
      actor_id:    Uuid::new_v4(),
      role:        Role::Admin,
      permissions: PermissionGrid::full(),
    }
  }

  fn record(payload: Payload) -> EntityRecord {
    let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    EntityRecord {
      id: Uuid::new_v4(),
      status: Status::Pending,
      created_at: created,
      updated_at: created,
      reviewer_notes: None,
      responder: None,
      version: 0,
      payload,
    }
  }

  fn mosque() -> EntityRecord {
    record(Payload::Mosque(MosqueDetails {
      name:          "Masjid Al-Noor".into(),
      address:       "1 High St".into(),
      city:          "Leeds".into(),
      contact:       ContactInfo { email: "info@alnoor.org".into(), phone: None },
      imam_name:     None,
      capacity:      Some(300),
      registered_by: None,
    }))
  }

  fn certification() -> EntityRecord {
    record(Payload::HalalCertification(HalalCertification {
      business_id:        Uuid::new_v4(),
      business_name:      "Noor Grill".into(),
      product_categories: vec!["meat".into()],
      certificate_number: None,
      expiry_date:        None,
      issued_at:          None,
    }))
  }

  fn cert_of(record: &EntityRecord) -> &HalalCertification {
    match &record.payload {
      Payload::HalalCertification(c) => c,
      other => panic!("expected certification, got {other:?}"),
    }
  }

  #[test]
  fn approve_sets_status_notes_and_responder() {
    let actor = writer();
    let before = mosque();
    let after =
      transition(&before, Status::Approved, &actor, "looks good", &TransitionExtra::default(), now())
        .unwrap();

    assert_eq!(after.status, Status::Approved);
    assert_eq!(after.reviewer_notes.as_deref(), Some("looks good"));
    assert_eq!(
      after.responder,
      Some(Responder { actor_id: actor.actor_id, responded_at: now() })
    );
    assert_eq!(after.updated_at, now());
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.version, 1);
    assert_eq!(before.status, Status::Pending);
  }

  #[test]
  fn illegal_target_is_a_validation_error() {
    let err = transition(
      &mosque(),
      Status::UnderReview,
      &writer(),
      "",
      &TransitionExtra::default(),
      now(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn missing_write_capability_is_unauthorized() {
    let reader = Actor {
      actor_id:    Uuid::new_v4(),
      role:        Role::Moderator,
      permissions: PermissionGrid::default()
        .with(Module::Businesses, Capability::Write, true),
    };
    let err = transition(
      &mosque(),
      Status::Approved,
      &reader,
      "",
      &TransitionExtra::default(),
      now(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
  }

  #[test]
  fn same_status_transition_is_accepted() {
    let actor = writer();
    let first =
      transition(&mosque(), Status::Pending, &actor, "", &TransitionExtra::default(), now())
        .unwrap();
    assert_eq!(first.status, Status::Pending);
    assert!(first.responder.is_some());
    assert_eq!(first.reviewer_notes.as_deref(), Some(""));
  }

  #[test]
  fn halal_approval_requires_expiry() {
    let err = transition(
      &certification(),
      Status::Approved,
      &writer(),
      "",
      &TransitionExtra { certificate_number: Some("HC-000123".into()), expiry_date: None },
      now(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn halal_review_does_not_require_expiry() {
    let after = transition(
      &certification(),
      Status::UnderReview,
      &writer(),
      "checking supplier",
      &TransitionExtra::default(),
      now(),
    )
    .unwrap();
    assert_eq!(after.status, Status::UnderReview);
    assert!(cert_of(&after).certificate_number.is_none());
  }

  #[test]
  fn halal_approval_issues_given_certificate() {
    let expiry = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
    let after = transition(
      &certification(),
      Status::Approved,
      &writer(),
      "",
      &TransitionExtra {
        certificate_number: Some("HC-000123".into()),
        expiry_date:        Some(expiry),
      },
      now(),
    )
    .unwrap();
    let cert = cert_of(&after);
    assert_eq!(cert.certificate_number.as_deref(), Some("HC-000123"));
    assert_eq!(cert.expiry_date, Some(expiry));
    assert_eq!(cert.issued_at, Some(now()));
  }

  #[test]
  fn halal_approval_derives_certificate_number_from_clock() {
    let after = transition(
      &certification(),
      Status::Approved,
      &writer(),
      "",
      &TransitionExtra { certificate_number: None, expiry_date: NaiveDate::from_ymd_opt(2026, 1, 1) },
      now(),
    )
    .unwrap();
    let expected = format!("HC-{:06}", now().timestamp_millis() % 1_000_000);
    assert_eq!(cert_of(&after).certificate_number.as_deref(), Some(expected.as_str()));
    assert_eq!(expected.len(), 9);
  }

  #[test]
  fn reconsidering_keeps_issued_certificate() {
    let actor = writer();
    let approved = transition(
      &certification(),
      Status::Approved,
      &actor,
      "",
      &TransitionExtra {
        certificate_number: Some("HC-000999".into()),
        expiry_date:        NaiveDate::from_ymd_opt(2026, 1, 1),
      },
      now(),
    )
    .unwrap();
    let target = WorkflowAction::Reconsider.target(EntityKind::HalalCertification).unwrap();
    let again =
      transition(&approved, target, &actor, "complaint", &TransitionExtra::default(), now())
        .unwrap();
    assert_eq!(again.status, Status::UnderReview);
    assert_eq!(cert_of(&again).certificate_number.as_deref(), Some("HC-000999"));
    assert!(!cert_of(&again).is_valid_on(again.status, now().date_naive()));
  }

  #[test]
  fn actions_resolve_per_kind() {
    let review = |kind| WorkflowAction::Review.target(kind);
    assert_eq!(review(EntityKind::HalalCertification).unwrap(), Status::UnderReview);
    assert_eq!(review(EntityKind::VolunteerApplication).unwrap(), Status::Reviewed);
    assert!(review(EntityKind::Mosque).is_err());
    assert_eq!(
      WorkflowAction::Reconsider.target(EntityKind::Business).unwrap(),
      Status::Pending
    );
    assert_eq!(
      WorkflowAction::Reset.target(EntityKind::HalalCertification).unwrap(),
      Status::Pending
    );
    assert!(WorkflowAction::Approve.target(EntityKind::AdminAccount).is_err());
  }

  #[test]
  fn edit_keeps_workflow_state_but_rejects_kind_change() {
    let before = mosque();
    let Payload::Mosque(mut details) = before.payload.clone() else { unreachable!() };
    details.capacity = Some(450);
    let after = edit(&before, Payload::Mosque(details), now()).unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.updated_at, now());
    assert_eq!(after.version, 1);

    let err = edit(&before, certification().payload, now()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[test]
  fn submission_drops_issued_certificate_fields() {
    let Payload::HalalCertification(mut forged) = certification().payload else {
      unreachable!()
    };
    forged.certificate_number = Some("HC-999999".into());
    forged.expiry_date = NaiveDate::from_ymd_opt(2030, 1, 1);
    forged.issued_at = Some(now());

    let Payload::HalalCertification(cert) = submission(Payload::HalalCertification(forged))
    else {
      unreachable!()
    };
    assert!(cert.certificate_number.is_none());
    assert!(cert.expiry_date.is_none());
    assert!(cert.issued_at.is_none());

    assert_eq!(submission(mosque().payload), mosque().payload);
  }
}
