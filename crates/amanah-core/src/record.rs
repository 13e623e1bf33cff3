//! Entity records: the persisted shape of every verifiable thing.
//!
//! A record is a thin workflow envelope (status, notes, responder, version)
//! around a kind-specific payload. The payload enum is the single source of
//! the record's kind; it is fixed when the record is created and never
//! inferred from which fields happen to be present.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uuid::Uuid;

use crate::{Result, permission::Module};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// The category of a verifiable record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityKind {
  Mosque,
  Business,
  VolunteerApplication,
  VolunteerOffer,
  HalalCertification,
  AdminAccount,
}

impl EntityKind {
  /// Every status a record of this kind may hold. Admin accounts are not a
  /// workflow target and have none.
  pub fn statuses(self) -> &'static [Status] {
    use Status::*;
    match self {
      Self::Mosque | Self::Business => &[Pending, Approved, Rejected],
      Self::VolunteerApplication | Self::VolunteerOffer => {
        &[Pending, Reviewed, Approved, Rejected]
      }
      Self::HalalCertification => &[Pending, UnderReview, Approved, Rejected],
      Self::AdminAccount => &[],
    }
  }

  pub fn allows(self, status: Status) -> bool {
    self.statuses().contains(&status)
  }

  /// Whether records of this kind pass through the approval lifecycle.
  pub fn is_workflow_target(self) -> bool { !self.statuses().is_empty() }

  /// The permission-grid module that guards records of this kind.
  pub fn module(self) -> Module {
    match self {
      Self::Mosque => Module::Mosques,
      Self::Business => Module::Businesses,
      Self::VolunteerApplication | Self::VolunteerOffer => Module::Volunteers,
      Self::HalalCertification => Module::HalalCertifications,
      Self::AdminAccount => Module::Users,
    }
  }

  /// Kinds that carry an approval lifecycle, in display order.
  pub fn workflow_kinds() -> impl Iterator<Item = EntityKind> {
    Self::iter().filter(|k| k.is_workflow_target())
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// Union of every kind's workflow states. Which subset is legal is decided
/// by [`EntityKind::statuses`].
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  Pending,
  UnderReview,
  Reviewed,
  Approved,
  Rejected,
}

impl Status {
  /// Every workflow starts here.
  pub const INITIAL: Status = Status::Pending;
}

// ─── Payloads ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
  pub email: String,
  pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosqueDetails {
  pub name:          String,
  pub address:       String,
  pub city:          String,
  pub contact:       ContactInfo,
  pub imam_name:     Option<String>,
  pub capacity:      Option<u32>,
  /// The user who submitted the registration.
  pub registered_by: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDetails {
  pub name:     String,
  /// Free-text category, e.g. "restaurant" or "butcher".
  pub category: String,
  pub address:  String,
  pub contact:  ContactInfo,
  pub owner_id: Option<Uuid>,
}

/// A volunteer's application to one specific mosque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerApplication {
  pub mosque_id:    Uuid,
  pub volunteer_id: Uuid,
  pub name:         String,
  pub email:        String,
  #[serde(default)]
  pub skills:       Vec<String>,
  pub availability: Option<String>,
  pub message:      Option<String>,
}

/// A volunteer's availability record, optionally visible to every mosque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolunteerOffer {
  pub volunteer_id:     Uuid,
  pub name:             String,
  pub email:            String,
  #[serde(default)]
  pub skills:           Vec<String>,
  pub availability:     Option<String>,
  pub is_general_offer: bool,
  /// Only meaningful for offers that are not general.
  pub preferred_mosque: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HalalCertification {
  pub business_id:        Uuid,
  pub business_name:      String,
  #[serde(default)]
  pub product_categories: Vec<String>,
  /// Issued on approval; retained through later re-review.
  pub certificate_number: Option<String>,
  pub expiry_date:        Option<NaiveDate>,
  pub issued_at:          Option<DateTime<Utc>>,
}

impl HalalCertification {
  /// A certificate is in force only while approved and unexpired.
  pub fn is_valid_on(&self, status: Status, today: NaiveDate) -> bool {
    status == Status::Approved
      && self.certificate_number.is_some()
      && self.expiry_date.is_some_and(|d| d >= today)
  }
}

/// The typed payload of a record. The variant is the record's kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Payload {
  Mosque(MosqueDetails),
  Business(BusinessDetails),
  VolunteerApplication(VolunteerApplication),
  VolunteerOffer(VolunteerOffer),
  HalalCertification(HalalCertification),
}

impl Payload {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Mosque(_) => EntityKind::Mosque,
      Self::Business(_) => EntityKind::Business,
      Self::VolunteerApplication(_) => EntityKind::VolunteerApplication,
      Self::VolunteerOffer(_) => EntityKind::VolunteerOffer,
      Self::HalalCertification(_) => EntityKind::HalalCertification,
    }
  }

  /// Serialise the inner payload (without the kind tag) for storage.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild a payload from its stored kind and JSON body.
  pub fn from_parts(kind: EntityKind, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "kind": kind.to_string(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// Who last moved a record, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responder {
  pub actor_id:     Uuid,
  pub responded_at: DateTime<Utc>,
}

/// One verifiable item with its workflow envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
  pub id:             Uuid,
  pub status:         Status,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
  pub reviewer_notes: Option<String>,
  /// Unset until the first transition.
  pub responder:      Option<Responder>,
  /// Optimistic-concurrency token, bumped by every write.
  pub version:        i64,
  pub payload:        Payload,
}

impl EntityRecord {
  pub fn kind(&self) -> EntityKind { self.payload.kind() }

  /// The mosque a record is tied to, if any.
  pub fn mosque_id(&self) -> Option<Uuid> {
    match &self.payload {
      Payload::VolunteerApplication(a) => Some(a.mosque_id),
      Payload::VolunteerOffer(o) if !o.is_general_offer => o.preferred_mosque,
      _ => None,
    }
  }
}

/// Input to [`crate::store::RecordStore::insert_record`]. Status, timestamps
/// and version are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub payload: Payload,
}

impl NewRecord {
  pub fn new(payload: Payload) -> Self { Self { payload } }

  pub fn kind(&self) -> EntityKind { self.payload.kind() }
}
