//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (nanoseconds, `Z`)
//! so that text order is time order. Enums are stored by their snake_case
//! names. Payloads and permission grids are stored as compact JSON. UUIDs
//! are stored as hyphenated lowercase strings.

use amanah_core::{
  permission::{AdminAccount, PermissionGrid, Role},
  record::{EntityKind, EntityRecord, Payload, Responder, Status},
  store::GroupedCounts,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("bad timestamp {s:?}: {e}")))
}

// ─── Enums ────────────────────────────────────────────────────────────────────

pub fn encode_kind(kind: EntityKind) -> String { kind.to_string() }

pub fn decode_kind(s: &str) -> Result<EntityKind> {
  s.parse().map_err(|_| Error::Decode(format!("unknown entity kind: {s:?}")))
}

pub fn encode_status(status: Status) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<Status> {
  s.parse().map_err(|_| Error::Decode(format!("unknown status: {s:?}")))
}

pub fn decode_role(s: &str) -> Result<Role> {
  s.parse().map_err(|_| Error::Decode(format!("unknown role: {s:?}")))
}

// ─── Counts ──────────────────────────────────────────────────────────────────

pub fn decode_groups(raw: Vec<(String, i64)>) -> Result<GroupedCounts> {
  raw
    .into_iter()
    .map(|(status, n)| Ok((decode_status(&status)?, n.max(0) as u64)))
    .collect()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read from, or about to be written to, a `records` row.
pub struct RawRecord {
  pub record_id:      String,
  pub kind:           String,
  pub status:         String,
  pub payload_json:   String,
  pub reviewer_notes: Option<String>,
  pub responder_id:   Option<String>,
  pub responded_at:   Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
  pub version:        i64,
}

impl RawRecord {
  /// Column list matching [`RawRecord::from_row`].
  pub const COLUMNS: &'static str = "record_id, kind, status, payload_json, reviewer_notes, \
     responder_id, responded_at, created_at, updated_at, version";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:      row.get(0)?,
      kind:           row.get(1)?,
      status:         row.get(2)?,
      payload_json:   row.get(3)?,
      reviewer_notes: row.get(4)?,
      responder_id:   row.get(5)?,
      responded_at:   row.get(6)?,
      created_at:     row.get(7)?,
      updated_at:     row.get(8)?,
      version:        row.get(9)?,
    })
  }

  pub fn from_record(record: &EntityRecord) -> Result<Self> {
    Ok(Self {
      record_id:      encode_uuid(record.id),
      kind:           encode_kind(record.kind()),
      status:         encode_status(record.status),
      payload_json:   record.payload.to_json()?.to_string(),
      reviewer_notes: record.reviewer_notes.clone(),
      responder_id:   record.responder.as_ref().map(|r| encode_uuid(r.actor_id)),
      responded_at:   record.responder.as_ref().map(|r| encode_dt(r.responded_at)),
      created_at:     encode_dt(record.created_at),
      updated_at:     encode_dt(record.updated_at),
      version:        record.version,
    })
  }

  pub fn into_record(self) -> Result<EntityRecord> {
    let kind = decode_kind(&self.kind)?;
    let data: serde_json::Value = serde_json::from_str(&self.payload_json)?;
    let payload = Payload::from_parts(kind, data)?;

    let responder = match (self.responder_id, self.responded_at) {
      (Some(id), Some(at)) => Some(Responder {
        actor_id:     decode_uuid(&id)?,
        responded_at: decode_dt(&at)?,
      }),
      _ => None,
    };

    Ok(EntityRecord {
      id: decode_uuid(&self.record_id)?,
      status: decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      reviewer_notes: self.reviewer_notes,
      responder,
      version: self.version,
      payload,
    })
  }
}

/// Raw strings read from, or about to be written to, an `admin_accounts` row.
pub struct RawAdmin {
  pub admin_id:         String,
  pub username:         String,
  pub display_name:     String,
  pub role:             String,
  pub permissions_json: String,
  pub is_active:        bool,
  pub created_at:       String,
  pub updated_at:       String,
  pub version:          i64,
}

impl RawAdmin {
  pub const COLUMNS: &'static str = "admin_id, username, display_name, role, permissions_json, \
     is_active, created_at, updated_at, version";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      admin_id:         row.get(0)?,
      username:         row.get(1)?,
      display_name:     row.get(2)?,
      role:             row.get(3)?,
      permissions_json: row.get(4)?,
      is_active:        row.get(5)?,
      created_at:       row.get(6)?,
      updated_at:       row.get(7)?,
      version:          row.get(8)?,
    })
  }

  pub fn from_account(account: &AdminAccount) -> Result<Self> {
    Ok(Self {
      admin_id:         encode_uuid(account.admin_id),
      username:         account.username.clone(),
      display_name:     account.display_name.clone(),
      role:             account.role.to_string(),
      permissions_json: serde_json::to_string(&account.permissions)?,
      is_active:        account.is_active,
      created_at:       encode_dt(account.created_at),
      updated_at:       encode_dt(account.updated_at),
      version:          account.version,
    })
  }

  pub fn into_account(self) -> Result<AdminAccount> {
    let permissions: PermissionGrid = serde_json::from_str(&self.permissions_json)?;
    Ok(AdminAccount {
      admin_id: decode_uuid(&self.admin_id)?,
      username: self.username,
      display_name: self.display_name,
      role: decode_role(&self.role)?,
      permissions,
      is_active: self.is_active,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
      version: self.version,
    })
  }
}
