//! [`SqliteStore`], the SQLite implementation of [`RecordStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::debug;
use uuid::Uuid;

use amanah_core::{
  permission::{AdminAccount, NewAdmin},
  record::{EntityKind, EntityRecord, NewRecord, Status},
  store::{CommitOutcome, GroupedCounts, RecordQuery, RecordStore},
};

use crate::{
  encode::{decode_groups, encode_kind, encode_status, encode_uuid, RawAdmin, RawRecord},
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Amanah record store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection handle is shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

/// `(status, count)` rows for one kind. Runs on whatever connection or
/// transaction the caller holds.
fn grouped_counts(
  conn: &rusqlite::Connection,
  kind: &str,
) -> rusqlite::Result<Vec<(String, i64)>> {
  let mut stmt = conn.prepare_cached(
    "SELECT status, COUNT(*) FROM records WHERE kind = ?1 GROUP BY status",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![kind], |r| Ok((r.get(0)?, r.get(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn row_exists(conn: &rusqlite::Connection, sql: &str, id: &str) -> rusqlite::Result<bool> {
  Ok(
    conn
      .query_row(sql, rusqlite::params![id], |_| Ok(true))
      .optional()?
      .unwrap_or(false),
  )
}

// ─── RecordStore impl ────────────────────────────────────────────────────────

impl RecordStore for SqliteStore {
  type Error = crate::Error;

  // ── Records ───────────────────────────────────────────────────────────────

  async fn insert_record(&self, input: NewRecord, now: DateTime<Utc>) -> Result<EntityRecord> {
    let record = EntityRecord {
      id:             Uuid::new_v4(),
      status:         Status::INITIAL,
      created_at:     now,
      updated_at:     now,
      reviewer_notes: None,
      responder:      None,
      version:        0,
      payload:        input.payload,
    };
    let raw = RawRecord::from_record(&record)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO records (
             record_id, kind, status, payload_json, reviewer_notes,
             responder_id, responded_at, created_at, updated_at, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
          rusqlite::params![
            raw.record_id,
            raw.kind,
            raw.status,
            raw.payload_json,
            raw.reviewer_notes,
            raw.responder_id,
            raw.responded_at,
            raw.created_at,
            raw.updated_at,
            raw.version,
          ],
        )?;
        Ok(())
      })
      .await?;

    debug!(record_id = %record.id, kind = %record.kind(), "record inserted");
    Ok(record)
  }

  async fn get_record(&self, id: Uuid) -> Result<Option<EntityRecord>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {} FROM records WHERE record_id = ?1", RawRecord::COLUMNS);

    let raw: Option<RawRecord> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawRecord::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRecord::into_record).transpose()
  }

  async fn list_records(&self, query: &RecordQuery) -> Result<Vec<EntityRecord>> {
    if query.kinds.is_empty() {
      return Ok(Vec::new());
    }

    let mut params: Vec<String> = query.kinds.iter().map(|k| encode_kind(*k)).collect();
    let placeholders = (1..=params.len())
      .map(|i| format!("?{i}"))
      .collect::<Vec<_>>()
      .join(", ");

    let mut sql = format!(
      "SELECT {} FROM records WHERE kind IN ({placeholders})",
      RawRecord::COLUMNS
    );
    if let Some(status) = query.status {
      params.push(encode_status(status));
      sql.push_str(&format!(" AND status = ?{}", params.len()));
    }
    sql.push_str(" ORDER BY created_at DESC, record_id DESC");

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }

  async fn count_by_status(&self, kind: EntityKind) -> Result<GroupedCounts> {
    let kind_str = encode_kind(kind);
    let raw = self
      .conn
      .call(move |conn| Ok(grouped_counts(conn, &kind_str)?))
      .await?;
    decode_groups(raw)
  }

  async fn commit_record(
    &self,
    next: &EntityRecord,
    expected_version: i64,
  ) -> Result<CommitOutcome<GroupedCounts>> {
    let raw = RawRecord::from_record(next)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE records SET
             status = ?2, payload_json = ?3, reviewer_notes = ?4,
             responder_id = ?5, responded_at = ?6, updated_at = ?7, version = ?8
           WHERE record_id = ?1 AND version = ?9",
          rusqlite::params![
            raw.record_id,
            raw.status,
            raw.payload_json,
            raw.reviewer_notes,
            raw.responder_id,
            raw.responded_at,
            raw.updated_at,
            raw.version,
            expected_version,
          ],
        )?;

        if changed == 0 {
          let exists = row_exists(&tx, "SELECT 1 FROM records WHERE record_id = ?1", &raw.record_id)?;
          return Ok(if exists { CommitOutcome::Conflict } else { CommitOutcome::Missing });
        }

        let groups = grouped_counts(&tx, &raw.kind)?;
        tx.commit()?;
        Ok(CommitOutcome::Committed(groups))
      })
      .await?;

    match outcome {
      CommitOutcome::Committed(raw) => Ok(CommitOutcome::Committed(decode_groups(raw)?)),
      CommitOutcome::Conflict => Ok(CommitOutcome::Conflict),
      CommitOutcome::Missing => Ok(CommitOutcome::Missing),
    }
  }

  async fn delete_record(
    &self,
    id: Uuid,
    expected_version: i64,
  ) -> Result<CommitOutcome<GroupedCounts>> {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let kind: Option<String> = tx
          .query_row(
            "SELECT kind FROM records WHERE record_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(kind) = kind else {
          return Ok(CommitOutcome::Missing);
        };

        let changed = tx.execute(
          "DELETE FROM records WHERE record_id = ?1 AND version = ?2",
          rusqlite::params![id_str, expected_version],
        )?;
        if changed == 0 {
          return Ok(CommitOutcome::Conflict);
        }

        let groups = grouped_counts(&tx, &kind)?;
        tx.commit()?;
        Ok(CommitOutcome::Committed(groups))
      })
      .await?;

    match outcome {
      CommitOutcome::Committed(raw) => Ok(CommitOutcome::Committed(decode_groups(raw)?)),
      CommitOutcome::Conflict => Ok(CommitOutcome::Conflict),
      CommitOutcome::Missing => Ok(CommitOutcome::Missing),
    }
  }

  // ── Admin accounts ────────────────────────────────────────────────────────

  async fn insert_admin(&self, input: NewAdmin, now: DateTime<Utc>) -> Result<AdminAccount> {
    let account = AdminAccount {
      admin_id:     Uuid::new_v4(),
      permissions:  input.resolved_permissions(),
      username:     input.username,
      display_name: input.display_name,
      role:         input.role,
      is_active:    true,
      created_at:   now,
      updated_at:   now,
      version:      0,
    };
    let raw = RawAdmin::from_account(&account)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO admin_accounts (
             admin_id, username, display_name, role, permissions_json,
             is_active, created_at, updated_at, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            raw.admin_id,
            raw.username,
            raw.display_name,
            raw.role,
            raw.permissions_json,
            raw.is_active,
            raw.created_at,
            raw.updated_at,
            raw.version,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(|err| match err {
        tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(failure, _))
          if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
          let message = format!("username {:?} is taken", account.username);
          Error::Core(amanah_core::Error::validation(message))
        }
        other => Error::Database(other),
      })?;

    debug!(admin_id = %account.admin_id, role = %account.role, "admin inserted");
    Ok(account)
  }

  async fn get_admin(&self, admin_id: Uuid) -> Result<Option<AdminAccount>> {
    let id_str = encode_uuid(admin_id);
    let sql = format!("SELECT {} FROM admin_accounts WHERE admin_id = ?1", RawAdmin::COLUMNS);

    let raw: Option<RawAdmin> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![id_str], RawAdmin::from_row).optional()?)
      })
      .await?;

    raw.map(RawAdmin::into_account).transpose()
  }

  async fn find_admin(&self, username: &str) -> Result<Option<AdminAccount>> {
    let username = username.to_owned();
    let sql = format!("SELECT {} FROM admin_accounts WHERE username = ?1", RawAdmin::COLUMNS);

    let raw: Option<RawAdmin> = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&sql, rusqlite::params![username], RawAdmin::from_row).optional()?)
      })
      .await?;

    raw.map(RawAdmin::into_account).transpose()
  }

  async fn list_admins(&self) -> Result<Vec<AdminAccount>> {
    let sql = format!(
      "SELECT {} FROM admin_accounts ORDER BY created_at ASC, admin_id ASC",
      RawAdmin::COLUMNS
    );

    let raws: Vec<RawAdmin> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawAdmin::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAdmin::into_account).collect()
  }

  async fn commit_admin(
    &self,
    next: &AdminAccount,
    expected_version: i64,
  ) -> Result<CommitOutcome<()>> {
    let raw = RawAdmin::from_account(next)?;

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE admin_accounts SET
             display_name = ?2, role = ?3, permissions_json = ?4,
             is_active = ?5, updated_at = ?6, version = ?7
           WHERE admin_id = ?1 AND version = ?8",
          rusqlite::params![
            raw.admin_id,
            raw.display_name,
            raw.role,
            raw.permissions_json,
            raw.is_active,
            raw.updated_at,
            raw.version,
            expected_version,
          ],
        )?;
        if changed > 0 {
          return Ok(CommitOutcome::Committed(()));
        }
        let exists =
          row_exists(conn, "SELECT 1 FROM admin_accounts WHERE admin_id = ?1", &raw.admin_id)?;
        Ok(if exists { CommitOutcome::Conflict } else { CommitOutcome::Missing })
      })
      .await?;

    Ok(outcome)
  }

  async fn delete_admin(&self, admin_id: Uuid, expected_version: i64) -> Result<CommitOutcome<()>> {
    let id_str = encode_uuid(admin_id);

    let outcome = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "DELETE FROM admin_accounts WHERE admin_id = ?1 AND version = ?2",
          rusqlite::params![id_str, expected_version],
        )?;
        if changed > 0 {
          return Ok(CommitOutcome::Committed(()));
        }
        let exists = row_exists(conn, "SELECT 1 FROM admin_accounts WHERE admin_id = ?1", &id_str)?;
        Ok(if exists { CommitOutcome::Conflict } else { CommitOutcome::Missing })
      })
      .await?;

    Ok(outcome)
  }
}
