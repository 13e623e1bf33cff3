//! SQL schema for the Amanah SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per workflow record. Kind-specific fields live in payload_json.
CREATE TABLE IF NOT EXISTS records (
    record_id      TEXT PRIMARY KEY,
    kind           TEXT NOT NULL,   -- EntityKind, snake_case
    status         TEXT NOT NULL,   -- Status, snake_case
    payload_json   TEXT NOT NULL,   -- inner payload data only
    reviewer_notes TEXT,
    responder_id   TEXT,
    responded_at   TEXT,
    created_at     TEXT NOT NULL,   -- fixed-width RFC 3339 UTC
    updated_at     TEXT NOT NULL,
    version        INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS admin_accounts (
    admin_id         TEXT PRIMARY KEY,
    username         TEXT NOT NULL UNIQUE,
    display_name     TEXT NOT NULL,
    role             TEXT NOT NULL,
    permissions_json TEXT NOT NULL,
    is_active        INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    version          INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS records_kind_status_idx ON records(kind, status);
CREATE INDEX IF NOT EXISTS records_created_idx     ON records(created_at);

PRAGMA user_version = 1;
";
