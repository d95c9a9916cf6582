//! SQL schema for the Campus Commons SQLite store.
//!
//! One table per document collection. The aggregate lives in the `doc`
//! column as JSON; the remaining columns exist only for lookup, ordering,
//! and uniqueness, and are kept in sync with the document on every write.
//! Executed once at connection startup; future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id           TEXT PRIMARY KEY,
    email             TEXT NOT NULL UNIQUE,
    google_id         TEXT UNIQUE,
    enrollment_number TEXT UNIQUE,
    role              TEXT NOT NULL,   -- 'student' | 'faculty' | 'admin'
    doc               TEXT NOT NULL,   -- full User aggregate as JSON
    created_at        TEXT NOT NULL    -- ISO 8601 UTC
);

CREATE TABLE IF NOT EXISTS content (
    content_id TEXT PRIMARY KEY,
    doc        TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS discussions (
    discussion_id TEXT PRIMARY KEY,
    doc           TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS opportunities (
    opportunity_id TEXT PRIMARY KEY,
    doc            TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS events (
    event_id   TEXT PRIMARY KEY,
    doc        TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chats (
    chat_id    TEXT PRIMARY KEY,
    is_active  INTEGER NOT NULL DEFAULT 1,
    doc        TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS users_enrollment_idx ON users(enrollment_number);
CREATE INDEX IF NOT EXISTS chats_active_idx     ON chats(is_active);

PRAGMA user_version = 1;
";
