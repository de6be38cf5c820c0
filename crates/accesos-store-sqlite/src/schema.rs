//! SQL schema for the portal's SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS offices (
    office_id   TEXT PRIMARY KEY,
    name        TEXT NOT NULL
);

-- Catalog entries are never deleted; rowid order is catalog order.
CREATE TABLE IF NOT EXISTS systems (
    system_id       TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    code            TEXT NOT NULL UNIQUE,
    applies_alta    INTEGER NOT NULL,
    applies_baja    INTEGER NOT NULL,
    requires_detail INTEGER NOT NULL,
    enabled         INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS persons (
    person_id    TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    document     TEXT NOT NULL UNIQUE,
    job_title    TEXT NOT NULL,
    office_id    TEXT NOT NULL,
    role         TEXT,            -- 'OGA' | 'USEI' | 'ETIC' | 'JEFE_ETIC'
    status       TEXT NOT NULL,   -- 'ACTIVO' | 'INACTIVO'
    entitlements TEXT NOT NULL DEFAULT '[]',  -- JSON array of system ids
    version      INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS requests (
    request_id          TEXT PRIMARY KEY,
    created_at          TEXT NOT NULL,   -- RFC 3339 UTC
    kind                TEXT NOT NULL,   -- 'ALTA' | 'BAJA' | 'MODIFICACION'
    target              TEXT NOT NULL,   -- JSON TargetSubject snapshot
    requester_id        TEXT NOT NULL,
    status              TEXT NOT NULL,   -- canonical status string
    reason              TEXT,
    supporting_document TEXT,
    version             INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS line_items (
    line_item_id    TEXT PRIMARY KEY,
    request_id      TEXT NOT NULL REFERENCES requests(request_id),
    position        INTEGER NOT NULL,
    system_id       TEXT NOT NULL,
    system_name     TEXT NOT NULL,   -- copied at creation time
    requires_detail INTEGER NOT NULL,
    detail          TEXT,
    status          TEXT NOT NULL    -- 'PENDIENTE' | 'COMPLETADO'
);

CREATE INDEX IF NOT EXISTS requests_requester_idx ON requests(requester_id);
CREATE INDEX IF NOT EXISTS requests_created_idx   ON requests(created_at);
CREATE INDEX IF NOT EXISTS line_items_request_idx ON line_items(request_id);

PRAGMA user_version = 1;
";
