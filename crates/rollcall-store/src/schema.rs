//! SQL schema for the rollcall SQLite store.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS identities (
    identity_id  TEXT PRIMARY KEY,
    code         TEXT NOT NULL UNIQUE,   -- external human-readable code
    display_name TEXT NOT NULL,
    active       INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL           -- ISO 8601 UTC
);

-- At most one template per identity; re-enrollment replaces the row.
CREATE TABLE IF NOT EXISTS face_templates (
    identity_id     TEXT PRIMARY KEY REFERENCES identities(identity_id),
    descriptor_json TEXT NOT NULL,       -- JSON array of floats
    evidence_ref    TEXT,                -- representative enrollment image
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS attendance (
    record_id          TEXT PRIMARY KEY,
    identity_id        TEXT NOT NULL REFERENCES identities(identity_id),
    day                TEXT NOT NULL,    -- local calendar day, YYYY-MM-DD
    check_in           TEXT NOT NULL,    -- ISO 8601 UTC
    check_in_evidence  TEXT,
    check_out          TEXT,             -- NULL while the record is open
    check_out_evidence TEXT,
    status             TEXT NOT NULL,    -- decided at check-in, never recomputed
    location           TEXT,
    notes              TEXT
);

-- At most one open record per identity per day. Concurrent check-in
-- attempts race on this index; the loser sees a constraint violation.
CREATE UNIQUE INDEX IF NOT EXISTS attendance_open_idx
    ON attendance(identity_id, day) WHERE check_out IS NULL;

CREATE INDEX IF NOT EXISTS attendance_identity_day_idx
    ON attendance(identity_id, day);

PRAGMA user_version = 1;
";
