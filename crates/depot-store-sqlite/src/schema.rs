//! SQL schema for the Depot SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- One row per asset document. A collection is a store; the tag is unique
-- within a collection only. Cross-collection uniqueness is the engine's job.
CREATE TABLE IF NOT EXISTS documents (
    collection  TEXT NOT NULL,
    tag         TEXT NOT NULL,
    fields      TEXT NOT NULL CHECK (json_valid(fields)),  -- JSON object
    updated_at  TEXT NOT NULL,                             -- RFC 3339 UTC
    PRIMARY KEY (collection, tag)
);

PRAGMA user_version = 1;
";

/// Merge-on-write upsert. `json_patch` overlays the new fields onto the
/// stored object, leaving unmentioned fields in place.
pub const UPSERT: &str = "
INSERT INTO documents (collection, tag, fields, updated_at)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (collection, tag) DO UPDATE SET
    fields     = json_patch(documents.fields, excluded.fields),
    updated_at = excluded.updated_at
";
