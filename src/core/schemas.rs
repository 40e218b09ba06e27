//! Database schema for the attempt store.
//!
//! One row per (enrollment, SCO) pair holds the latest persisted CMI
//! snapshot plus the bookkeeping columns reports read without decoding it.

pub const ATTEMPTS_DB_NAME: &str = "scormkit.db";

pub const SCORM_ATTEMPTS_DB_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS scorm_attempts (
        enrollment_id TEXT NOT NULL,
        sco_id TEXT NOT NULL,
        cmi_data TEXT NOT NULL,
        snapshot_hash TEXT NOT NULL,
        lesson_status TEXT NOT NULL,
        total_time TEXT NOT NULL,
        commit_count INTEGER NOT NULL DEFAULT 0,
        initialized_at TEXT,
        last_commit_at TEXT,
        terminated_at TEXT,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (enrollment_id, sco_id)
    )
";

pub const SCORM_ATTEMPTS_DB_SCHEMA_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_scorm_attempts_updated ON scorm_attempts(updated_at)";
