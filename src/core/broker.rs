use crate::core::db;
use crate::core::error;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Single entry point for attempt-store mutations.
///
/// Every operation runs under one process-wide lock on a fresh connection and
/// leaves a line in a JSONL audit log next to the database, so overlapping
/// persistence tasks land one after another.
pub struct DbBroker {
    audit_log_path: PathBuf,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BrokerEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub db_id: String,
    pub status: String,
}

/// `attempts.db` logs to `attempts.events.jsonl` in the same directory.
pub fn audit_log_path(db_path: &Path) -> PathBuf {
    db_path.with_extension("events.jsonl")
}

impl DbBroker {
    pub fn new(db_path: &Path) -> Self {
        Self {
            audit_log_path: audit_log_path(db_path),
        }
    }

    /// Execute a closure with a serialized connection to the specified DB.
    pub fn with_conn<F, R>(
        &self,
        db_path: &Path,
        actor: &str,
        op_name: &str,
        f: F,
    ) -> Result<R, error::ScormError>
    where
        F: FnOnce(&Connection) -> Result<R, error::ScormError>,
    {
        static DB_LOCK: Mutex<()> = Mutex::new(());
        let _lock = DB_LOCK
            .lock()
            .map_err(|_| error::ScormError::ValidationError("attempt store lock poisoned".into()))?;

        let db_id = db_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        let conn = db::db_connect(db_path)?;

        let result = f(&conn);

        let status = if result.is_ok() { "success" } else { "error" };
        self.log_event(actor, op_name, &db_id, status)?;

        result
    }

    fn log_event(
        &self,
        actor: &str,
        op: &str,
        db_id: &str,
        status: &str,
    ) -> Result<(), error::ScormError> {
        let ev = BrokerEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: actor.to_string(),
            op: op.to_string(),
            db_id: db_id.to_string(),
            status: status.to_string(),
        };

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.audit_log_path)
            .map_err(error::ScormError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(&ev)?).map_err(error::ScormError::IoError)?;
        Ok(())
    }
}

/// Reads the audit log, oldest first. A missing log is empty.
pub fn read_audit_log(db_path: &Path) -> Result<Vec<BrokerEvent>, error::ScormError> {
    let path = audit_log_path(db_path);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = std::fs::read_to_string(&path).map_err(error::ScormError::IoError)?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str(line).map_err(error::ScormError::from))
        .collect()
}
