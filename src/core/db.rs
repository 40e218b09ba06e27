use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use rusqlite::Connection;
use std::fs;
use std::path::Path;

pub fn db_connect(db_path: &Path) -> Result<Connection, error::ScormError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::ScormError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::ScormError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::ScormError::RusqliteError)?;
    Ok(conn)
}

/// Creates the attempt table (and the directory holding it) if missing.
pub fn initialize_attempts_db(db_path: &Path) -> Result<(), error::ScormError> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(error::ScormError::IoError)?;
    }

    let broker = DbBroker::new(db_path);
    broker.with_conn(db_path, "scormkit", "attempts.init", |conn| {
        conn.execute(schemas::SCORM_ATTEMPTS_DB_SCHEMA, [])?;
        conn.execute(schemas::SCORM_ATTEMPTS_DB_SCHEMA_INDEX, [])?;
        Ok(())
    })?;

    tracing::debug!(db = %db_path.display(), "attempt store initialized");
    Ok(())
}
