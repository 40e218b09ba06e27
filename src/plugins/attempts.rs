//! SQLite attempt store.
//!
//! Keeps the latest CMI snapshot per (enrollment, SCO) so a relaunch resumes
//! where the learner left off. The store doubles as a [`PersistencePort`]:
//! `LMSCommit` and `LMSFinish` land here through [`AttemptStore::port`].

use crate::core::broker::{self, DbBroker};
use crate::core::cmi::CmiDocument;
use crate::core::db;
use crate::core::error;
use crate::core::persistence::{PersistKind, PersistencePort};
use crate::core::time;
use crate::plugins::player::SessionKey;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::Colorize;
use rusqlite::{OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AttemptRecord {
    pub enrollment_id: String,
    pub sco_id: String,
    pub lesson_status: String,
    pub total_time: String,
    pub snapshot_hash: String,
    pub commit_count: i64,
    pub initialized_at: Option<String>,
    pub last_commit_at: Option<String>,
    pub terminated_at: Option<String>,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmi: Option<CmiDocument>,
}

const RECORD_COLUMNS: &str = "enrollment_id, sco_id, lesson_status, total_time, snapshot_hash, \
     commit_count, initialized_at, last_commit_at, terminated_at, updated_at, cmi_data";

fn record_from_row(row: &Row<'_>, with_cmi: bool) -> rusqlite::Result<(AttemptRecord, String)> {
    let cmi_data: String = row.get(10)?;
    Ok((
        AttemptRecord {
            enrollment_id: row.get(0)?,
            sco_id: row.get(1)?,
            lesson_status: row.get(2)?,
            total_time: row.get(3)?,
            snapshot_hash: row.get(4)?,
            commit_count: row.get(5)?,
            initialized_at: row.get(6)?,
            last_commit_at: row.get(7)?,
            terminated_at: row.get(8)?,
            updated_at: row.get(9)?,
            cmi: None,
        },
        if with_cmi { cmi_data } else { String::new() },
    ))
}

#[derive(Debug, Clone)]
pub struct AttemptStore {
    db_path: PathBuf,
}

impl AttemptStore {
    /// Opens (creating if needed) the store at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, error::ScormError> {
        db::initialize_attempts_db(db_path)?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn broker(&self) -> DbBroker {
        DbBroker::new(&self.db_path)
    }

    /// Persistence port that writes this session's snapshots to the store.
    pub fn port(&self, key: SessionKey) -> Arc<dyn PersistencePort> {
        Arc::new(AttemptPort {
            store: self.clone(),
            key,
        })
    }

    /// Latest snapshot for `key`, if any attempt has been stored.
    pub fn load_snapshot(&self, key: &SessionKey) -> Result<Option<CmiDocument>, error::ScormError> {
        let raw = self
            .broker()
            .with_conn(&self.db_path, "scormkit", "attempts.load", |conn| {
                let raw: Option<String> = conn
                    .query_row(
                        "SELECT cmi_data FROM scorm_attempts WHERE enrollment_id = ?1 AND sco_id = ?2",
                        params![key.enrollment_id, key.sco_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(raw)
            })?;
        raw.map(|raw| CmiDocument::from_snapshot_json(&raw))
            .transpose()
    }

    /// Stamps the start of a new attempt. The stored snapshot is left alone
    /// when a row exists; otherwise `doc` seeds it.
    pub fn mark_initialized(&self, key: &SessionKey, doc: &CmiDocument) -> Result<(), error::ScormError> {
        let cmi_data = doc.to_snapshot_json()?;
        let hash = doc.content_hash()?;
        let now = time::now_epoch_z();

        self.broker()
            .with_conn(&self.db_path, "scormkit", "attempts.initialize", |conn| {
                conn.execute(
                    "INSERT INTO scorm_attempts (enrollment_id, sco_id, cmi_data, snapshot_hash, lesson_status, total_time, commit_count, initialized_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
                     ON CONFLICT(enrollment_id, sco_id) DO UPDATE SET
                        initialized_at = excluded.initialized_at,
                        terminated_at = NULL,
                        updated_at = excluded.updated_at",
                    params![
                        key.enrollment_id,
                        key.sco_id,
                        cmi_data,
                        hash,
                        doc.core.lesson_status,
                        doc.core.total_time,
                        now
                    ],
                )?;
                Ok(())
            })
    }

    /// Upserts the snapshot for `key`.
    ///
    /// A finished attempt is not overwritten by a commit that lands after it;
    /// only [`mark_initialized`](Self::mark_initialized) reopens the row.
    pub fn save(
        &self,
        key: &SessionKey,
        doc: &CmiDocument,
        kind: PersistKind,
    ) -> Result<(), error::ScormError> {
        let cmi_data = doc.to_snapshot_json()?;
        let hash = doc.content_hash()?;
        let now = time::now_epoch_z();
        let terminated_at = match kind {
            PersistKind::Finish => Some(now.clone()),
            PersistKind::Commit => None,
        };
        let commits: i64 = match kind {
            PersistKind::Commit => 1,
            PersistKind::Finish => 0,
        };
        let op = format!("attempts.{}", kind);

        self.broker().with_conn(&self.db_path, "scormkit", &op, |conn| {
            conn.execute(
                "INSERT INTO scorm_attempts (enrollment_id, sco_id, cmi_data, snapshot_hash, lesson_status, total_time, commit_count, last_commit_at, terminated_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?8)
                 ON CONFLICT(enrollment_id, sco_id) DO UPDATE SET
                    cmi_data = excluded.cmi_data,
                    snapshot_hash = excluded.snapshot_hash,
                    lesson_status = excluded.lesson_status,
                    total_time = excluded.total_time,
                    commit_count = scorm_attempts.commit_count + excluded.commit_count,
                    last_commit_at = excluded.last_commit_at,
                    terminated_at = COALESCE(excluded.terminated_at, scorm_attempts.terminated_at),
                    updated_at = excluded.updated_at
                 WHERE scorm_attempts.terminated_at IS NULL OR excluded.terminated_at IS NOT NULL",
                params![
                    key.enrollment_id,
                    key.sco_id,
                    cmi_data,
                    hash,
                    doc.core.lesson_status,
                    doc.core.total_time,
                    commits,
                    now,
                    terminated_at
                ],
            )?;
            Ok(())
        })?;

        debug!(session = %key, op = %kind, hash = %hash, "attempt saved");
        Ok(())
    }

    /// One attempt with its decoded snapshot.
    pub fn get(&self, key: &SessionKey) -> Result<Option<AttemptRecord>, error::ScormError> {
        let found = self
            .broker()
            .with_conn(&self.db_path, "scormkit", "attempts.show", |conn| {
                let query = format!(
                    "SELECT {} FROM scorm_attempts WHERE enrollment_id = ?1 AND sco_id = ?2",
                    RECORD_COLUMNS
                );
                let found = conn
                    .query_row(&query, params![key.enrollment_id, key.sco_id], |row| {
                        record_from_row(row, true)
                    })
                    .optional()?;
                Ok(found)
            })?;

        match found {
            Some((mut record, raw)) => {
                record.cmi = Some(CmiDocument::from_snapshot_json(&raw)?);
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Attempts, most recently updated first, optionally for one enrollment.
    pub fn list(&self, enrollment_id: Option<&str>) -> Result<Vec<AttemptRecord>, error::ScormError> {
        self.broker()
            .with_conn(&self.db_path, "scormkit", "attempts.list", |conn| {
                let query = format!(
                    "SELECT {} FROM scorm_attempts WHERE (?1 IS NULL OR enrollment_id = ?1)
                     ORDER BY updated_at DESC, enrollment_id, sco_id",
                    RECORD_COLUMNS
                );
                let mut stmt = conn.prepare(&query)?;
                let rows = stmt.query_map(params![enrollment_id], |row| {
                    record_from_row(row, false).map(|(record, _)| record)
                })?;

                let mut records = Vec::new();
                for record in rows {
                    records.push(record?);
                }
                Ok(records)
            })
    }
}

struct AttemptPort {
    store: AttemptStore,
    key: SessionKey,
}

impl AttemptPort {
    async fn persist(&self, kind: PersistKind, snapshot: CmiDocument) -> anyhow::Result<()> {
        let store = self.store.clone();
        let key = self.key.clone();
        tokio::task::spawn_blocking(move || store.save(&key, &snapshot, kind)).await??;
        Ok(())
    }
}

#[async_trait]
impl PersistencePort for AttemptPort {
    async fn on_commit(&self, snapshot: CmiDocument) -> anyhow::Result<()> {
        self.persist(PersistKind::Commit, snapshot).await
    }

    async fn on_finish(&self, snapshot: CmiDocument) -> anyhow::Result<()> {
        self.persist(PersistKind::Finish, snapshot).await
    }
}

#[derive(Parser, Debug)]
pub struct AttemptsCli {
    #[clap(subcommand)]
    pub command: AttemptsCommand,
}

#[derive(Subcommand, Debug)]
pub enum AttemptsCommand {
    /// List stored attempts, most recently updated first.
    List {
        #[clap(long)]
        enrollment: Option<String>,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Show one attempt including its CMI snapshot, as JSON.
    Show {
        #[clap(long)]
        enrollment: String,
        #[clap(long)]
        sco: String,
    },
    /// Print the store's mutation audit log.
    Audit,
}

pub fn run_attempts_cli(store: &AttemptStore, cli: AttemptsCli) -> Result<(), error::ScormError> {
    match cli.command {
        AttemptsCommand::List { enrollment, format } => {
            let records = store.list(enrollment.as_deref())?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No attempts stored.");
                return Ok(());
            }
            for record in records {
                let status = match record.lesson_status.as_str() {
                    "passed" | "completed" => record.lesson_status.green(),
                    "failed" => record.lesson_status.red(),
                    _ => record.lesson_status.yellow(),
                };
                let finished = if record.terminated_at.is_some() {
                    "finished".dimmed()
                } else {
                    "open".normal()
                };
                println!(
                    "{}  {}  {}  total={}  commits={}  {}",
                    record.enrollment_id.bold(),
                    record.sco_id,
                    status,
                    record.total_time,
                    record.commit_count,
                    finished
                );
            }
        }
        AttemptsCommand::Show { enrollment, sco } => {
            let key = SessionKey::new(enrollment, sco);
            let record = store
                .get(&key)?
                .ok_or_else(|| error::ScormError::NotFound(format!("attempt {}", key)))?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        AttemptsCommand::Audit => {
            for event in broker::read_audit_log(store.db_path())? {
                println!("{}", serde_json::to_string(&event)?);
            }
        }
    }
    Ok(())
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "attempts",
        "version": "0.1.0",
        "description": "Persisted SCORM 1.2 attempts, one CMI snapshot per enrollment and SCO",
        "commands": [
            { "name": "list", "parameters": ["enrollment", "format"] },
            { "name": "show", "parameters": ["enrollment", "sco"] },
            { "name": "audit", "parameters": [] }
        ],
        "storage": ["scormkit.db", "scormkit.events.jsonl"]
    })
}
