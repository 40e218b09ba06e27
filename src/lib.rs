//! scormkit: a SCORM 1.2 runtime.
//!
//! Course content talks to its host through eight API functions
//! (`LMSInitialize`, `LMSGetValue`, `LMSSetValue`, ...). This crate
//! implements that API over a validated CMI data model and hands committed
//! snapshots to the host through an async persistence port.
//!
//! # Embedding
//!
//! ```no_run
//! use scormkit::core::persistence::CallbackPersistence;
//! use scormkit::core::runtime::Scorm12Runtime;
//! use std::sync::Arc;
//!
//! # async fn demo() {
//! let port = CallbackPersistence::new(
//!     |snapshot| async move {
//!         println!("commit: {}", snapshot.core.lesson_status);
//!         anyhow::Ok(())
//!     },
//!     |_snapshot| async move { anyhow::Ok(()) },
//! );
//! let mut runtime = Scorm12Runtime::new(None, Arc::new(port));
//! runtime.initialize();
//! runtime.set_value("cmi.core.lesson_status", "completed");
//! runtime.commit();
//! runtime.drain_persistence().await;
//! # }
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: CMI model, element grammar, validators, runtime, persistence port
//! - [`plugins`]: SQLite attempt store, player sessions, replay / rpc harness

pub mod core;
pub mod plugins;
mod cli;

use crate::core::codes::ErrorCode;
use crate::core::config;
use crate::core::error;
use crate::plugins::attempts::{self, AttemptStore};
use crate::plugins::harness;
use crate::plugins::player::{self, SessionKey, SessionRegistry};
use clap::Parser;
use cli::{Cli, Command};
use colored::Colorize;
use tracing::info;

pub async fn run() -> Result<(), error::ScormError> {
    let cli = Cli::parse();
    let current_dir = std::env::current_dir()?;
    let mut config = config::load_config(cli.config.as_deref(), &current_dir)?;
    if let Some(db) = cli.db {
        config.store.db_path = db;
    }

    match cli.command {
        Command::Codes { format } => print_codes(&format)?,
        Command::Schema => {
            let schema = serde_json::json!({
                "attempts": attempts::schema(),
                "player": player::schema(),
            });
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        Command::Attempts(attempts_cli) => {
            let store = AttemptStore::open(&config.store.db_path)?;
            attempts::run_attempts_cli(&store, attempts_cli)?;
        }
        Command::Replay {
            script,
            enrollment,
            sco,
        } => {
            let raw = std::fs::read_to_string(&script)?;
            let calls = harness::parse_script(&raw)?;
            let store = AttemptStore::open(&config.store.db_path)?;
            let mut registry = SessionRegistry::new(store, config);
            let key = SessionKey::new(enrollment, sco);

            let envelopes = harness::replay(registry.open(key.clone())?, &calls);
            for envelope in &envelopes {
                println!("{}", serde_json::to_string(envelope)?);
            }
            let stats = registry.close(&key).await?;
            info!(
                session = %key,
                api_calls = stats.api_calls,
                state = ?stats.state,
                "replay complete"
            );
        }
        Command::Rpc => {
            let store = AttemptStore::open(&config.store.db_path)?;
            let mut registry = SessionRegistry::new(store, config);
            let reader = tokio::io::BufReader::new(tokio::io::stdin());
            let handled = harness::serve_rpc(&mut registry, reader, tokio::io::stdout()).await?;
            info!(requests = handled, "rpc input closed");
        }
    }
    Ok(())
}

fn print_codes(format: &str) -> Result<(), error::ScormError> {
    if format == "json" {
        let table: Vec<serde_json::Value> = ErrorCode::all()
            .iter()
            .map(|code| serde_json::json!({ "code": code.as_str(), "message": code.message() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    for code in ErrorCode::all() {
        let label = if code.is_error() {
            code.as_str().yellow().bold()
        } else {
            code.as_str().green().bold()
        };
        println!("{:>3}  {}", label, code.message());
    }
    Ok(())
}
