//! CLI struct definitions for the scormkit command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use crate::plugins::attempts::AttemptsCli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "scormkit",
    version = env!("CARGO_PKG_VERSION"),
    about = "SCORM 1.2 runtime harness: replay content sessions, serve the API over JSON lines, inspect stored attempts."
)]
pub(crate) struct Cli {
    /// Config file (defaults to ./scormkit.toml when present).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Attempt database; overrides [store].db_path.
    #[clap(long, global = true)]
    pub db: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Run a JSON script of API calls against one attempt, printing one
    /// result envelope per call.
    Replay {
        /// Path to a JSON array of {"call": ..., "args": [...]} objects.
        script: PathBuf,
        #[clap(long, default_value = "local")]
        enrollment: String,
        #[clap(long, default_value = "sco-1")]
        sco: String,
    },
    /// Serve line-delimited JSON API requests on stdin, one response per line.
    Rpc,
    /// Inspect stored attempts.
    Attempts(AttemptsCli),
    /// Print the SCORM 1.2 error code table.
    Codes {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Print the subsystem schemas as JSON.
    Schema,
}
