//! Subsystems built on the core runtime: the SQLite attempt store, keyed
//! player sessions, and the replay / rpc harness.

pub mod attempts;
pub mod harness;
pub mod player;
