//! Core of the SCORM 1.2 runtime: the CMI data model, its element grammar and
//! validators, the session state machine, and the persistence port.
//!
//! Nothing here knows about sessions keyed by learner or about the CLI; those
//! live in `plugins`.

pub mod address;
pub mod api;
pub mod broker;
pub mod cmi;
pub mod codes;
pub mod config;
pub mod db;
pub mod error;
pub mod persistence;
pub mod runtime;
pub mod sanitize;
pub mod schemas;
pub mod time;
pub mod timespan;
pub mod validators;
