//! SCORM 1.2 session runtime.
//!
//! One [`Scorm12Runtime`] owns one CMI document for one attempt. Calls never
//! fail with a Rust error: each reports success as a bool/string and records
//! a wire code that content reads back through `LMSGetLastError`.

use crate::core::cmi::{self, CmiDocument};
use crate::core::codes::{self, ErrorCode};
use crate::core::config::RuntimeConfig;
use crate::core::persistence::{
    PersistKind, PersistenceDispatcher, PersistenceObserver, PersistencePort,
};
use crate::core::sanitize;
use crate::core::timespan;
use crate::core::validators;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotInitialized,
    Initialized,
    /// `LMSFinish` succeeded; only `reset` starts another attempt.
    Terminated,
}

pub struct Scorm12Runtime {
    cmi: CmiDocument,
    state: SessionState,
    last_error: ErrorCode,
    config: RuntimeConfig,
    persistence: PersistenceDispatcher,
}

impl Scorm12Runtime {
    /// Builds a runtime for a new attempt, optionally resuming from a
    /// persisted snapshot.
    pub fn new(snapshot: Option<CmiDocument>, port: Arc<dyn PersistencePort>) -> Self {
        Self {
            cmi: load_document(snapshot),
            state: SessionState::NotInitialized,
            last_error: ErrorCode::NoError,
            config: RuntimeConfig::default(),
            persistence: PersistenceDispatcher::new(port),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_observer(mut self, observer: PersistenceObserver) -> Self {
        self.persistence.set_observer(observer);
        self
    }

    /// Spawn persistence calls on `handle` instead of the ambient runtime.
    pub fn with_executor(mut self, handle: Handle) -> Self {
        self.persistence.set_executor(handle);
        self
    }

    /// Starts a new attempt in place. In-flight persistence calls keep running.
    pub fn reset(&mut self, snapshot: Option<CmiDocument>) {
        self.cmi = load_document(snapshot);
        self.state = SessionState::NotInitialized;
        self.last_error = ErrorCode::NoError;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cmi(&self) -> &CmiDocument {
        &self.cmi
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn initialize(&mut self) -> bool {
        if self.state != SessionState::NotInitialized {
            debug!(state = ?self.state, "initialize rejected");
            return self.fail(ErrorCode::GeneralException);
        }

        self.cmi.core.entry = if self.cmi.core.lesson_status == cmi::DEFAULT_LESSON_STATUS {
            "ab-initio".to_string()
        } else {
            "resume".to_string()
        };
        self.state = SessionState::Initialized;
        info!(entry = %self.cmi.core.entry, "session initialized");
        self.succeed()
    }

    pub fn finish(&mut self) -> bool {
        if self.state != SessionState::Initialized {
            return self.fail(ErrorCode::NotInitialized);
        }

        self.accumulate_session_time();
        // Port failures are logged and observed, never surfaced to content.
        let _ = self
            .persistence
            .dispatch(PersistKind::Finish, self.cmi.clone());
        self.state = SessionState::Terminated;
        info!(total_time = %self.cmi.core.total_time, "session finished");
        self.succeed()
    }

    pub fn get_value(&mut self, element: &str) -> String {
        if self.state != SessionState::Initialized {
            self.fail(ErrorCode::NotInitialized);
            return String::new();
        }
        match validators::get_value(&self.cmi, element) {
            Ok(value) => {
                self.succeed();
                value
            }
            Err(code) => {
                debug!(element, code = %code, "get rejected");
                self.fail(code);
                String::new()
            }
        }
    }

    pub fn set_value(&mut self, element: &str, value: &str) -> bool {
        if self.state != SessionState::Initialized {
            return self.fail(ErrorCode::NotInitialized);
        }

        let cleaned;
        let value = if self.config.sanitize_values {
            cleaned = sanitize::sanitize_value(value);
            cleaned.as_str()
        } else {
            value
        };

        let limits = self.config.limits();
        match validators::set_value_with_limits(&mut self.cmi, element, value, &limits) {
            Ok(()) => {
                debug!(element, "set accepted");
                self.succeed()
            }
            Err(code) => {
                debug!(element, code = %code, "set rejected");
                self.fail(code)
            }
        }
    }

    pub fn commit(&mut self) -> bool {
        if self.state != SessionState::Initialized {
            return self.fail(ErrorCode::NotInitialized);
        }
        match self
            .persistence
            .dispatch(PersistKind::Commit, self.cmi.clone())
        {
            Ok(()) => {
                debug!("commit dispatched");
                self.succeed()
            }
            Err(_) => self.fail(ErrorCode::CommitFailure),
        }
    }

    pub fn last_error(&self) -> ErrorCode {
        self.last_error
    }

    pub fn error_string(&self, code: &str) -> &'static str {
        codes::error_string(code)
    }

    /// Diagnostic for `code`; a blank code means the last error.
    pub fn diagnostic(&self, code: &str) -> String {
        if code.trim().is_empty() {
            codes::diagnostic(self.last_error.as_str())
        } else {
            codes::diagnostic(code)
        }
    }

    /// Records `code` as the outcome of a call rejected before reaching the
    /// runtime (unknown function name, rate limit).
    pub(crate) fn reject(&mut self, code: ErrorCode) {
        self.last_error = code;
    }

    /// Persistence calls dispatched and not yet finished.
    pub fn pending_persistence(&self) -> usize {
        self.persistence.pending()
    }

    /// Awaits every in-flight persistence call. For host shutdown.
    pub async fn drain_persistence(&mut self) {
        self.persistence.drain().await;
    }

    fn accumulate_session_time(&mut self) {
        let core = &mut self.cmi.core;
        if core.session_time.is_empty() {
            return;
        }
        match timespan::add_timespans(&core.total_time, &core.session_time) {
            Some(total) => core.total_time = total,
            None => warn!(
                total_time = %core.total_time,
                session_time = %core.session_time,
                "could not accumulate session time"
            ),
        }
    }

    fn succeed(&mut self) -> bool {
        self.last_error = ErrorCode::NoError;
        true
    }

    fn fail(&mut self, code: ErrorCode) -> bool {
        self.last_error = code;
        false
    }
}

fn load_document(snapshot: Option<CmiDocument>) -> CmiDocument {
    let mut cmi = snapshot.unwrap_or_default();
    cmi.begin_attempt();
    for finding in cmi.audit() {
        warn!(field = %finding, "snapshot value fails validation");
    }
    cmi
}
