//! Player sessions.
//!
//! A learning platform runs one runtime per (enrollment, SCO) launch. The
//! registry opens sessions from the attempt store, meters each one against the
//! `[player]` rate limits, and drains its persistence on close.

use crate::core::api::ApiFunction;
use crate::core::codes::ErrorCode;
use crate::core::config::{PlayerConfig, ScormkitConfig};
use crate::core::error;
use crate::core::persistence::PersistenceObserver;
use crate::core::runtime::{Scorm12Runtime, SessionState};
use crate::plugins::attempts::AttemptStore;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub enrollment_id: String,
    pub sco_id: String,
}

impl SessionKey {
    pub fn new(enrollment_id: impl Into<String>, sco_id: impl Into<String>) -> Self {
        Self {
            enrollment_id: enrollment_id.into(),
            sco_id: sco_id.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.enrollment_id, self.sco_id)
    }
}

/// Fixed one-minute window counters. Error accessors are never metered.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limits: PlayerConfig,
    window_start: Option<Instant>,
    api_calls: u32,
    commits: u32,
    set_values: u32,
}

impl RateLimiter {
    pub fn new(limits: PlayerConfig) -> Self {
        Self {
            limits,
            window_start: None,
            api_calls: 0,
            commits: 0,
            set_values: 0,
        }
    }

    /// Counts `function` against the window containing `now`, or refuses it.
    /// Refused calls are not counted.
    pub fn admit(&mut self, function: ApiFunction, now: Instant) -> bool {
        let expired = match self.window_start {
            Some(start) => now.saturating_duration_since(start) >= RATE_WINDOW,
            None => true,
        };
        if expired {
            self.window_start = Some(now);
            self.api_calls = 0;
            self.commits = 0;
            self.set_values = 0;
        }

        if self.api_calls >= self.limits.api_calls_per_minute {
            return false;
        }
        if function.is_set_value() && self.set_values >= self.limits.set_values_per_minute {
            return false;
        }
        if function.is_commit() && self.commits >= self.limits.commits_per_minute {
            return false;
        }

        self.api_calls += 1;
        if function.is_set_value() {
            self.set_values += 1;
        }
        if function.is_commit() {
            self.commits += 1;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub enrollment_id: String,
    pub sco_id: String,
    pub api_calls: u64,
    pub rejected_calls: u64,
    pub duration_ms: u64,
    pub state: SessionState,
}

pub struct PlayerSession {
    key: SessionKey,
    runtime: Scorm12Runtime,
    limiter: RateLimiter,
    opened_at: Instant,
    api_calls: u64,
    rejected_calls: u64,
}

impl PlayerSession {
    pub fn new(key: SessionKey, runtime: Scorm12Runtime, limits: PlayerConfig) -> Self {
        Self {
            key,
            runtime,
            limiter: RateLimiter::new(limits),
            opened_at: Instant::now(),
            api_calls: 0,
            rejected_calls: 0,
        }
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn runtime(&self) -> &Scorm12Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Scorm12Runtime {
        &mut self.runtime
    }

    pub fn call(&mut self, name: &str, args: &[&str]) -> String {
        self.call_at(name, args, Instant::now())
    }

    /// [`call`](Self::call) with an explicit clock reading for the limiter.
    pub fn call_at(&mut self, name: &str, args: &[&str], now: Instant) -> String {
        let Some(function) = ApiFunction::from_name(name) else {
            self.api_calls += 1;
            return self.runtime.invoke_by_name(name, args);
        };

        if !function.is_error_accessor() && !self.limiter.admit(function, now) {
            self.rejected_calls += 1;
            warn!(session = %self.key, call = %function, "rate limit exceeded");
            self.runtime.reject(ErrorCode::GeneralException);
            return function.refusal().to_string();
        }

        self.api_calls += 1;
        self.runtime.invoke(function, args)
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            enrollment_id: self.key.enrollment_id.clone(),
            sco_id: self.key.sco_id.clone(),
            api_calls: self.api_calls,
            rejected_calls: self.rejected_calls,
            duration_ms: millis_saturating(self.opened_at.elapsed()),
            state: self.runtime.state(),
        }
    }
}

/// Open sessions by key, each wired to the attempt store.
pub struct SessionRegistry {
    store: AttemptStore,
    config: ScormkitConfig,
    observer: Option<PersistenceObserver>,
    sessions: FxHashMap<SessionKey, PlayerSession>,
}

impl SessionRegistry {
    pub fn new(store: AttemptStore, config: ScormkitConfig) -> Self {
        Self {
            store,
            config,
            observer: None,
            sessions: FxHashMap::default(),
        }
    }

    pub fn with_observer(mut self, observer: PersistenceObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn store(&self) -> &AttemptStore {
        &self.store
    }

    /// Starts a session for `key`, resuming from the stored snapshot if one
    /// exists. Fails if the key is already open.
    pub fn open(&mut self, key: SessionKey) -> Result<&mut PlayerSession, error::ScormError> {
        if self.sessions.contains_key(&key) {
            return Err(error::ScormError::ValidationError(format!(
                "session {} is already open",
                key
            )));
        }

        let snapshot = self.store.load_snapshot(&key)?;
        let resumed = snapshot.is_some();
        let mut runtime = Scorm12Runtime::new(snapshot, self.store.port(key.clone()))
            .with_config(self.config.runtime.clone());
        if let Some(observer) = &self.observer {
            runtime = runtime.with_observer(Arc::clone(observer));
        }
        self.store.mark_initialized(&key, runtime.cmi())?;

        info!(session = %key, resumed, "session opened");
        let session = PlayerSession::new(key.clone(), runtime, self.config.player.clone());
        Ok(self.sessions.entry(key).or_insert(session))
    }

    pub fn open_or_get(&mut self, key: SessionKey) -> Result<&mut PlayerSession, error::ScormError> {
        if !self.sessions.contains_key(&key) {
            return self.open(key);
        }
        self.sessions
            .get_mut(&key)
            .ok_or_else(|| error::ScormError::NotFound(format!("session {}", key)))
    }

    pub fn get_mut(&mut self, key: &SessionKey) -> Option<&mut PlayerSession> {
        self.sessions.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Removes the session and waits for its pending snapshot writes.
    pub async fn close(&mut self, key: &SessionKey) -> Result<SessionStats, error::ScormError> {
        let mut session = self
            .sessions
            .remove(key)
            .ok_or_else(|| error::ScormError::NotFound(format!("session {}", key)))?;
        session.runtime.drain_persistence().await;

        let stats = session.stats();
        info!(
            session = %key,
            api_calls = stats.api_calls,
            rejected = stats.rejected_calls,
            duration_ms = stats.duration_ms,
            "session closed"
        );
        Ok(stats)
    }

    pub async fn close_all(&mut self) -> Vec<SessionStats> {
        let keys: Vec<SessionKey> = self.sessions.keys().cloned().collect();
        let mut closed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Ok(stats) = self.close(&key).await {
                closed.push(stats);
            }
        }
        closed
    }
}

pub fn schema() -> serde_json::Value {
    serde_json::json!({
        "name": "player",
        "version": "0.1.0",
        "description": "Rate-limited SCORM 1.2 sessions keyed by enrollment and SCO",
        "commands": [
            { "name": "replay", "parameters": ["script", "enrollment", "sco"] },
            { "name": "rpc", "parameters": [] }
        ],
        "limits": ["api_calls_per_minute", "commits_per_minute", "set_values_per_minute"]
    })
}

fn millis_saturating(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}
