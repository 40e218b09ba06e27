//! The SCORM 1.2 CMI document: one instance per learner attempt on one course item.
//!
//! Every field is a string because the wire contract is string-typed and a
//! successful `LMSSetValue(path, v)` must hand back exactly `v` on read.
//! Every struct defaults field-by-field so a partial persisted snapshot loads.

use crate::core::error::ScormError;
use crate::core::validators;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DEFAULT_LESSON_STATUS: &str = "not attempted";
pub const DEFAULT_CREDIT: &str = "credit";
pub const DEFAULT_LESSON_MODE: &str = "normal";
pub const ZERO_TIMESPAN: &str = "00:00:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Score {
    pub raw: String,
    pub min: String,
    pub max: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreData {
    pub student_id: String,
    pub student_name: String,
    pub lesson_location: String,
    pub lesson_status: String,
    pub credit: String,
    pub entry: String,
    pub exit: String,
    pub lesson_mode: String,
    pub score: Score,
    pub total_time: String,
    pub session_time: String,
}

impl Default for CoreData {
    fn default() -> Self {
        Self {
            student_id: String::new(),
            student_name: String::new(),
            lesson_location: String::new(),
            lesson_status: DEFAULT_LESSON_STATUS.to_string(),
            credit: DEFAULT_CREDIT.to_string(),
            entry: String::new(),
            exit: String::new(),
            lesson_mode: DEFAULT_LESSON_MODE.to_string(),
            score: Score::default(),
            total_time: ZERO_TIMESPAN.to_string(),
            session_time: String::new(),
        }
    }
}

/// Values supplied by the launching context (from the course manifest).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudentData {
    pub mastery_score: String,
    pub max_time_allowed: String,
    pub time_limit_action: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StudentPreference {
    pub audio: String,
    pub language: String,
    pub speed: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Objective {
    pub id: String,
    pub status: String,
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InteractionObjective {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorrectResponse {
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Interaction {
    pub id: String,
    pub time: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub weighting: String,
    pub student_response: String,
    pub result: String,
    pub latency: String,
    pub objectives: Vec<InteractionObjective>,
    pub correct_responses: Vec<CorrectResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CmiDocument {
    pub core: CoreData,
    pub suspend_data: String,
    pub launch_data: String,
    pub comments: String,
    pub comments_from_lms: String,
    pub student_data: StudentData,
    pub student_preference: StudentPreference,
    pub objectives: Vec<Objective>,
    pub interactions: Vec<Interaction>,
}

impl CmiDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a (possibly partial) persisted snapshot.
    pub fn from_snapshot_json(raw: &str) -> Result<Self, ScormError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw).map_err(|e| {
            ScormError::ValidationError(format!("invalid CMI snapshot: {}", e))
        })
    }

    pub fn to_snapshot_json(&self) -> Result<String, ScormError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Hex sha256 of the snapshot JSON. Field order is fixed by the struct
    /// layout, so equal documents hash equally.
    pub fn content_hash(&self) -> Result<String, ScormError> {
        let bytes = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Clears the per-attempt fields so the document can seed a new attempt.
    pub fn begin_attempt(&mut self) {
        self.core.session_time.clear();
        self.core.exit.clear();
        self.core.entry.clear();
    }

    /// Lists fields whose stored value would be rejected by their validator.
    /// Snapshots come from durable storage, so offenders are reported rather
    /// than rewritten.
    pub fn audit(&self) -> Vec<String> {
        let mut findings = Vec::new();
        let core = &self.core;

        if !validators::validate_lesson_status(&core.lesson_status) {
            findings.push(format!("cmi.core.lesson_status={:?}", core.lesson_status));
        }
        if !validators::validate_credit(&core.credit) {
            findings.push(format!("cmi.core.credit={:?}", core.credit));
        }
        if !validators::validate_entry(&core.entry) {
            findings.push(format!("cmi.core.entry={:?}", core.entry));
        }
        if !validators::validate_exit(&core.exit) {
            findings.push(format!("cmi.core.exit={:?}", core.exit));
        }
        if !validators::validate_time_format(&core.total_time) {
            findings.push(format!("cmi.core.total_time={:?}", core.total_time));
        }
        if !core.session_time.is_empty() && !validators::validate_time_format(&core.session_time)
        {
            findings.push(format!("cmi.core.session_time={:?}", core.session_time));
        }
        audit_score("cmi.core.score", &core.score, &mut findings);

        for (i, objective) in self.objectives.iter().enumerate() {
            if !objective.status.is_empty()
                && !validators::validate_lesson_status(&objective.status)
            {
                findings.push(format!("cmi.objectives.{}.status={:?}", i, objective.status));
            }
            audit_score(&format!("cmi.objectives.{}.score", i), &objective.score, &mut findings);
        }

        for (i, interaction) in self.interactions.iter().enumerate() {
            if !interaction.kind.is_empty()
                && !validators::validate_interaction_type(&interaction.kind)
            {
                findings.push(format!("cmi.interactions.{}.type={:?}", i, interaction.kind));
            }
            if !interaction.result.is_empty()
                && !validators::validate_interaction_result(&interaction.result)
            {
                findings.push(format!("cmi.interactions.{}.result={:?}", i, interaction.result));
            }
        }

        findings
    }
}

fn audit_score(prefix: &str, score: &Score, findings: &mut Vec<String>) {
    for (name, value) in [("raw", &score.raw), ("min", &score.min), ("max", &score.max)] {
        if !value.is_empty() && !validators::validate_score_range(value, None, None) {
            findings.push(format!("{}.{}={:?}", prefix, name, value));
        }
    }
}
