//! Pure validation and get/set dispatch over a [`CmiDocument`].
//!
//! Nothing here knows about session state; the runtime layers the
//! initialize/finish lifecycle on top. Failures are reported as the wire
//! [`ErrorCode`] the caller should surface through `LMSGetLastError`.

use crate::core::address::{
    Access, CmiAddress, Collection, CoreField, DirectField, InteractionField, ObjectiveField,
    PreferenceField, ScoreField, StudentDataField, SyntheticKind,
};
use crate::core::cmi::{CmiDocument, CorrectResponse, Interaction, InteractionObjective, Score};
use crate::core::codes::ErrorCode;
use regex::Regex;
use std::sync::LazyLock;

pub const LESSON_STATUSES: [&str; 6] = [
    "passed",
    "completed",
    "failed",
    "incomplete",
    "browsed",
    "not attempted",
];
pub const CREDITS: [&str; 2] = ["credit", "no-credit"];
pub const ENTRIES: [&str; 3] = ["ab-initio", "resume", ""];
pub const EXITS: [&str; 4] = ["time-out", "suspend", "logout", ""];
pub const INTERACTION_TYPES: [&str; 8] = [
    "true-false",
    "choice",
    "fill-in",
    "matching",
    "performance",
    "sequencing",
    "likert",
    "numeric",
];
pub const INTERACTION_RESULTS: [&str; 4] = ["correct", "wrong", "unanticipated", "neutral"];

pub const SCORE_MIN: f64 = 0.0;
pub const SCORE_MAX: f64 = 100.0;

const STRING_255: usize = 255;
const STRING_4096: usize = 4096;

static TIMESPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2,4}):(\d{2}):(\d{2})(\.\d{1,2})?$").expect("timespan pattern")
});
static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{2}):(\d{2}):(\d{2})(\.\d{1,2})?$").expect("time-of-day pattern")
});
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?(\d+(\.\d*)?|\.\d+)$").expect("decimal pattern"));
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("integer pattern"));

/// Size limits applied on write. The defaults are the SCORM 1.2 data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CmiLimits {
    pub suspend_data_max_len: usize,
    pub max_collection_entries: usize,
}

impl Default for CmiLimits {
    fn default() -> Self {
        Self {
            suspend_data_max_len: STRING_4096,
            max_collection_entries: 256,
        }
    }
}

pub fn is_valid_element(path: &str) -> bool {
    CmiAddress::parse(path).is_valid()
}

pub fn is_read_only_element(path: &str) -> bool {
    CmiAddress::parse(path).access() == Some(Access::ReadOnly)
}

pub fn is_write_only_element(path: &str) -> bool {
    CmiAddress::parse(path).access() == Some(Access::WriteOnly)
}

/// CMITimespan: `HH:MM:SS` with an optional 1-2 digit fraction. Hours may
/// carry up to four digits; minutes and seconds must be below 60.
pub fn validate_time_format(value: &str) -> bool {
    match TIMESPAN.captures(value) {
        Some(caps) => below_sixty(&caps[2]) && below_sixty(&caps[3]),
        None => false,
    }
}

/// CMITime: a clock time, so hours stay below 24.
pub fn validate_time_of_day(value: &str) -> bool {
    match TIME_OF_DAY.captures(value) {
        Some(caps) => {
            caps[1].parse::<u32>().is_ok_and(|h| h < 24)
                && below_sixty(&caps[2])
                && below_sixty(&caps[3])
        }
        None => false,
    }
}

fn below_sixty(digits: &str) -> bool {
    digits.parse::<u32>().is_ok_and(|v| v < 60)
}

pub fn is_decimal(value: &str) -> bool {
    DECIMAL.is_match(value)
}

/// Numeric and inside `[min, max]` inclusive; bounds default to `[0, 100]`.
pub fn validate_score_range(value: &str, min: Option<f64>, max: Option<f64>) -> bool {
    if !is_decimal(value) {
        return false;
    }
    let min = min.unwrap_or(SCORE_MIN);
    let max = max.unwrap_or(SCORE_MAX);
    value
        .parse::<f64>()
        .is_ok_and(|score| score >= min && score <= max)
}

pub fn validate_lesson_status(value: &str) -> bool {
    LESSON_STATUSES.contains(&value)
}

pub fn validate_credit(value: &str) -> bool {
    CREDITS.contains(&value)
}

pub fn validate_entry(value: &str) -> bool {
    ENTRIES.contains(&value)
}

pub fn validate_exit(value: &str) -> bool {
    EXITS.contains(&value)
}

pub fn validate_interaction_type(value: &str) -> bool {
    INTERACTION_TYPES.contains(&value)
}

/// A fixed outcome keyword or a numeric result.
pub fn validate_interaction_result(value: &str) -> bool {
    INTERACTION_RESULTS.contains(&value) || is_decimal(value)
}

/// CMIIdentifier: non-empty, no whitespace, at most 255 characters.
pub fn validate_identifier(value: &str) -> bool {
    !value.is_empty()
        && value.chars().count() <= STRING_255
        && !value.chars().any(char::is_whitespace)
}

fn within_len(value: &str, max: usize) -> bool {
    value.chars().count() <= max
}

/// Resolves `path` against `doc`.
///
/// Unset scalars and indices past the end of a collection read as `""`.
pub fn get_value(doc: &CmiDocument, path: &str) -> Result<String, ErrorCode> {
    let address = CmiAddress::parse(path);
    match address.access() {
        None => return Err(ErrorCode::NotImplemented),
        Some(Access::WriteOnly) => return Err(ErrorCode::WriteOnly),
        Some(_) => {}
    }

    let value = match address {
        CmiAddress::Core(field) => read_core(doc, field).to_string(),
        CmiAddress::CoreScore(field) => read_score(&doc.core.score, field).to_string(),
        CmiAddress::Direct(field) => match field {
            DirectField::SuspendData => doc.suspend_data.clone(),
            DirectField::LaunchData => doc.launch_data.clone(),
            DirectField::Comments => doc.comments.clone(),
            DirectField::CommentsFromLms => doc.comments_from_lms.clone(),
        },
        CmiAddress::StudentData(field) => match field {
            StudentDataField::MasteryScore => doc.student_data.mastery_score.clone(),
            StudentDataField::MaxTimeAllowed => doc.student_data.max_time_allowed.clone(),
            StudentDataField::TimeLimitAction => doc.student_data.time_limit_action.clone(),
        },
        CmiAddress::StudentPreference(field) => {
            let pref = &doc.student_preference;
            match field {
                PreferenceField::Audio => pref.audio.clone(),
                PreferenceField::Language => pref.language.clone(),
                PreferenceField::Speed => pref.speed.clone(),
                PreferenceField::Text => pref.text.clone(),
            }
        }
        CmiAddress::Objective { index, field } => match doc.objectives.get(index) {
            Some(objective) => match field {
                ObjectiveField::Id => objective.id.clone(),
                ObjectiveField::Status => objective.status.clone(),
                ObjectiveField::Score(score) => read_score(&objective.score, score).to_string(),
            },
            None => String::new(),
        },
        CmiAddress::Synthetic { collection, kind } => read_synthetic(doc, collection, kind),
        CmiAddress::Interaction { index, field } => doc
            .interactions
            .get(index)
            .map(|interaction| read_interaction(interaction, field))
            .unwrap_or_default(),
        CmiAddress::Invalid => return Err(ErrorCode::NotImplemented),
    };
    Ok(value)
}

fn read_core(doc: &CmiDocument, field: CoreField) -> &str {
    let core = &doc.core;
    match field {
        CoreField::StudentId => &core.student_id,
        CoreField::StudentName => &core.student_name,
        CoreField::LessonLocation => &core.lesson_location,
        CoreField::Credit => &core.credit,
        CoreField::LessonStatus => &core.lesson_status,
        CoreField::Entry => &core.entry,
        CoreField::TotalTime => &core.total_time,
        CoreField::LessonMode => &core.lesson_mode,
        CoreField::Exit => &core.exit,
        CoreField::SessionTime => &core.session_time,
    }
}

/// Sub-entries past the end read as blank, like missing interactions.
fn read_interaction(interaction: &Interaction, field: InteractionField) -> String {
    match field {
        InteractionField::Id => interaction.id.clone(),
        InteractionField::Time => interaction.time.clone(),
        InteractionField::Type => interaction.kind.clone(),
        InteractionField::Weighting => interaction.weighting.clone(),
        InteractionField::StudentResponse => interaction.student_response.clone(),
        InteractionField::Result => interaction.result.clone(),
        InteractionField::Latency => interaction.latency.clone(),
        InteractionField::ObjectiveId(sub) => interaction
            .objectives
            .get(sub)
            .map(|objective| objective.id.clone())
            .unwrap_or_default(),
        InteractionField::CorrectResponsePattern(sub) => interaction
            .correct_responses
            .get(sub)
            .map(|response| response.pattern.clone())
            .unwrap_or_default(),
    }
}

fn read_score(score: &Score, field: ScoreField) -> &str {
    match field {
        ScoreField::Raw => &score.raw,
        ScoreField::Min => &score.min,
        ScoreField::Max => &score.max,
    }
}

fn read_synthetic(doc: &CmiDocument, collection: Collection, kind: SyntheticKind) -> String {
    match kind {
        SyntheticKind::Children => collection.children().unwrap_or_default().to_string(),
        SyntheticKind::Count => {
            let count = match collection {
                Collection::Objectives => Some(doc.objectives.len()),
                Collection::Interactions => Some(doc.interactions.len()),
                Collection::InteractionObjectives(i) => Some(
                    doc.interactions
                        .get(i)
                        .map_or(0, |it| it.objectives.len()),
                ),
                Collection::InteractionCorrectResponses(i) => Some(
                    doc.interactions
                        .get(i)
                        .map_or(0, |it| it.correct_responses.len()),
                ),
                _ => None,
            };
            count.map(|c| c.to_string()).unwrap_or_default()
        }
    }
}

/// [`set_value_with_limits`] using the SCORM 1.2 default limits.
pub fn set_value(doc: &mut CmiDocument, path: &str, value: &str) -> Result<(), ErrorCode> {
    set_value_with_limits(doc, path, value, &CmiLimits::default())
}

/// Validates `value` for `path` and writes it, creating collection entries up
/// to the addressed index. On any error `doc` is left untouched.
pub fn set_value_with_limits(
    doc: &mut CmiDocument,
    path: &str,
    value: &str,
    limits: &CmiLimits,
) -> Result<(), ErrorCode> {
    let address = CmiAddress::parse(path);
    match address.access() {
        None => return Err(ErrorCode::NotImplemented),
        Some(Access::ReadOnly) => return Err(ErrorCode::ReadOnly),
        Some(_) => {}
    }
    check_value(&address, value, limits)?;
    write_value(doc, address, value);
    Ok(())
}

/// Format/range rule for a writable element.
fn check_value(address: &CmiAddress, value: &str, limits: &CmiLimits) -> Result<(), ErrorCode> {
    let ok = |valid: bool| {
        if valid {
            Ok(())
        } else {
            Err(ErrorCode::IncorrectDataType)
        }
    };

    match *address {
        CmiAddress::Core(field) => match field {
            CoreField::LessonStatus => ok(validate_lesson_status(value)),
            CoreField::Exit => ok(validate_exit(value)),
            CoreField::SessionTime | CoreField::TotalTime => ok(validate_time_format(value)),
            CoreField::Credit => ok(validate_credit(value)),
            CoreField::Entry => ok(validate_entry(value)),
            CoreField::LessonLocation => ok(within_len(value, STRING_255)),
            CoreField::StudentId | CoreField::StudentName | CoreField::LessonMode => Ok(()),
        },
        CmiAddress::CoreScore(_) => check_score(value),
        CmiAddress::Direct(field) => match field {
            DirectField::SuspendData => ok(within_len(value, limits.suspend_data_max_len)),
            DirectField::Comments => ok(within_len(value, STRING_4096)),
            DirectField::LaunchData | DirectField::CommentsFromLms => Ok(()),
        },
        CmiAddress::StudentPreference(field) => match field {
            PreferenceField::Audio => check_integer(value, -1, 100),
            PreferenceField::Speed => check_integer(value, -100, 100),
            PreferenceField::Text => check_integer(value, -1, 1),
            PreferenceField::Language => ok(within_len(value, STRING_255)),
        },
        CmiAddress::Objective { index, field } => {
            check_index(index, limits)?;
            match field {
                ObjectiveField::Id => ok(validate_identifier(value)),
                ObjectiveField::Status => ok(validate_lesson_status(value)),
                ObjectiveField::Score(_) => check_score(value),
            }
        }
        CmiAddress::Interaction { index, field } => {
            check_index(index, limits)?;
            match field {
                InteractionField::Id => ok(validate_identifier(value)),
                InteractionField::Time => ok(validate_time_of_day(value)),
                InteractionField::Type => ok(validate_interaction_type(value)),
                InteractionField::Weighting => ok(is_decimal(value)),
                InteractionField::StudentResponse => ok(within_len(value, STRING_255)),
                InteractionField::Result => ok(validate_interaction_result(value)),
                InteractionField::Latency => ok(validate_time_format(value)),
                InteractionField::ObjectiveId(sub) => {
                    check_index(sub, limits)?;
                    ok(validate_identifier(value))
                }
                InteractionField::CorrectResponsePattern(sub) => {
                    check_index(sub, limits)?;
                    ok(within_len(value, STRING_255))
                }
            }
        }
        CmiAddress::StudentData(_) | CmiAddress::Synthetic { .. } => Err(ErrorCode::ReadOnly),
        CmiAddress::Invalid => Err(ErrorCode::NotImplemented),
    }
}

/// Every score element must be a decimal in `[0, 100]`.
fn check_score(value: &str) -> Result<(), ErrorCode> {
    if validate_score_range(value, None, None) {
        Ok(())
    } else {
        Err(ErrorCode::ValueOutOfRange)
    }
}

fn check_integer(value: &str, min: i64, max: i64) -> Result<(), ErrorCode> {
    if !INTEGER.is_match(value) {
        return Err(ErrorCode::IncorrectDataType);
    }
    match value.parse::<i64>() {
        Ok(v) if v >= min && v <= max => Ok(()),
        _ => Err(ErrorCode::ValueOutOfRange),
    }
}

fn check_index(index: usize, limits: &CmiLimits) -> Result<(), ErrorCode> {
    if index < limits.max_collection_entries {
        Ok(())
    } else {
        Err(ErrorCode::ValueOutOfRange)
    }
}

/// Only called after `check_value` accepted the write.
fn write_value(doc: &mut CmiDocument, address: CmiAddress, value: &str) {
    let value = value.to_string();
    match address {
        CmiAddress::Core(field) => {
            let core = &mut doc.core;
            let slot = match field {
                CoreField::StudentId => &mut core.student_id,
                CoreField::StudentName => &mut core.student_name,
                CoreField::LessonLocation => &mut core.lesson_location,
                CoreField::Credit => &mut core.credit,
                CoreField::LessonStatus => &mut core.lesson_status,
                CoreField::Entry => &mut core.entry,
                CoreField::TotalTime => &mut core.total_time,
                CoreField::LessonMode => &mut core.lesson_mode,
                CoreField::Exit => &mut core.exit,
                CoreField::SessionTime => &mut core.session_time,
            };
            *slot = value;
        }
        CmiAddress::CoreScore(field) => *score_slot(&mut doc.core.score, field) = value,
        CmiAddress::Direct(field) => {
            let slot = match field {
                DirectField::SuspendData => &mut doc.suspend_data,
                DirectField::LaunchData => &mut doc.launch_data,
                DirectField::Comments => &mut doc.comments,
                DirectField::CommentsFromLms => &mut doc.comments_from_lms,
            };
            *slot = value;
        }
        CmiAddress::StudentPreference(field) => {
            let pref = &mut doc.student_preference;
            let slot = match field {
                PreferenceField::Audio => &mut pref.audio,
                PreferenceField::Language => &mut pref.language,
                PreferenceField::Speed => &mut pref.speed,
                PreferenceField::Text => &mut pref.text,
            };
            *slot = value;
        }
        CmiAddress::Objective { index, field } => {
            let objective = entry_at(&mut doc.objectives, index);
            match field {
                ObjectiveField::Id => objective.id = value,
                ObjectiveField::Status => objective.status = value,
                ObjectiveField::Score(score) => *score_slot(&mut objective.score, score) = value,
            }
        }
        CmiAddress::Interaction { index, field } => {
            let interaction: &mut Interaction = entry_at(&mut doc.interactions, index);
            match field {
                InteractionField::Id => interaction.id = value,
                InteractionField::Time => interaction.time = value,
                InteractionField::Type => interaction.kind = value,
                InteractionField::Weighting => interaction.weighting = value,
                InteractionField::StudentResponse => interaction.student_response = value,
                InteractionField::Result => interaction.result = value,
                InteractionField::Latency => interaction.latency = value,
                InteractionField::ObjectiveId(sub) => {
                    let objective: &mut InteractionObjective =
                        entry_at(&mut interaction.objectives, sub);
                    objective.id = value;
                }
                InteractionField::CorrectResponsePattern(sub) => {
                    let response: &mut CorrectResponse =
                        entry_at(&mut interaction.correct_responses, sub);
                    response.pattern = value;
                }
            }
        }
        CmiAddress::StudentData(_) | CmiAddress::Synthetic { .. } | CmiAddress::Invalid => {}
    }
}

fn score_slot(score: &mut Score, field: ScoreField) -> &mut String {
    match field {
        ScoreField::Raw => &mut score.raw,
        ScoreField::Min => &mut score.min,
        ScoreField::Max => &mut score.max,
    }
}

fn entry_at<T: Default>(items: &mut Vec<T>, index: usize) -> &mut T {
    if items.len() <= index {
        items.resize_with(index + 1, T::default);
    }
    &mut items[index]
}
