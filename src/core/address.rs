//! Address grammar for CMI elements.
//!
//! A dotted element path such as `cmi.objectives.2.score.raw` is parsed once
//! into a [`CmiAddress`]; get/set and the access-class checks all work on the
//! parsed form, so the grammar lives in exactly one place.

/// Access class of a CMI element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Access {
    pub fn readable(self) -> bool {
        self != Access::WriteOnly
    }

    pub fn writable(self) -> bool {
        self != Access::ReadOnly
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreField {
    StudentId,
    StudentName,
    LessonLocation,
    Credit,
    LessonStatus,
    Entry,
    TotalTime,
    LessonMode,
    Exit,
    SessionTime,
}

impl CoreField {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "student_id" => CoreField::StudentId,
            "student_name" => CoreField::StudentName,
            "lesson_location" => CoreField::LessonLocation,
            "credit" => CoreField::Credit,
            "lesson_status" => CoreField::LessonStatus,
            "entry" => CoreField::Entry,
            "total_time" => CoreField::TotalTime,
            "lesson_mode" => CoreField::LessonMode,
            "exit" => CoreField::Exit,
            "session_time" => CoreField::SessionTime,
            _ => return None,
        })
    }

    fn access(self) -> Access {
        match self {
            CoreField::LessonLocation | CoreField::LessonStatus => Access::ReadWrite,
            CoreField::Exit | CoreField::SessionTime => Access::WriteOnly,
            CoreField::StudentId
            | CoreField::StudentName
            | CoreField::Credit
            | CoreField::Entry
            | CoreField::TotalTime
            | CoreField::LessonMode => Access::ReadOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Raw,
    Min,
    Max,
}

impl ScoreField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "raw" => Some(ScoreField::Raw),
            "min" => Some(ScoreField::Min),
            "max" => Some(ScoreField::Max),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectField {
    SuspendData,
    LaunchData,
    Comments,
    CommentsFromLms,
}

impl DirectField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "suspend_data" => Some(DirectField::SuspendData),
            "launch_data" => Some(DirectField::LaunchData),
            "comments" => Some(DirectField::Comments),
            "comments_from_lms" => Some(DirectField::CommentsFromLms),
            _ => None,
        }
    }

    fn access(self) -> Access {
        match self {
            DirectField::SuspendData | DirectField::Comments => Access::ReadWrite,
            DirectField::LaunchData | DirectField::CommentsFromLms => Access::ReadOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentDataField {
    MasteryScore,
    MaxTimeAllowed,
    TimeLimitAction,
}

impl StudentDataField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "mastery_score" => Some(StudentDataField::MasteryScore),
            "max_time_allowed" => Some(StudentDataField::MaxTimeAllowed),
            "time_limit_action" => Some(StudentDataField::TimeLimitAction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceField {
    Audio,
    Language,
    Speed,
    Text,
}

impl PreferenceField {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "audio" => Some(PreferenceField::Audio),
            "language" => Some(PreferenceField::Language),
            "speed" => Some(PreferenceField::Speed),
            "text" => Some(PreferenceField::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectiveField {
    Id,
    Status,
    Score(ScoreField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionField {
    Id,
    Time,
    Type,
    Weighting,
    StudentResponse,
    Result,
    Latency,
    /// `cmi.interactions.N.objectives.M.id`
    ObjectiveId(usize),
    /// `cmi.interactions.N.correct_responses.M.pattern`
    CorrectResponsePattern(usize),
}

impl InteractionField {
    fn parse_scalar(name: &str) -> Option<Self> {
        Some(match name {
            "id" => InteractionField::Id,
            "time" => InteractionField::Time,
            "type" => InteractionField::Type,
            "weighting" => InteractionField::Weighting,
            "student_response" => InteractionField::StudentResponse,
            "result" => InteractionField::Result,
            "latency" => InteractionField::Latency,
            _ => return None,
        })
    }
}

/// Container a `_children` / `_count` keyword is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Core,
    CoreScore,
    StudentData,
    StudentPreference,
    Objectives,
    ObjectiveScore(usize),
    Interactions,
    InteractionObjectives(usize),
    InteractionCorrectResponses(usize),
}

impl Collection {
    /// Comma-joined sub-fields reported by `_children`, if the container has one.
    pub fn children(self) -> Option<&'static str> {
        match self {
            Collection::Core => Some(
                "student_id,student_name,lesson_location,credit,lesson_status,entry,score,total_time,lesson_mode,exit,session_time",
            ),
            Collection::CoreScore | Collection::ObjectiveScore(_) => Some("raw,min,max"),
            Collection::StudentData => Some("mastery_score,max_time_allowed,time_limit_action"),
            Collection::StudentPreference => Some("audio,language,speed,text"),
            Collection::Objectives => Some("id,score,status"),
            Collection::Interactions => Some(
                "id,objectives,time,type,correct_responses,weighting,student_response,result,latency",
            ),
            Collection::InteractionObjectives(_) | Collection::InteractionCorrectResponses(_) => {
                None
            }
        }
    }

    fn has_count(self) -> bool {
        matches!(
            self,
            Collection::Objectives
                | Collection::Interactions
                | Collection::InteractionObjectives(_)
                | Collection::InteractionCorrectResponses(_)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticKind {
    Count,
    Children,
}

/// A parsed CMI element path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmiAddress {
    Core(CoreField),
    /// `cmi.core.score.*`
    CoreScore(ScoreField),
    Direct(DirectField),
    StudentData(StudentDataField),
    StudentPreference(PreferenceField),
    Objective { index: usize, field: ObjectiveField },
    Interaction { index: usize, field: InteractionField },
    Synthetic { collection: Collection, kind: SyntheticKind },
    Invalid,
}

impl CmiAddress {
    pub fn parse(path: &str) -> CmiAddress {
        let segments: Vec<&str> = path.split('.').collect();
        match segments.as_slice() {
            ["cmi", rest @ ..] => parse_cmi(rest).unwrap_or(CmiAddress::Invalid),
            _ => CmiAddress::Invalid,
        }
    }

    pub fn is_valid(&self) -> bool {
        *self != CmiAddress::Invalid
    }

    /// Access class, or `None` for an invalid address.
    pub fn access(&self) -> Option<Access> {
        Some(match self {
            CmiAddress::Core(field) => field.access(),
            CmiAddress::CoreScore(_) => Access::ReadWrite,
            CmiAddress::Direct(field) => field.access(),
            CmiAddress::StudentData(_) => Access::ReadOnly,
            CmiAddress::StudentPreference(_) => Access::ReadWrite,
            CmiAddress::Objective { .. } => Access::ReadWrite,
            CmiAddress::Interaction { .. } => Access::ReadWrite,
            CmiAddress::Synthetic { .. } => Access::ReadOnly,
            CmiAddress::Invalid => return None,
        })
    }
}

fn parse_cmi(rest: &[&str]) -> Option<CmiAddress> {
    match rest {
        ["core", "_children"] => Some(synthetic(Collection::Core, SyntheticKind::Children)),
        ["core", "score", "_children"] => {
            Some(synthetic(Collection::CoreScore, SyntheticKind::Children))
        }
        ["core", "score", field] => ScoreField::parse(field).map(CmiAddress::CoreScore),
        ["core", field] => CoreField::parse(field).map(CmiAddress::Core),
        ["student_data", "_children"] => {
            Some(synthetic(Collection::StudentData, SyntheticKind::Children))
        }
        ["student_data", field] => StudentDataField::parse(field).map(CmiAddress::StudentData),
        ["student_preference", "_children"] => Some(synthetic(
            Collection::StudentPreference,
            SyntheticKind::Children,
        )),
        ["student_preference", field] => {
            PreferenceField::parse(field).map(CmiAddress::StudentPreference)
        }
        ["objectives", keyword] if keyword.starts_with('_') => {
            parse_keyword(Collection::Objectives, keyword)
        }
        ["objectives", index, tail @ ..] => parse_objective(parse_index(index)?, tail),
        ["interactions", keyword] if keyword.starts_with('_') => {
            parse_keyword(Collection::Interactions, keyword)
        }
        ["interactions", index, tail @ ..] => parse_interaction(parse_index(index)?, tail),
        [field] => DirectField::parse(field).map(CmiAddress::Direct),
        _ => None,
    }
}

fn parse_objective(index: usize, tail: &[&str]) -> Option<CmiAddress> {
    let field = match tail {
        ["id"] => ObjectiveField::Id,
        ["status"] => ObjectiveField::Status,
        ["score", "_children"] => {
            return Some(synthetic(
                Collection::ObjectiveScore(index),
                SyntheticKind::Children,
            ));
        }
        ["score", field] => ObjectiveField::Score(ScoreField::parse(field)?),
        _ => return None,
    };
    Some(CmiAddress::Objective { index, field })
}

fn parse_interaction(index: usize, tail: &[&str]) -> Option<CmiAddress> {
    let field = match tail {
        ["objectives", "_count"] => {
            return Some(synthetic(
                Collection::InteractionObjectives(index),
                SyntheticKind::Count,
            ));
        }
        ["objectives", sub, "id"] => InteractionField::ObjectiveId(parse_index(sub)?),
        ["correct_responses", "_count"] => {
            return Some(synthetic(
                Collection::InteractionCorrectResponses(index),
                SyntheticKind::Count,
            ));
        }
        ["correct_responses", sub, "pattern"] => {
            InteractionField::CorrectResponsePattern(parse_index(sub)?)
        }
        [field] => InteractionField::parse_scalar(field)?,
        _ => return None,
    };
    Some(CmiAddress::Interaction { index, field })
}

fn parse_keyword(collection: Collection, keyword: &str) -> Option<CmiAddress> {
    match keyword {
        "_children" if collection.children().is_some() => {
            Some(synthetic(collection, SyntheticKind::Children))
        }
        "_count" if collection.has_count() => Some(synthetic(collection, SyntheticKind::Count)),
        _ => None,
    }
}

/// Plain decimal digits only: no sign, no whitespace.
fn parse_index(raw: &str) -> Option<usize> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn synthetic(collection: Collection, kind: SyntheticKind) -> CmiAddress {
    CmiAddress::Synthetic { collection, kind }
}
