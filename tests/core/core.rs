use scormkit::core::cmi::{CmiDocument, Objective};
use scormkit::core::codes::{self, ErrorCode};
use scormkit::core::config::{self, ScormkitConfig};
use scormkit::core::error::ScormError;
use scormkit::core::timespan;
use scormkit::core::validators::{self, CmiLimits};
use std::fs;
use tempfile::tempdir;

const READ_WRITE: &[(&str, &str)] = &[
    ("cmi.core.lesson_location", "page-3;frame=2"),
    ("cmi.core.lesson_status", "passed"),
    ("cmi.core.score.raw", "85"),
    ("cmi.core.score.min", "0"),
    ("cmi.core.score.max", "100"),
    ("cmi.suspend_data", "a=1;b=[2,3]"),
    ("cmi.comments", "liked the second module"),
    ("cmi.student_preference.audio", "50"),
    ("cmi.student_preference.language", "en-US"),
    ("cmi.student_preference.speed", "-20"),
    ("cmi.student_preference.text", "1"),
    ("cmi.objectives.0.id", "obj-intro"),
    ("cmi.objectives.0.status", "completed"),
    ("cmi.objectives.0.score.raw", "72.5"),
    ("cmi.interactions.0.id", "q1"),
    ("cmi.interactions.0.time", "09:15:00"),
    ("cmi.interactions.0.type", "choice"),
    ("cmi.interactions.0.weighting", "1"),
    ("cmi.interactions.0.student_response", "b"),
    ("cmi.interactions.0.result", "correct"),
    ("cmi.interactions.0.latency", "00:00:12"),
    ("cmi.interactions.0.objectives.0.id", "obj-intro"),
    ("cmi.interactions.0.correct_responses.0.pattern", "b"),
];

const READ_ONLY: &[&str] = &[
    "cmi.core.student_id",
    "cmi.core.student_name",
    "cmi.core.credit",
    "cmi.core.entry",
    "cmi.core.total_time",
    "cmi.core.lesson_mode",
    "cmi.core._children",
    "cmi.core.score._children",
    "cmi.launch_data",
    "cmi.comments_from_lms",
    "cmi.student_data.mastery_score",
    "cmi.student_data.max_time_allowed",
    "cmi.student_data.time_limit_action",
    "cmi.objectives._count",
    "cmi.objectives._children",
    "cmi.interactions._count",
    "cmi.interactions._children",
];

const WRITE_ONLY: &[&str] = &[
    "cmi.core.exit",
    "cmi.core.session_time",
];

const UNKNOWN: &[&str] = &[
    "",
    "cmi",
    "cmi.core",
    "cmi.core.lesson_statu",
    "CMI.core.lesson_status",
    "cmi.core.score",
    "cmi.core.score.avg",
    "cmi.objectives.x.id",
    "cmi.objectives.-1.id",
    "cmi.objectives.0",
    "cmi.objectives.0.weight",
    "cmi.interactions.0.objectives.0.status",
    "cmi.core._count",
    "cmi.suspend_data.extra",
    "adl.nav.request",
];

#[test]
fn read_write_elements_round_trip() {
    let mut doc = CmiDocument::new();
    for (path, value) in READ_WRITE {
        assert!(validators::is_valid_element(path), "{path}");
        validators::set_value(&mut doc, path, value)
            .unwrap_or_else(|code| panic!("set {path} failed with {code}"));
        assert_eq!(validators::get_value(&doc, path).as_deref(), Ok(*value), "{path}");
    }
}

#[test]
fn unknown_elements_are_not_implemented_and_never_mutate() {
    let mut doc = CmiDocument::new();
    let before = doc.clone();
    for path in UNKNOWN {
        assert!(!validators::is_valid_element(path), "{path}");
        assert_eq!(validators::get_value(&doc, path), Err(ErrorCode::NotImplemented), "{path}");
        assert_eq!(
            validators::set_value(&mut doc, path, "x"),
            Err(ErrorCode::NotImplemented),
            "{path}"
        );
    }
    assert_eq!(doc, before);
}

#[test]
fn read_only_elements_reject_writes_and_keep_their_value() {
    let mut doc = CmiDocument::new();
    doc.core.student_id = "learner-7".to_string();
    doc.launch_data = "chapter=2".to_string();
    for path in READ_ONLY {
        assert!(validators::is_read_only_element(path), "{path}");
        let before = validators::get_value(&doc, path);
        assert!(before.is_ok(), "{path}");
        assert_eq!(
            validators::set_value(&mut doc, path, "tampered"),
            Err(ErrorCode::ReadOnly),
            "{path}"
        );
        assert_eq!(validators::get_value(&doc, path), before, "{path}");
    }
}

#[test]
fn write_only_elements_cannot_be_read() {
    let doc = CmiDocument::new();
    for path in WRITE_ONLY {
        assert!(validators::is_write_only_element(path), "{path}");
        assert_eq!(validators::get_value(&doc, path), Err(ErrorCode::WriteOnly), "{path}");
    }
}

#[test]
fn failed_validation_leaves_fields_untouched() {
    let mut doc = CmiDocument::new();
    validators::set_value(&mut doc, "cmi.core.score.raw", "40").unwrap();

    let cases = [
        ("cmi.core.lesson_status", "sideways", ErrorCode::IncorrectDataType),
        ("cmi.core.exit", "quit", ErrorCode::IncorrectDataType),
        ("cmi.core.session_time", "1:2:3", ErrorCode::IncorrectDataType),
        ("cmi.core.score.raw", "ninety", ErrorCode::ValueOutOfRange),
        ("cmi.core.score.raw", "", ErrorCode::ValueOutOfRange),
        ("cmi.core.score.raw", "101", ErrorCode::ValueOutOfRange),
        ("cmi.student_preference.audio", "loud", ErrorCode::IncorrectDataType),
        ("cmi.student_preference.text", "2", ErrorCode::ValueOutOfRange),
        ("cmi.objectives.0.id", "has space", ErrorCode::IncorrectDataType),
        ("cmi.interactions.0.type", "essay", ErrorCode::IncorrectDataType),
    ];
    let before = doc.clone();
    for (path, value, code) in cases {
        assert_eq!(validators::set_value(&mut doc, path, value), Err(code), "{path}={value}");
    }
    assert_eq!(doc, before);
    assert!(doc.objectives.is_empty());
    assert!(doc.interactions.is_empty());
}

#[test]
fn collection_writes_append_up_to_the_index() {
    let mut doc = CmiDocument::new();
    validators::set_value(&mut doc, "cmi.objectives.2.id", "obj-3").unwrap();
    assert_eq!(validators::get_value(&doc, "cmi.objectives._count").unwrap(), "3");
    assert_eq!(validators::get_value(&doc, "cmi.objectives.0.id").unwrap(), "");
    assert_eq!(validators::get_value(&doc, "cmi.objectives.2.id").unwrap(), "obj-3");
    assert_eq!(validators::get_value(&doc, "cmi.objectives.9.id").unwrap(), "");

    validators::set_value(&mut doc, "cmi.interactions.0.id", "q1").unwrap();
    validators::set_value(&mut doc, "cmi.interactions.0.objectives.1.id", "obj-3").unwrap();
    validators::set_value(&mut doc, "cmi.interactions.0.correct_responses.0.pattern", "a").unwrap();
    assert_eq!(validators::get_value(&doc, "cmi.interactions._count").unwrap(), "1");
    assert_eq!(
        validators::get_value(&doc, "cmi.interactions.0.objectives._count").unwrap(),
        "2"
    );
    assert_eq!(
        validators::get_value(&doc, "cmi.interactions.0.correct_responses._count").unwrap(),
        "1"
    );
    assert_eq!(
        validators::get_value(&doc, "cmi.interactions.5.objectives._count").unwrap(),
        "0"
    );
    assert_eq!(validators::get_value(&doc, "cmi.interactions.0.id").unwrap(), "q1");
    assert_eq!(validators::get_value(&doc, "cmi.interactions.5.id").unwrap(), "");
    assert_eq!(
        validators::get_value(&doc, "cmi.interactions.0.objectives.4.id").unwrap(),
        ""
    );
    assert_eq!(validators::get_value(&doc, "cmi.interactions._count").unwrap(), "1");
}

#[test]
fn collection_bound_is_value_out_of_range() {
    let limits = CmiLimits {
        suspend_data_max_len: 16,
        max_collection_entries: 4,
    };
    let mut doc = CmiDocument::new();
    assert_eq!(
        validators::set_value_with_limits(&mut doc, "cmi.objectives.4.id", "o", &limits),
        Err(ErrorCode::ValueOutOfRange)
    );
    assert!(validators::set_value_with_limits(&mut doc, "cmi.objectives.3.id", "o", &limits).is_ok());
    assert_eq!(
        validators::set_value_with_limits(&mut doc, "cmi.suspend_data", &"x".repeat(17), &limits),
        Err(ErrorCode::IncorrectDataType)
    );
    assert_eq!(
        validators::set_value(&mut doc, "cmi.objectives.99999999999.id", "o"),
        Err(ErrorCode::ValueOutOfRange)
    );
}

#[test]
fn children_keywords_list_sub_fields() {
    let doc = CmiDocument::new();
    assert_eq!(
        validators::get_value(&doc, "cmi.core.score._children").unwrap(),
        "raw,min,max"
    );
    assert_eq!(
        validators::get_value(&doc, "cmi.objectives._children").unwrap(),
        "id,score,status"
    );
    assert!(
        validators::get_value(&doc, "cmi.core._children")
            .unwrap()
            .contains("lesson_status")
    );
}

#[test]
fn objective_count_reflects_snapshot() {
    let mut doc = CmiDocument::new();
    assert_eq!(validators::get_value(&doc, "cmi.objectives._count").unwrap(), "0");
    doc.objectives = vec![
        Objective {
            id: "o1".to_string(),
            ..Objective::default()
        },
        Objective {
            id: "o2".to_string(),
            ..Objective::default()
        },
    ];
    assert_eq!(validators::get_value(&doc, "cmi.objectives._count").unwrap(), "2");
}

#[test]
fn timespans_add_with_carry() {
    assert_eq!(
        timespan::add_timespans("00:00:00", "00:05:30").as_deref(),
        Some("00:05:30")
    );
    assert_eq!(
        timespan::add_timespans("00:59:59.50", "00:00:00.75").as_deref(),
        Some("01:00:00.25")
    );
    assert_eq!(
        timespan::add_timespans("0100:00:00", "00:30:00").as_deref(),
        Some("100:30:00")
    );
    assert_eq!(timespan::add_timespans("00:00:00", "junk"), None);
}

#[test]
fn error_strings_and_diagnostics() {
    assert_eq!(codes::error_string("0"), "No error");
    assert_eq!(codes::error_string("401"), "Not implemented error");
    assert_eq!(codes::error_string("999"), "Unknown error");
    assert_eq!(codes::error_string(""), "Unknown error");
    assert_eq!(codes::diagnostic("403"), "Error 403: Element is read only");
}

#[test]
fn config_file_is_optional_but_must_parse() {
    let tmp = tempdir().unwrap();
    let loaded = config::load_config(None, tmp.path()).unwrap();
    assert_eq!(loaded, ScormkitConfig::default());

    fs::write(
        tmp.path().join(config::CONFIG_FILE_NAME),
        "[player]\ncommits_per_minute = 3\n",
    )
    .unwrap();
    let loaded = config::load_config(None, tmp.path()).unwrap();
    assert_eq!(loaded.player.commits_per_minute, 3);
    assert_eq!(loaded.player.api_calls_per_minute, 100);

    let missing = tmp.path().join("nope.toml");
    let err = config::load_config(Some(&missing), tmp.path()).unwrap_err();
    assert!(matches!(err, ScormError::NotFound(_)));

    let broken = tmp.path().join("broken.toml");
    fs::write(&broken, "[runtime\n").unwrap();
    let err = config::load_config(Some(&broken), tmp.path()).unwrap_err();
    assert!(matches!(err, ScormError::ConfigError(_)));
}
