use scormkit::core::config::{PlayerConfig, ScormkitConfig};
use scormkit::core::runtime::SessionState;
use scormkit::plugins::attempts::AttemptStore;
use scormkit::plugins::harness::{self, RpcResponse, ScriptedCall};
use scormkit::plugins::player::{RATE_WINDOW, SessionKey, SessionRegistry};
use std::time::Instant;
use tempfile::{TempDir, tempdir};

fn registry_with(player: PlayerConfig) -> (TempDir, SessionRegistry) {
    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    let config = ScormkitConfig {
        player,
        ..ScormkitConfig::default()
    };
    (tmp, SessionRegistry::new(store, config))
}

fn registry() -> (TempDir, SessionRegistry) {
    registry_with(PlayerConfig::default())
}

#[tokio::test]
async fn finished_session_resumes_on_the_next_launch() {
    let (_tmp, mut registry) = registry();
    let key = SessionKey::new("enr-1", "sco-1");

    let session = registry.open(key.clone()).unwrap();
    assert_eq!(session.call("LMSInitialize", &[""]), "true");
    assert_eq!(session.call("LMSGetValue", &["cmi.core.entry"]), "ab-initio");
    session.call("LMSSetValue", &["cmi.core.lesson_status", "incomplete"]);
    session.call("LMSSetValue", &["cmi.core.session_time", "00:05:30"]);
    session.call("LMSSetValue", &["cmi.suspend_data", "page=3"]);
    assert_eq!(session.call("LMSCommit", &[""]), "true");
    assert_eq!(session.call("LMSFinish", &[""]), "true");
    let stats = registry.close(&key).await.unwrap();
    assert_eq!(stats.api_calls, 7);
    assert_eq!(stats.state, SessionState::Terminated);
    assert!(registry.is_empty());

    let session = registry.open(key.clone()).unwrap();
    session.call("LMSInitialize", &[""]);
    assert_eq!(session.call("LMSGetValue", &["cmi.core.entry"]), "resume");
    assert_eq!(session.call("LMSGetValue", &["cmi.suspend_data"]), "page=3");
    session.call("LMSSetValue", &["cmi.core.session_time", "00:01:00"]);
    session.call("LMSFinish", &[""]);
    registry.close(&key).await.unwrap();

    let record = registry.store().get(&key).unwrap().unwrap();
    assert_eq!(record.total_time, "00:06:30");
    assert!(record.terminated_at.is_some());
}

#[tokio::test]
async fn opening_twice_is_an_error() {
    let (_tmp, mut registry) = registry();
    let key = SessionKey::new("enr-1", "sco-1");
    registry.open(key.clone()).unwrap();
    assert!(registry.open(key.clone()).is_err());
    assert_eq!(registry.len(), 1);
    assert!(registry.open_or_get(key.clone()).is_ok());
    assert!(registry.close(&SessionKey::new("enr-1", "other")).await.is_err());
}

#[tokio::test]
async fn rate_limited_calls_are_refused_with_101() {
    let (_tmp, mut registry) = registry_with(PlayerConfig {
        api_calls_per_minute: 3,
        commits_per_minute: 20,
        set_values_per_minute: 200,
    });
    let session = registry.open(SessionKey::new("enr-1", "sco-1")).unwrap();
    let t0 = Instant::now();

    assert_eq!(session.call_at("LMSInitialize", &[""], t0), "true");
    assert_eq!(
        session.call_at("LMSSetValue", &["cmi.core.lesson_status", "passed"], t0),
        "true"
    );
    assert_eq!(session.call_at("LMSGetValue", &["cmi.core.lesson_status"], t0), "passed");

    assert_eq!(session.call_at("LMSGetValue", &["cmi.core.lesson_status"], t0), "");
    assert_eq!(session.call_at("LMSGetLastError", &[], t0), "101");
    assert_eq!(
        session.call_at("LMSSetValue", &["cmi.core.lesson_status", "failed"], t0),
        "false"
    );
    assert_eq!(session.runtime().cmi().core.lesson_status, "passed");

    let later = t0 + RATE_WINDOW;
    assert_eq!(session.call_at("LMSGetValue", &["cmi.core.lesson_status"], later), "passed");
    assert_eq!(session.call_at("LMSGetLastError", &[], later), "0");

    let stats = session.stats();
    assert_eq!(stats.rejected_calls, 2);
    assert_eq!(stats.api_calls, 6);
}

#[tokio::test]
async fn commit_bucket_is_separate() {
    let (_tmp, mut registry) = registry_with(PlayerConfig {
        api_calls_per_minute: 100,
        commits_per_minute: 2,
        set_values_per_minute: 200,
    });
    let session = registry.open(SessionKey::new("enr-1", "sco-1")).unwrap();
    let t0 = Instant::now();
    session.call_at("LMSInitialize", &[""], t0);
    assert_eq!(session.call_at("LMSCommit", &[""], t0), "true");
    assert_eq!(session.call_at("LMSCommit", &[""], t0), "true");
    assert_eq!(session.call_at("LMSCommit", &[""], t0), "false");
    assert_eq!(session.call_at("LMSGetLastError", &[], t0), "101");
    assert_eq!(session.call_at("LMSGetValue", &["cmi.core.entry"], t0), "ab-initio");
}

#[tokio::test]
async fn replay_produces_one_envelope_per_call() {
    let (_tmp, mut registry) = registry();
    let key = SessionKey::new("enr-1", "sco-1");
    let script = harness::parse_script(
        r#"[
            {"call": "LMSInitialize", "args": [""]},
            {"call": "LMSSetValue", "args": ["cmi.core.lesson_status", "sideways"]},
            {"call": "LMSGetLastError"},
            {"call": "LMSBogus"},
            {"call": "LMSFinish", "args": [""]}
        ]"#,
    )
    .unwrap();
    assert_eq!(
        script[2],
        ScriptedCall {
            call: "LMSGetLastError".to_string(),
            args: vec![]
        }
    );

    let envelopes = harness::replay(registry.open(key.clone()).unwrap(), &script);
    registry.close(&key).await.unwrap();

    let results: Vec<(&str, &str)> = envelopes
        .iter()
        .map(|e| (e["result"].as_str().unwrap(), e["last_error"].as_str().unwrap()))
        .collect();
    assert_eq!(
        results,
        vec![
            ("true", "0"),
            ("false", "405"),
            ("405", "405"),
            ("false", "101"),
            ("true", "0"),
        ]
    );
    assert_eq!(envelopes[1]["call"], "LMSSetValue");
    assert_eq!(envelopes[1]["args"][1], "sideways");
}

#[test]
fn malformed_script_is_a_validation_error() {
    assert!(harness::parse_script(r#"{"call": "LMSInitialize"}"#).is_err());
    assert!(harness::parse_script("[").is_err());
}

#[tokio::test]
async fn rpc_serves_sessions_and_closes_them_on_finish() {
    let (_tmp, mut registry) = registry();
    let input = [
        r#"{"id":"1","enrollment_id":"e","sco_id":"s","call":"LMSInitialize","args":[""]}"#,
        r#"{"id":"2","enrollment_id":"e","sco_id":"s","call":"LMSSetValue","args":["cmi.core.lesson_status","completed"]}"#,
        "",
        r#"{"id":"3","enrollment_id":"e","sco_id":"s","call":"LMSFinish","args":[""]}"#,
        r#"not json"#,
        r#"{"id":"5","enrollment_id":"e","sco_id":"s","call":"LMSGetValue","args":["cmi.core.lesson_status"]}"#,
    ]
    .join("\n");

    let mut output = Vec::new();
    let handled = harness::serve_rpc(
        &mut registry,
        tokio::io::BufReader::new(input.as_bytes()),
        &mut output,
    )
    .await
    .unwrap();
    assert_eq!(handled, 5);
    assert!(registry.is_empty());

    let responses: Vec<RpcResponse> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(responses[0].result.as_deref(), Some("true"));
    assert_eq!(responses[1].last_error.as_deref(), Some("0"));

    let finish = &responses[2];
    assert_eq!(finish.id, "3");
    let stats = finish.session.as_ref().expect("finish closes the session");
    assert_eq!(stats.api_calls, 3);

    assert!(!responses[3].success);
    assert!(responses[3].error.as_deref().unwrap().starts_with("invalid request"));

    // The session reopened from the store, before LMSInitialize.
    assert_eq!(responses[4].result.as_deref(), Some(""));
    assert_eq!(responses[4].last_error.as_deref(), Some("301"));
}
