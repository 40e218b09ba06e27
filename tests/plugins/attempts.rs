use scormkit::core::broker;
use scormkit::core::cmi::CmiDocument;
use scormkit::core::persistence::PersistKind;
use scormkit::plugins::attempts::AttemptStore;
use scormkit::plugins::player::SessionKey;
use tempfile::tempdir;

fn doc_with_status(status: &str) -> CmiDocument {
    let mut doc = CmiDocument::new();
    doc.core.lesson_status = status.to_string();
    doc
}

#[test]
fn missing_attempt_loads_as_none() {
    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    let key = SessionKey::new("enr-1", "sco-1");
    assert!(store.load_snapshot(&key).unwrap().is_none());
    assert!(store.get(&key).unwrap().is_none());
    assert!(store.list(None).unwrap().is_empty());
}

#[test]
fn commits_upsert_and_count() {
    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    let key = SessionKey::new("enr-1", "sco-1");

    store.save(&key, &doc_with_status("incomplete"), PersistKind::Commit).unwrap();
    let mut doc = doc_with_status("completed");
    doc.suspend_data = "page=9".to_string();
    store.save(&key, &doc, PersistKind::Commit).unwrap();

    let loaded = store.load_snapshot(&key).unwrap().expect("snapshot stored");
    assert_eq!(loaded, doc);

    let record = store.get(&key).unwrap().expect("record stored");
    assert_eq!(record.commit_count, 2);
    assert_eq!(record.lesson_status, "completed");
    assert_eq!(record.snapshot_hash, doc.content_hash().unwrap());
    assert!(record.last_commit_at.is_some());
    assert!(record.terminated_at.is_none());
    assert_eq!(record.cmi.as_ref(), Some(&doc));
}

#[test]
fn finished_attempt_is_not_overwritten_by_a_late_commit() {
    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    let key = SessionKey::new("enr-1", "sco-1");

    store.save(&key, &doc_with_status("passed"), PersistKind::Finish).unwrap();
    store.save(&key, &doc_with_status("incomplete"), PersistKind::Commit).unwrap();

    let record = store.get(&key).unwrap().unwrap();
    assert_eq!(record.lesson_status, "passed");
    assert!(record.terminated_at.is_some());
    assert_eq!(record.commit_count, 0);

    // A new attempt reopens the row; its commits land again.
    store.mark_initialized(&key, &doc_with_status("passed")).unwrap();
    let record = store.get(&key).unwrap().unwrap();
    assert!(record.terminated_at.is_none());
    assert!(record.initialized_at.is_some());
    assert_eq!(record.lesson_status, "passed");

    store.save(&key, &doc_with_status("failed"), PersistKind::Commit).unwrap();
    assert_eq!(store.get(&key).unwrap().unwrap().lesson_status, "failed");
}

#[test]
fn mark_initialized_seeds_a_missing_row_without_touching_existing_data() {
    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    let key = SessionKey::new("enr-2", "sco-1");

    store.mark_initialized(&key, &CmiDocument::new()).unwrap();
    let record = store.get(&key).unwrap().unwrap();
    assert_eq!(record.lesson_status, "not attempted");
    assert_eq!(record.commit_count, 0);

    store.save(&key, &doc_with_status("incomplete"), PersistKind::Commit).unwrap();
    store.mark_initialized(&key, &CmiDocument::new()).unwrap();
    assert_eq!(
        store.load_snapshot(&key).unwrap().unwrap().core.lesson_status,
        "incomplete"
    );
}

#[test]
fn list_filters_by_enrollment() {
    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    for (enrollment, sco) in [("enr-1", "sco-1"), ("enr-1", "sco-2"), ("enr-2", "sco-1")] {
        store
            .save(&SessionKey::new(enrollment, sco), &CmiDocument::new(), PersistKind::Commit)
            .unwrap();
    }

    assert_eq!(store.list(None).unwrap().len(), 3);
    let mine = store.list(Some("enr-1")).unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|r| r.enrollment_id == "enr-1" && r.cmi.is_none()));
    assert!(store.list(Some("enr-9")).unwrap().is_empty());
}

#[test]
fn store_operations_are_audited() {
    let tmp = tempdir().unwrap();
    let db_path = tmp.path().join("scormkit.db");
    let store = AttemptStore::open(&db_path).unwrap();
    let key = SessionKey::new("enr-1", "sco-1");
    store.save(&key, &CmiDocument::new(), PersistKind::Commit).unwrap();
    store.save(&key, &CmiDocument::new(), PersistKind::Finish).unwrap();

    let ops: Vec<String> = broker::read_audit_log(&db_path)
        .unwrap()
        .into_iter()
        .map(|event| event.op)
        .collect();
    assert_eq!(ops, vec!["attempts.init", "attempts.commit", "attempts.finish"]);
}

#[tokio::test]
async fn store_port_persists_from_the_runtime() {
    use scormkit::core::runtime::Scorm12Runtime;

    let tmp = tempdir().unwrap();
    let store = AttemptStore::open(&tmp.path().join("scormkit.db")).unwrap();
    let key = SessionKey::new("enr-1", "sco-1");

    let mut rt = Scorm12Runtime::new(None, store.port(key.clone()));
    rt.initialize();
    rt.set_value("cmi.core.lesson_status", "passed");
    rt.set_value("cmi.core.session_time", "00:10:00");
    assert!(rt.finish());
    rt.drain_persistence().await;

    let record = store.get(&key).unwrap().unwrap();
    assert_eq!(record.lesson_status, "passed");
    assert_eq!(record.total_time, "00:10:00");
    assert!(record.terminated_at.is_some());
}
