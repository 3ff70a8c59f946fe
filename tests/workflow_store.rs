//! Workflow store behaviour against a real storage directory
//!
//! Each test gets its own temp root so cache and disk state can be compared
//! directly.

use serde_json::json;
use taskboard::workflow::{
    AuditEventType, WorkflowAcl, WorkflowAuditEvent, WorkflowDefinition, WorkflowStore,
};
use taskboard::WorkflowError;
use tempfile::TempDir;

async fn create_test_store() -> (TempDir, WorkflowStore) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    let store = WorkflowStore::new(tmp.path().join("workflows"));
    store.init().await.expect("init should create the root");
    (tmp, store)
}

fn build_workflow() -> WorkflowDefinition {
    WorkflowDefinition::from_json_value(json!({
        "id": "build-1",
        "name": "Build",
        "version": 1,
        "agents": [{ "id": "builder" }],
        "steps": [
            { "id": "compile", "type": "agent", "agent": "builder" },
            { "id": "retry", "type": "agent", "agent": "builder", "on_fail": { "retry_step": "compile" } }
        ]
    }))
    .unwrap()
}

fn validation_message(err: WorkflowError) -> String {
    match err {
        WorkflowError::Validation(msg) => msg,
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_save_then_list_includes_workflow() {
    let (_tmp, store) = create_test_store().await;

    store.save(&build_workflow()).await.unwrap();

    let workflows = store.list().await.unwrap();
    assert_eq!(workflows.len(), 1);
    assert_eq!(workflows[0].id, "build-1");
    assert!(store.root().join("build-1.yml").is_file());
}

#[tokio::test]
async fn test_load_after_save_is_served_from_cache() {
    let (_tmp, store) = create_test_store().await;
    let workflow = build_workflow();

    store.save(&workflow).await.unwrap();

    // Remove the entry behind the store's back; the cached copy must still be returned
    std::fs::remove_file(store.root().join("build-1.yml")).unwrap();

    let loaded = store.load("build-1").await.unwrap().expect("cached workflow");
    assert_eq!(*loaded, workflow);
}

#[tokio::test]
async fn test_round_trip_through_disk() {
    let (_tmp, store) = create_test_store().await;
    let mut workflow = build_workflow();
    workflow.version = Some(json!(0));
    workflow.extra.insert("owner".to_string(), json!("platform"));

    store.save(&workflow).await.unwrap();
    store.clear_cache();

    let loaded = store.load("build-1").await.unwrap().unwrap();
    assert_eq!(*loaded, workflow);
}

#[tokio::test]
async fn test_save_rejects_unknown_agent_without_writing() {
    let (_tmp, store) = create_test_store().await;
    let mut workflow = build_workflow();
    workflow.steps[0].agent = Some("ghost".to_string());

    let msg = validation_message(store.save(&workflow).await.unwrap_err());
    assert!(msg.contains("compile"));
    assert!(msg.contains("ghost"));

    assert!(!store.root().join("build-1.yml").exists());
    assert!(store.load("build-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_rejects_unknown_retry_step() {
    let (_tmp, store) = create_test_store().await;
    let mut workflow = build_workflow();
    workflow.steps[1].on_fail.as_mut().unwrap().retry_step = Some("nonexistent".to_string());

    let msg = validation_message(store.save(&workflow).await.unwrap_err());
    assert!(msg.contains("retry"));
    assert!(msg.contains("nonexistent"));
    assert!(!store.root().join("build-1.yml").exists());
}

#[tokio::test]
async fn test_save_rejects_unknown_verify_step_and_keeps_previous_version() {
    let (_tmp, store) = create_test_store().await;
    store.save(&build_workflow()).await.unwrap();
    let on_disk = std::fs::read_to_string(store.root().join("build-1.yml")).unwrap();

    let mut broken = WorkflowDefinition::from_yaml(
        r#"
id: build-1
name: Build
version: 2
agents:
  - id: builder
steps:
  - id: compile
    type: loop
    agent: builder
    loop:
      verify_step: missing
"#,
    )
    .unwrap();
    let msg = validation_message(store.save(&broken).await.unwrap_err());
    assert!(msg.contains("missing"));

    assert_eq!(std::fs::read_to_string(store.root().join("build-1.yml")).unwrap(), on_disk);
    let cached = store.load("build-1").await.unwrap().unwrap();
    assert_eq!(cached.version, Some(json!(1)));

    broken.steps[0].loop_config = None;
    store.save(&broken).await.unwrap();
}

#[tokio::test]
async fn test_load_missing_returns_none() {
    let (_tmp, store) = create_test_store().await;
    assert!(store.load("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_load_rejects_unsafe_ids() {
    let (_tmp, store) = create_test_store().await;

    for id in ["../secrets", "a/b", "", "-x"] {
        let err = store.load(id).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)), "{}", id);
    }
}

#[tokio::test]
async fn test_load_rejects_invalid_stored_content() {
    let (_tmp, store) = create_test_store().await;

    std::fs::write(store.root().join("garbled.yml"), "id: [unterminated").unwrap();
    let msg = validation_message(store.load("garbled").await.unwrap_err());
    assert!(msg.starts_with("Invalid workflow YAML"));

    std::fs::write(
        store.root().join("dangling.yml"),
        "id: dangling\nname: D\nversion: 1\nagents:\n  - id: a\nsteps:\n  - id: s\n    type: agent\n    agent: b\n",
    )
    .unwrap();
    let msg = validation_message(store.load("dangling").await.unwrap_err());
    assert!(msg.contains("unknown agent b"));

    // Nothing invalid is cached
    std::fs::remove_file(store.root().join("dangling.yml")).unwrap();
    assert!(store.load("dangling").await.unwrap().is_none());
}

#[tokio::test]
async fn test_load_reads_yaml_extension() {
    let (_tmp, store) = create_test_store().await;
    let workflow = build_workflow();
    std::fs::write(store.root().join("build-1.yaml"), workflow.to_yaml().unwrap()).unwrap();

    let loaded = store.load("build-1").await.unwrap().unwrap();
    assert_eq!(*loaded, workflow);

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_delete_removes_entry_and_cache() {
    let (_tmp, store) = create_test_store().await;
    store.save(&build_workflow()).await.unwrap();

    store.delete("build-1").await.unwrap();

    assert!(!store.root().join("build-1.yml").exists());
    assert!(store.load("build-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_delete_missing_propagates_not_found() {
    let (_tmp, store) = create_test_store().await;

    let err = store.delete("ghost").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_of_externally_removed_entry_evicts_cache() {
    let (_tmp, store) = create_test_store().await;
    store.save(&build_workflow()).await.unwrap();
    std::fs::remove_file(store.root().join("build-1.yml")).unwrap();

    assert!(store.delete("build-1").await.unwrap_err().is_not_found());
    assert!(store.load("build-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_clear_cache_forces_reread_and_revalidation() {
    let (_tmp, store) = create_test_store().await;
    store.save(&build_workflow()).await.unwrap();

    let mut edited = build_workflow();
    edited.name = "Build (edited)".to_string();
    std::fs::write(store.root().join("build-1.yml"), edited.to_yaml().unwrap()).unwrap();

    // Still cached
    assert_eq!(store.load("build-1").await.unwrap().unwrap().name, "Build");

    store.clear_cache();
    assert_eq!(store.load("build-1").await.unwrap().unwrap().name, "Build (edited)");

    // An external edit that breaks validation is caught on re-read
    std::fs::write(
        store.root().join("build-1.yml"),
        "id: build-1\nname: Build\nversion: 1\nagents: []\nsteps: []\n",
    )
    .unwrap();
    store.clear_cache();
    let msg = validation_message(store.load("build-1").await.unwrap_err());
    assert!(msg.contains("at least one agent"));
}

#[tokio::test]
async fn test_list_tolerates_missing_root() {
    let tmp = tempfile::tempdir().unwrap();
    let store = WorkflowStore::new(tmp.path().join("never-created"));

    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_skips_reserved_and_foreign_entries() {
    let (_tmp, store) = create_test_store().await;
    let mut second = build_workflow();
    second.id = "alpha".to_string();

    store.save(&build_workflow()).await.unwrap();
    store.save(&second).await.unwrap();
    store.save_acl(&WorkflowAcl { workflow_id: "alpha".into(), ..Default::default() }).await.unwrap();
    store
        .audit_change(&WorkflowAuditEvent::new(AuditEventType::Created, "alpha"))
        .await
        .unwrap();
    std::fs::write(store.root().join("README.md"), "notes").unwrap();

    let ids: Vec<String> = store.list().await.unwrap().iter().map(|w| w.id.clone()).collect();
    assert_eq!(ids, vec!["alpha".to_string(), "build-1".to_string()]);
}

#[tokio::test]
async fn test_list_propagates_malformed_entry() {
    let (_tmp, store) = create_test_store().await;
    store.save(&build_workflow()).await.unwrap();
    std::fs::write(store.root().join("broken.yml"), "name: no id\n").unwrap();

    assert!(matches!(store.list().await.unwrap_err(), WorkflowError::Validation(_)));
}

#[tokio::test]
async fn test_acl_round_trip() {
    let (_tmp, store) = create_test_store().await;
    let acl = WorkflowAcl {
        workflow_id: "build-1".to_string(),
        owner: "alice".to_string(),
        editors: vec!["bob".to_string()],
        viewers: vec!["carol".to_string()],
        executors: vec![],
        is_public: false,
        extra: Default::default(),
    };

    assert!(store.load_acl("build-1").await.unwrap().is_none());

    store.save_acl(&acl).await.unwrap();
    assert_eq!(store.load_acl("build-1").await.unwrap(), Some(acl));
    assert!(store.load_acl("unknown-id").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_acl_merges_into_shared_document() {
    let (_tmp, store) = create_test_store().await;

    store
        .save_acl(&WorkflowAcl { workflow_id: "a".into(), owner: "alice".into(), ..Default::default() })
        .await
        .unwrap();
    store
        .save_acl(&WorkflowAcl { workflow_id: "b".into(), owner: "bob".into(), ..Default::default() })
        .await
        .unwrap();
    store
        .save_acl(&WorkflowAcl { workflow_id: "a".into(), owner: "dave".into(), ..Default::default() })
        .await
        .unwrap();

    assert_eq!(store.load_acl("a").await.unwrap().unwrap().owner, "dave");
    assert_eq!(store.load_acl("b").await.unwrap().unwrap().owner, "bob");

    let document: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.root().join(".acl.json")).unwrap()).unwrap();
    assert_eq!(document.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_concurrent_acl_saves_are_not_lost() {
    let (_tmp, store) = create_test_store().await;
    let store = std::sync::Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = std::sync::Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .save_acl(&WorkflowAcl { workflow_id: format!("wf-{}", i), ..Default::default() })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for i in 0..8 {
        assert!(store.load_acl(&format!("wf-{}", i)).await.unwrap().is_some());
    }
}

#[tokio::test]
async fn test_corrupt_acl_document_propagates() {
    let (_tmp, store) = create_test_store().await;
    std::fs::write(store.root().join(".acl.json"), "{ not json").unwrap();

    assert!(matches!(
        store.load_acl("build-1").await.unwrap_err(),
        WorkflowError::Serialization(_)
    ));
    assert!(store
        .save_acl(&WorkflowAcl { workflow_id: "build-1".into(), ..Default::default() })
        .await
        .is_err());
}

#[tokio::test]
async fn test_audit_appends_lines_in_order() {
    let (_tmp, store) = create_test_store().await;
    let first = WorkflowAuditEvent::new(AuditEventType::Created, "build-1").with_version(Some(json!(1)));
    let mut second = WorkflowAuditEvent::new(AuditEventType::Updated, "build-1");
    second.user_id = Some("alice".to_string());

    store.audit_change(&first).await.unwrap();
    store.audit_change(&second).await.unwrap();

    let log = std::fs::read_to_string(store.root().join(".audit.jsonl")).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);

    let parsed_first: WorkflowAuditEvent = serde_json::from_str(lines[0]).unwrap();
    let parsed_second: WorkflowAuditEvent = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(parsed_first, first);
    assert_eq!(parsed_second, second);
}

#[tokio::test]
async fn test_audit_fails_when_root_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let store = WorkflowStore::new(tmp.path().join("never-created"));

    let err = store
        .audit_change(&WorkflowAuditEvent::new(AuditEventType::Run, "build-1"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
