//! Document workflows through the orchestrator

use std::sync::Arc;
use std::time::Duration;

use lake_core::{Error, IfExists, Orchestrator, Patch, ReleaseOverride, ReleaseState};
use lake_test_utils::{MemoryStore, article, fixed_dates};
use pretty_assertions::assert_eq;
use serde_json::json;

fn orchestrator(store: &Arc<MemoryStore>) -> Orchestrator {
    Orchestrator::with_date_resolver(store.clone(), fixed_dates())
}

#[tokio::test]
async fn create_documents_writes_drafts() {
    let store = Arc::new(MemoryStore::new());
    let response = orchestrator(&store)
        .create_documents(
            vec![article("a", "A"), article("drafts.b", "B")],
            None,
            IfExists::Fail,
        )
        .await
        .unwrap();

    assert!(response.is_complete_success());
    assert_eq!(store.document_ids(), vec!["drafts.a", "drafts.b"]);
    assert_eq!(response.results[0].data().unwrap().document_id, "drafts.a");
    assert_eq!(response.results[1].data().unwrap().published_id, "b");
}

#[tokio::test]
async fn create_documents_assigns_missing_ids() {
    let store = Arc::new(MemoryStore::new());
    let response = orchestrator(&store)
        .create_documents(vec![json!({"_type": "article"})], None, IfExists::Fail)
        .await
        .unwrap();

    let created = response.results[0].data().unwrap();
    assert!(created.document_id.starts_with("drafts."));
    assert!(store.document(&created.document_id).is_some());
}

#[tokio::test]
async fn create_documents_in_release_creates_versions() {
    let store = Arc::new(MemoryStore::new().with_release("spring", ReleaseState::Active, "Spring"));
    let response = orchestrator(&store)
        .create_documents(vec![article("a", "A")], Some("spring"), IfExists::Fail)
        .await
        .unwrap();

    assert!(response.is_complete_success());
    assert_eq!(store.document_ids(), vec!["versions.spring.a"]);
}

#[tokio::test]
async fn duplicate_ids_in_one_request_are_refused() {
    let store = Arc::new(MemoryStore::new());
    let err = orchestrator(&store)
        .create_documents(
            vec![article("a", "A"), article("a", "again")],
            None,
            IfExists::Fail,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(store.submitted().is_empty());
}

#[tokio::test]
async fn failing_item_does_not_cancel_siblings() {
    let store = Arc::new(MemoryStore::new());
    store.fail_document("b");
    store.delay_document("a", Duration::from_millis(20));

    let response = orchestrator(&store)
        .create_documents(
            vec![article("a", "A"), article("b", "B"), article("c", "C")],
            None,
            IfExists::Fail,
        )
        .await
        .unwrap();

    assert_eq!(response.summary.successful, 2);
    assert_eq!(response.summary.failed, 1);
    assert_eq!(response.results[1].item(), "b");
    assert!(response.results[1].error().unwrap().contains("b"));
    assert_eq!(store.document_ids(), vec!["drafts.a", "drafts.c"]);
}

#[tokio::test]
async fn publish_moves_draft_onto_published_id() {
    let store = Arc::new(MemoryStore::new().with_document(article("drafts.a", "A")));
    let response = orchestrator(&store)
        .publish_documents(vec!["a".to_string()])
        .await;

    assert!(response.is_complete_success());
    assert_eq!(store.document_ids(), vec!["a"]);
    assert_eq!(store.document("a").unwrap()["_id"], "a");
}

#[tokio::test]
async fn publish_refuses_version_ids() {
    let store = Arc::new(MemoryStore::new());
    let response = orchestrator(&store)
        .publish_documents(vec!["versions.r1.a".to_string()])
        .await;

    assert_eq!(response.summary.failed, 1);
    assert!(response.results[0].error().unwrap().contains("Invalid operation"));
    assert!(store.submitted().is_empty());
}

#[tokio::test]
async fn unpublish_keeps_content_as_draft() {
    let store = Arc::new(MemoryStore::new().with_document(article("a", "A")));
    let response = orchestrator(&store)
        .unpublish_documents(vec!["a".to_string()])
        .await;

    assert!(response.is_complete_success());
    assert_eq!(store.document_ids(), vec!["drafts.a"]);
}

#[tokio::test]
async fn discard_and_delete_report_missing_documents() {
    let store = Arc::new(
        MemoryStore::new()
            .with_document(article("a", "A"))
            .with_document(article("drafts.a", "A2")),
    );
    let orchestrator = orchestrator(&store);

    let discarded = orchestrator
        .discard_drafts(vec!["a".to_string(), "ghost".to_string()], None)
        .await;
    assert_eq!(discarded.summary.successful, 1);
    assert_eq!(discarded.failed_results().next().unwrap().0, "ghost");

    let deleted = orchestrator.delete_documents(vec!["a".to_string()], true).await;
    assert!(deleted.is_complete_success());
    assert!(store.document_ids().is_empty());
}

#[tokio::test]
async fn patch_published_id_edits_the_draft() {
    let store = Arc::new(MemoryStore::new().with_document(article("a", "A")));
    let patch = Patch {
        set: json!({"title": "Edited"}).as_object().cloned(),
        ..Patch::default()
    };

    let outcome = orchestrator(&store)
        .patch_document("a", &ReleaseOverride::Unspecified, patch)
        .await
        .unwrap();

    assert_eq!(outcome.document_id, "drafts.a");
    assert_eq!(store.document("drafts.a").unwrap()["title"], "Edited");
    assert_eq!(store.document("a").unwrap()["title"], "A");
}

#[tokio::test]
async fn patch_with_release_edits_the_version() {
    let store = Arc::new(
        MemoryStore::new()
            .with_release("spring", ReleaseState::Active, "Spring")
            .with_document(article("versions.spring.a", "A")),
    );
    let patch = Patch {
        set: json!({"title": "Spring title"}).as_object().cloned(),
        ..Patch::default()
    };

    let outcome = orchestrator(&store)
        .patch_document("a", &ReleaseOverride::Release("spring".to_string()), patch)
        .await
        .unwrap();

    assert_eq!(outcome.document_id, "versions.spring.a");
    assert_eq!(
        store.document("versions.spring.a").unwrap()["title"],
        "Spring title"
    );
}

#[tokio::test]
async fn empty_patch_is_a_validation_error() {
    let store = Arc::new(MemoryStore::new().with_document(article("a", "A")));
    let err = orchestrator(&store)
        .patch_document("a", &ReleaseOverride::Unspecified, Patch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn get_document_reports_missing_as_not_found() {
    let store = Arc::new(MemoryStore::new());
    let err = orchestrator(&store).get_document("nope").await.unwrap_err();
    assert_eq!(err.kind(), "NotFound");
}
