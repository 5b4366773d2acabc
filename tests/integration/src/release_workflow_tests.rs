//! End-to-end workflows driven through the MCP server
//!
//! Each test speaks JSON-RPC to a server backed by the in-memory store and
//! checks the resulting dataset, the way a client session would.

use std::sync::Arc;

use lake_core::{Orchestrator, ReleaseState};
use lake_mcp::{LakeMcpServer, ProjectInfo};
use lake_test_utils::{MemoryStore, article, fixed_dates};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// A server session over a shared in-memory dataset
struct TestSession {
    store: Arc<MemoryStore>,
    server: LakeMcpServer,
    next_id: std::cell::Cell<u64>,
}

impl TestSession {
    fn new(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        let orchestrator = Orchestrator::with_date_resolver(store.clone(), fixed_dates());
        let server = LakeMcpServer::new(
            orchestrator,
            ProjectInfo {
                project_id: "abc123".to_string(),
                dataset: "production".to_string(),
            },
        );
        Self {
            store,
            server,
            next_id: std::cell::Cell::new(1),
        }
    }

    /// Run the handshake a client performs before its first tool call
    async fn connect(store: MemoryStore) -> Self {
        let session = Self::new(store);
        session.request("initialize", json!({})).await;
        let ack = session
            .server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(ack.is_empty());
        session.tool("get_initial_context", json!({})).await;
        session
    }

    async fn request(&self, method: &str, params: Value) -> Value {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let message = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params});
        let response = self.server.handle_message(&message.to_string()).await.unwrap();
        let response: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(response["id"], id);
        response
    }

    /// Call a tool that is expected to succeed and return its parsed body
    async fn tool(&self, name: &str, arguments: Value) -> Value {
        let response = self.tool_raw(name, arguments).await;
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(
            response["result"]["isError"].is_null(),
            "{name} failed: {text}"
        );
        serde_json::from_str(text).unwrap()
    }

    /// Call a tool that is expected to fail and return its `{kind, message}`
    async fn tool_error(&self, name: &str, arguments: Value) -> Value {
        let response = self.tool_raw(name, arguments).await;
        assert_eq!(response["result"]["isError"], true, "{name} should fail");
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let body: Value = serde_json::from_str(text).unwrap();
        body["error"].clone()
    }

    async fn tool_raw(&self, name: &str, arguments: Value) -> Value {
        self.request("tools/call", json!({"name": name, "arguments": arguments}))
            .await
    }
}

// =============================================================================
// Drafts and publishing
// =============================================================================

#[tokio::test]
async fn draft_edit_publish_cycle() {
    let session = TestSession::connect(MemoryStore::new()).await;

    let created = session
        .tool(
            "create_documents",
            json!({"documents": [article("a", "First"), article("b", "Second")]}),
        )
        .await;
    assert_eq!(created["summary"]["successful"], 2);

    session
        .tool(
            "patch_document",
            json!({"documentId": "a", "set": {"title": "First, edited"}}),
        )
        .await;

    let published = session
        .tool("publish_documents", json!({"documentIds": ["a", "b"]}))
        .await;
    assert_eq!(published["summary"], json!({"total": 2, "successful": 2, "failed": 0}));
    assert_eq!(session.store.document_ids(), vec!["a", "b"]);
    assert_eq!(session.store.document("a").unwrap()["title"], "First, edited");

    let fetched = session.tool("get_document", json!({"documentId": "b"})).await;
    assert_eq!(fetched["title"], "Second");
}

#[tokio::test]
async fn bulk_publish_reports_each_failure() {
    let session = TestSession::connect(MemoryStore::new().with_document(article("drafts.a", "A"))).await;

    let response = session
        .tool("publish_documents", json!({"documentIds": ["a", "missing"]}))
        .await;

    assert_eq!(response["summary"]["successful"], 1);
    assert_eq!(response["summary"]["failed"], 1);
    assert_eq!(response["results"][0]["item"], "a");
    assert_eq!(response["results"][1]["item"], "missing");
    assert_eq!(response["results"][1]["success"], false);
    assert_eq!(session.store.document_ids(), vec!["a"]);
}

// =============================================================================
// Releases
// =============================================================================

#[tokio::test]
async fn release_workflow_from_creation_to_publish() {
    let session = TestSession::connect(
        MemoryStore::new()
            .with_document(article("a", "Live A"))
            .with_document(article("b", "Live B")),
    )
    .await;

    let created = session
        .tool(
            "create_release",
            json!({
                "releaseId": "spring",
                "title": "Spring launch",
                "releaseType": "asap",
                "documentIds": ["a"]
            }),
        )
        .await;
    assert_eq!(created["release"]["releaseId"], "spring");
    assert_eq!(created["documents"]["summary"]["successful"], 1);

    session
        .tool(
            "patch_document",
            json!({"documentId": "a", "releaseId": "spring", "set": {"title": "Spring A"}}),
        )
        .await;
    session
        .tool(
            "version_unpublish_document",
            json!({"releaseId": "spring", "documentIds": ["b"]}),
        )
        .await;

    // the live documents are untouched until the release ships
    assert_eq!(session.store.document("a").unwrap()["title"], "Live A");

    let listed = session.tool("list_releases", json!({"state": "active"})).await;
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["releases"][0]["releaseId"], "spring");

    session
        .tool("release_action", json!({"releaseId": "spring", "action": "publish"}))
        .await;

    assert_eq!(session.store.release_state("spring"), Some(ReleaseState::Published));
    assert_eq!(session.store.document_ids(), vec!["a"]);
    assert_eq!(session.store.document("a").unwrap()["title"], "Spring A");
}

#[tokio::test]
async fn schedule_with_natural_language_then_unschedule() {
    let session = TestSession::connect(MemoryStore::new()).await;
    session
        .tool("create_release", json!({"releaseId": "summer", "title": "Summer", "releaseType": "undecided"}))
        .await;

    let scheduled = session
        .tool(
            "schedule_release",
            json!({"releaseId": "summer", "publishAt": "tomorrow at noon"}),
        )
        .await;
    assert_eq!(scheduled["publishAt"], "2030-05-16T12:00:00Z");
    assert_eq!(session.store.release_state("summer"), Some(ReleaseState::Scheduled));

    // a scheduled release is locked for version edits
    session.store.insert_document(article("c", "C"));
    let add = session
        .tool("create_version", json!({"releaseId": "summer", "documentIds": ["c"]}))
        .await;
    assert_eq!(add["summary"]["failed"], 1);

    session
        .tool("release_action", json!({"releaseId": "summer", "action": "unschedule"}))
        .await;
    assert_eq!(session.store.release_state("summer"), Some(ReleaseState::Active));

    let retry = session
        .tool("create_version", json!({"releaseId": "summer", "documentIds": ["c"]}))
        .await;
    assert_eq!(retry["summary"]["successful"], 1);
}

#[tokio::test]
async fn release_lifecycle_errors_reach_the_client() {
    let session = TestSession::connect(MemoryStore::new()).await;
    session
        .tool("create_release", json!({"releaseId": "autumn", "title": "Autumn", "releaseType": "asap"}))
        .await;

    let schedule_via_action = session
        .tool_error(
            "release_action",
            json!({"releaseId": "autumn", "action": "schedule"}),
        )
        .await;
    assert_eq!(schedule_via_action["kind"], "InvalidArgument");
    assert!(
        schedule_via_action["message"]
            .as_str()
            .unwrap()
            .contains("schedule_release")
    );

    let delete_active = session
        .tool_error("release_action", json!({"releaseId": "autumn", "action": "delete"}))
        .await;
    assert_eq!(delete_active["kind"], "ActionRejected");

    session
        .tool("release_action", json!({"releaseId": "autumn", "action": "archive"}))
        .await;
    session
        .tool("release_action", json!({"releaseId": "autumn", "action": "delete"}))
        .await;
    assert_eq!(session.store.release_state("autumn"), Some(ReleaseState::Deleted));
}

#[tokio::test]
async fn version_discard_removes_only_the_version() {
    let session = TestSession::connect(
        MemoryStore::new()
            .with_release("spring", ReleaseState::Active, "Spring")
            .with_document(article("a", "Live"))
            .with_document(article("versions.spring.a", "Planned")),
    )
    .await;

    session
        .tool("version_discard", json!({"documentId": "versions.spring.a"}))
        .await;

    assert_eq!(session.store.document_ids(), vec!["a"]);
}
