//! MCP Protocol Compliance Integration Tests
//!
//! Tests that the MCP server correctly implements JSON-RPC 2.0 and MCP
//! protocol requirements, including ID preservation, error codes, the
//! session gate and tool error reporting.

use std::sync::Arc;

use lake_core::{Orchestrator, ReleaseState};
use lake_mcp::{LakeMcpServer, ProjectInfo};
use lake_test_utils::{MemoryStore, article, fixed_dates};
use serde_json::{Value, json};

fn setup_server(store: Arc<MemoryStore>) -> LakeMcpServer {
    let orchestrator = Orchestrator::with_date_resolver(store, fixed_dates());
    LakeMcpServer::new(
        orchestrator,
        ProjectInfo {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
        },
    )
}

async fn send(server: &LakeMcpServer, request: Value) -> Value {
    let response = server.handle_message(&request.to_string()).await.unwrap();
    serde_json::from_str(&response).unwrap()
}

async fn call_tool(server: &LakeMcpServer, name: &str, arguments: Value) -> Value {
    send(
        server,
        json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "tools/call",
            "params": { "name": name, "arguments": arguments }
        }),
    )
    .await
}

fn tool_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

fn is_tool_error(response: &Value) -> bool {
    response["result"]["isError"] == true
}

/// The `{"error": {"kind", "message"}}` payload of a failed tool call
fn tool_error(response: &Value) -> Value {
    assert!(is_tool_error(response), "expected a tool error: {response}");
    let body: Value = serde_json::from_str(tool_text(response)).unwrap();
    body["error"].clone()
}

// ==========================================================================
// JSON-RPC 2.0 ID Preservation
// ==========================================================================

#[tokio::test]
async fn test_numeric_id_preserved_in_response() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    let response = send(&server, json!({"jsonrpc": "2.0", "id": 42, "method": "initialize", "params": {}})).await;

    assert_eq!(response["id"], 42, "Numeric ID must be echoed back exactly");
    assert_eq!(response["jsonrpc"], "2.0");
    assert_eq!(response["result"]["serverInfo"]["name"], "lake-mcp");
}

#[tokio::test]
async fn test_string_id_preserved_in_error_response() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    let response = send(
        &server,
        json!({"jsonrpc": "2.0", "id": "err-test", "method": "nonexistent/method"}),
    )
    .await;

    assert_eq!(response["id"], "err-test");
    assert_eq!(response["error"]["code"], -32601);
}

#[tokio::test]
async fn test_malformed_json_is_an_error() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    assert!(server.handle_message("{not json").await.is_err());
}

// ==========================================================================
// Tool catalogue
// ==========================================================================

#[tokio::test]
async fn test_tools_list_uses_camel_case_schema_key() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    let response = send(&server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;

    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 19);
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
}

// ==========================================================================
// Session gate
// ==========================================================================

#[tokio::test]
async fn test_tools_refused_before_initial_context() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    let response = call_tool(&server, "list_releases", json!({})).await;

    assert!(response.get("error").is_none(), "tool errors are not protocol errors");
    let error = tool_error(&response);
    assert_eq!(error["kind"], "ContextNotLoaded");
    assert!(error["message"].as_str().unwrap().contains("get_initial_context"));
}

#[tokio::test]
async fn test_initial_context_opens_the_gate() {
    let store = Arc::new(MemoryStore::new());
    let server = setup_server(store);

    let context = call_tool(&server, "get_initial_context", json!({})).await;
    assert!(!is_tool_error(&context));
    let body: Value = serde_json::from_str(tool_text(&context)).unwrap();
    assert_eq!(body["projectId"], "abc123");
    assert_eq!(body["datasets"][0]["name"], "production");

    let releases = call_tool(&server, "list_releases", json!({})).await;
    assert!(!is_tool_error(&releases));
}

#[tokio::test]
async fn test_gate_is_per_server() {
    let store = Arc::new(MemoryStore::new());
    let first = setup_server(store.clone());
    let second = setup_server(store);

    call_tool(&first, "get_initial_context", json!({})).await;
    let response = call_tool(&second, "list_datasets", json!({})).await;

    assert!(is_tool_error(&response));
}

// ==========================================================================
// Tool errors
// ==========================================================================

#[tokio::test]
async fn test_unknown_tool_is_a_tool_error() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    let response = call_tool(&server, "drop_dataset", json!({})).await;

    let error = tool_error(&response);
    assert_eq!(error["kind"], "UnknownTool");
    assert!(error["message"].as_str().unwrap().contains("drop_dataset"));
}

#[tokio::test]
async fn test_unknown_argument_is_rejected() {
    let server = setup_server(Arc::new(MemoryStore::new()));
    call_tool(&server, "get_initial_context", json!({})).await;

    let response = call_tool(&server, "get_document", json!({"documentId": "a", "id": "a"})).await;

    assert_eq!(tool_error(&response)["kind"], "InvalidArgument");
}

#[tokio::test]
async fn test_core_error_text_reaches_the_client() {
    let store = Arc::new(MemoryStore::new().with_document(article("versions.r1.a", "A")));
    let server = setup_server(store);
    call_tool(&server, "get_initial_context", json!({})).await;

    let response = call_tool(
        &server,
        "create_version",
        json!({"releaseId": "r1", "documentIds": ["versions.r1.a"]}),
    )
    .await;

    // bulk responses succeed at the tool level and carry per-item failures
    assert!(!is_tool_error(&response));
    let body: Value = serde_json::from_str(tool_text(&response)).unwrap();
    assert_eq!(body["summary"]["failed"], 1);
    assert!(
        body["results"][0]["error"]
            .as_str()
            .unwrap()
            .contains("cannot itself be versioned")
    );
}

// ==========================================================================
// Typed error payloads
// ==========================================================================

#[tokio::test]
async fn test_create_release_requires_release_type() {
    let store = Arc::new(MemoryStore::new());
    let server = setup_server(store.clone());
    call_tool(&server, "get_initial_context", json!({})).await;

    let response = call_tool(&server, "create_release", json!({"title": "Launch"})).await;

    let error = tool_error(&response);
    assert_eq!(error["kind"], "InvalidArgument");
    assert!(error["message"].as_str().unwrap().contains("releaseType"));
    assert!(store.submitted().is_empty(), "no release may be created");
}

#[tokio::test]
async fn test_validation_error_kind() {
    let store = Arc::new(MemoryStore::new());
    let server = setup_server(store.clone());
    call_tool(&server, "get_initial_context", json!({})).await;

    let response = call_tool(
        &server,
        "create_release",
        json!({"title": "Launch", "releaseType": "scheduled"}),
    )
    .await;

    let error = tool_error(&response);
    assert_eq!(error["kind"], "ValidationError");
    assert!(error["message"].as_str().unwrap().contains("intendedPublishAt"));
    assert!(store.submitted().is_empty());
}

#[tokio::test]
async fn test_action_rejected_error_kind() {
    let store = Arc::new(MemoryStore::new().with_release("spring", ReleaseState::Active, "Spring"));
    let server = setup_server(store);
    call_tool(&server, "get_initial_context", json!({})).await;

    // an active release must be archived before it can be deleted
    let response = call_tool(
        &server,
        "release_action",
        json!({"releaseId": "spring", "action": "delete"}),
    )
    .await;

    let error = tool_error(&response);
    assert_eq!(error["kind"], "ActionRejected");
    assert!(error["message"].as_str().unwrap().contains("spring"));
}
