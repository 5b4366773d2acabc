//! MCP Server implementation
//!
//! Reads JSON-RPC messages line by line from stdin and writes responses to
//! stdout. Tool failures are reported inside a successful JSON-RPC response
//! as a tool result with `isError` set, whose text is a JSON object
//! `{"error": {"kind", "message"}}`; JSON-RPC errors are reserved for
//! protocol problems.

use std::io::{BufRead, Write};
use std::sync::Arc;

use lake_core::{ContentStore, Orchestrator};
use lake_store::{HttpStore, StoreConfig};
use serde_json::{Value, json};

use crate::handlers::{ProjectInfo, ToolContext, handle_tool_call};
use crate::protocol::{
    InitializeParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION,
    ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability, codes,
};
use crate::session::Session;
use crate::tools::{ToolDefinition, ToolResult, get_tool_definitions};
use crate::{Error, Result};

/// MCP server for one content lake dataset
///
/// # Example
///
/// ```ignore
/// use lake_mcp::LakeMcpServer;
/// use lake_store::StoreConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = StoreConfig::load("lake.toml".as_ref())?;
///     let server = LakeMcpServer::from_config(config)?;
///     server.run().await?;
///     Ok(())
/// }
/// ```
pub struct LakeMcpServer {
    orchestrator: Orchestrator,
    project: ProjectInfo,
    session: Session,
    tools: Vec<ToolDefinition>,
}

impl LakeMcpServer {
    /// Create a server over any store implementation
    pub fn new(orchestrator: Orchestrator, project: ProjectInfo) -> Self {
        Self {
            orchestrator,
            project,
            session: Session::new(),
            tools: get_tool_definitions(),
        }
    }

    /// Create a server talking to the HTTP store described by `config`
    pub fn from_config(config: StoreConfig) -> Result<Self> {
        let project = ProjectInfo {
            project_id: config.project_id.clone(),
            dataset: config.dataset.clone(),
        };
        let store: Arc<dyn ContentStore> = Arc::new(HttpStore::new(config)?);
        Ok(Self::new(Orchestrator::new(store), project))
    }

    /// Run the MCP server
    ///
    /// Processes MCP protocol messages over stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        tracing::info!(
            project = %self.project.project_id,
            dataset = %self.project.dataset,
            "MCP server ready, listening on stdio"
        );

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            tracing::debug!(request = %line, "Received message");

            match self.handle_message(&line).await {
                Ok(response) if !response.is_empty() => {
                    writeln!(stdout, "{}", response)?;
                    stdout.flush()?;
                }
                Ok(_) => {} // notification
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to handle message");
                    let error_response = JsonRpcResponse::error(
                        None,
                        codes::INTERNAL_ERROR,
                        format!("Internal error: {}", e),
                    );
                    writeln!(stdout, "{}", serde_json::to_string(&error_response)?)?;
                    stdout.flush()?;
                }
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle a single MCP message
    ///
    /// Returns the JSON-RPC response as a string, or an empty string for
    /// notifications.
    pub async fn handle_message(&self, message: &str) -> Result<String> {
        let request: JsonRpcRequest = serde_json::from_str(message)?;

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id, request.params)?,
            "initialized" | "notifications/initialized" => return Ok(String::new()),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await?,
            _ => JsonRpcResponse::error(
                request.id,
                codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        serde_json::to_string(&response).map_err(Error::from)
    }

    fn handle_initialize(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        // clients that omit or mangle their info still get a session
        if let Ok(params) = serde_json::from_value::<InitializeParams>(params) {
            tracing::info!(
                client = %params.client_info.name,
                client_version = %params.client_info.version,
                protocol = %params.protocol_version,
                "Client connected"
            );
        }

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: "lake-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "Call get_initial_context before using any other tool.".to_string(),
            ),
        };

        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<Value> = self
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect();

        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> Result<JsonRpcResponse> {
        let tool_params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return Ok(JsonRpcResponse::error(
                    id,
                    codes::INVALID_PARAMS,
                    format!("Invalid params: {}", e),
                ));
            }
        };

        let ctx = ToolContext {
            orchestrator: &self.orchestrator,
            session: &self.session,
            project: &self.project,
        };

        let tool_result = match handle_tool_call(&ctx, &tool_params.name, tool_params.arguments).await
        {
            Ok(result) => ToolResult::text(serde_json::to_string_pretty(&result)?),
            Err(e) => {
                tracing::warn!(
                    tool = %tool_params.name,
                    kind = e.kind(),
                    error = %e,
                    "Tool call failed"
                );
                ToolResult::failure(e.kind(), e.to_string())
            }
        };
        Ok(JsonRpcResponse::success(id, serde_json::to_value(tool_result)?))
    }

    pub fn project(&self) -> &ProjectInfo {
        &self.project
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lake_core::{ActionResponse, DatasetInfo, action::Action};
    use serde_json::Map;

    /// Store that answers nothing; enough for protocol-level tests
    struct NullStore;

    #[async_trait::async_trait]
    impl ContentStore for NullStore {
        async fn fetch(&self, _: &str, _: &Map<String, Value>) -> lake_core::Result<Value> {
            Ok(Value::Array(Vec::new()))
        }
        async fn get_document(&self, _: &str) -> lake_core::Result<Option<Value>> {
            Ok(None)
        }
        async fn create(&self, document: Value) -> lake_core::Result<Value> {
            Ok(document)
        }
        async fn delete(&self, _: &str) -> lake_core::Result<()> {
            Ok(())
        }
        async fn submit_actions(&self, _: &[Action]) -> lake_core::Result<ActionResponse> {
            Ok(ActionResponse::Committed {
                transaction_id: "tx".to_string(),
            })
        }
        async fn list_datasets(&self) -> lake_core::Result<Vec<DatasetInfo>> {
            Ok(Vec::new())
        }
    }

    fn server() -> LakeMcpServer {
        LakeMcpServer::new(Orchestrator::new(Arc::new(NullStore)), ProjectInfo::default())
    }

    async fn call(server: &LakeMcpServer, message: Value) -> Value {
        let response = server.handle_message(&message.to_string()).await.unwrap();
        serde_json::from_str(&response).unwrap()
    }

    #[test]
    fn server_creation_loads_tools() {
        let server = server();
        assert_eq!(server.tools().len(), 19);
        assert!(!server.session().is_context_loaded());
    }

    #[tokio::test]
    async fn ping_returns_empty_result() {
        let response = call(&server(), json!({"jsonrpc": "2.0", "id": 7, "method": "ping"})).await;
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"], json!({}));
    }

    #[tokio::test]
    async fn notification_has_no_response() {
        let response = server()
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await
            .unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn malformed_tool_call_params_are_invalid_params() {
        let response = call(
            &server(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"arguments": {}}}),
        )
        .await;
        assert_eq!(response["error"]["code"], codes::INVALID_PARAMS);
    }
}
