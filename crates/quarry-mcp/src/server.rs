//! MCP server implementation.
//!
//! This module provides the main MCP server that handles tool discovery
//! and execution for the read-only gateway.

use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::http_transport::HttpServer;
use crate::protocol::*;
use crate::session::Session;
use crate::tools::ToolRegistry;
use quarry_core::{McpConfig, Transport};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

/// The MCP server.
#[derive(Clone)]
pub struct McpServer {
    config: McpConfig,
    tools: ToolRegistry,
    executor: Arc<ToolExecutor>,
}

impl McpServer {
    /// Create a new MCP server exposing every gateway tool.
    pub fn new(config: McpConfig, executor: ToolExecutor) -> Self {
        Self {
            config,
            tools: ToolRegistry::builtin(),
            executor: Arc::new(executor),
        }
    }

    pub fn config(&self) -> &McpConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn executor(&self) -> &Arc<ToolExecutor> {
        &self.executor
    }

    /// Start the MCP server on the configured transport.
    pub async fn run(self) -> Result<(), McpError> {
        match self.config.transport {
            Transport::Stdio => self.run_stdio().await,
            Transport::Http => self.run_http().await,
        }
    }

    /// Serve newline-delimited JSON-RPC on stdin/stdout as a single session.
    ///
    /// Stdout carries protocol messages only; logs go to stderr.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        info!("Starting MCP server with stdio transport");

        let session = Session::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(line) {
                Ok(request) if request.is_notification() => {
                    self.handle_request(request, &session).await;
                    continue;
                }
                Ok(request) => self.handle_request(request, &session).await,
                Err(e) => {
                    debug!(error = %e, "Unparseable request");
                    JsonRpcResponse::error(None, PARSE_ERROR, "Parse error")
                }
            };

            let mut payload = serde_json::to_vec(&response)?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }

        info!("stdin closed; MCP server exiting");
        Ok(())
    }

    /// Serve JSON-RPC over HTTP.
    pub async fn run_http(self) -> Result<(), McpError> {
        let addr = self.config.bind_address();
        HttpServer::new(Arc::new(self), addr).run().await
    }

    /// Handle a JSON-RPC request within `session`.
    pub async fn handle_request(&self, request: JsonRpcRequest, session: &Session) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" | "notifications/initialized" | "ping" => {
                JsonRpcResponse::success(id, json!({}))
            }
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params, session).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(id, METHOD_NOT_FOUND, "Method not found"),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "quarry-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools: Vec<_> = self.tools.list().into_iter().cloned().collect();
        match serde_json::to_value(ListToolsResponse { tools }) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    async fn handle_call_tool(
        &self,
        id: Option<Value>,
        params: Option<Value>,
        session: &Session,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(_) => return JsonRpcResponse::error(id, INVALID_PARAMS, "Invalid params"),
            },
            None => return JsonRpcResponse::error(id, INVALID_PARAMS, "Missing params"),
        };

        if !self.tools.contains(&params.name) {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "Tool not found");
        }

        let response = match self
            .executor
            .execute(&params.name, params.arguments, session)
            .await
        {
            Ok(value) => CallToolResponse::json(value),
            Err(e) => {
                warn!(
                    tool = %params.name,
                    kind = e.kind(),
                    retryable = e.is_retryable(),
                    "Tool call failed"
                );
                CallToolResponse::error(e.to_string(), e.to_body())
            }
        };

        match serde_json::to_value(response) {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
        }
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_catalog::{CatalogPolicy, SchemaCatalog, StaticMetadataSource};
    use quarry_core::{GuardrailsConfig, InferenceConfig};
    use quarry_infer::InferenceEngine;
    use quarry_policy::CompiledQuery;
    use quarry_runtime::{ExecutionError, QueryExecutor, Row};

    struct NoRows;

    #[async_trait::async_trait]
    impl QueryExecutor for NoRows {
        async fn fetch_rows(&self, _query: &CompiledQuery) -> Result<Vec<Row>, ExecutionError> {
            Ok(Vec::new())
        }
    }

    fn server() -> McpServer {
        let source = StaticMetadataSource::default().with_table("shop", "orders", &[("id", "int")]);
        let catalog = Arc::new(SchemaCatalog::new(Arc::new(source), CatalogPolicy::default()));
        let executor = ToolExecutor::new(
            catalog,
            Arc::new(NoRows),
            InferenceEngine::new(InferenceConfig::default()),
            &GuardrailsConfig::default(),
        );
        McpServer::new(McpConfig::default(), executor)
    }

    #[tokio::test]
    async fn test_initialize() {
        let request = JsonRpcRequest::new(1, "initialize", None);
        let response = server().handle_request(request, &Session::new()).await;
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "quarry-mcp");
        assert!(response.error.is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let request = JsonRpcRequest::new(2, "ping", None);
        let response = server().handle_request(request, &Session::new()).await;
        assert_eq!(response.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_list_tools() {
        let request = JsonRpcRequest::new(1, "tools/list", None);
        let response = server().handle_request(request, &Session::new()).await;
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 8);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let request = JsonRpcRequest::new(1, "approvals/list", None);
        let response = server().handle_request(request, &Session::new()).await;
        let error = response.error.unwrap();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.message, "Method not found");
    }

    #[tokio::test]
    async fn test_call_nonexistent_tool() {
        let request = JsonRpcRequest::new(
            1,
            "tools/call",
            Some(json!({ "name": "drop_table", "arguments": {} })),
        );
        let response = server().handle_request(request, &Session::new()).await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_error_is_result_not_protocol_error() {
        let request = JsonRpcRequest::new(
            1,
            "tools/call",
            Some(json!({ "name": "list_tables", "arguments": { "db": "nope" } })),
        );
        let response = server().handle_request(request, &Session::new()).await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        assert_eq!(result["content"][1]["json"]["error"]["kind"], "UnknownDatabase");
    }
}
