//! Shared test infrastructure for Quarry MCP end-to-end tests.
//!
//! This module provides:
//! - An in-memory catalog and a recording query executor
//! - Temporary project directories for inference
//! - Helpers for driving the JSON-RPC server and checking tool results

#![allow(dead_code)]

use async_trait::async_trait;
use quarry_catalog::{CatalogPolicy, MetadataSource, RawMetadata, SchemaCatalog, StaticMetadataSource};
use quarry_core::{GuardrailsConfig, InferenceConfig, McpConfig};
use quarry_infer::InferenceEngine;
use quarry_mcp::{JsonRpcRequest, McpServer, Session, ToolExecutor};
use quarry_policy::CompiledQuery;
use quarry_runtime::{ExecutionError, QueryExecutor, Row};
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

// =============================================================================
// FIXTURES
// =============================================================================

/// `shop` and `shop_test` share a `users` table; `crm` has its own.
pub fn shop_metadata() -> StaticMetadataSource {
    StaticMetadataSource::default()
        .with_table(
            "shop",
            "orders",
            &[("id", "int"), ("total", "decimal"), ("user_id", "int")],
        )
        .with_table_comment("shop", "orders", "Customer orders")
        .with_column_default("shop", "orders", "total", "0.00")
        .with_index("shop", "orders", "PRIMARY", &["id"], true)
        .with_index("shop", "orders", "idx_user", &["user_id"], false)
        .with_table("shop", "users", &[("id", "int"), ("email", "varchar")])
        .with_table("shop_test", "users", &[("id", "int"), ("email", "varchar")])
        .with_table("crm", "contacts", &[("id", "int"), ("name", "varchar")])
}

/// Metadata source whose contents can be swapped between fetches.
pub struct MutableSource {
    metadata: Mutex<RawMetadata>,
    fetches: AtomicUsize,
}

impl MutableSource {
    pub fn new(source: StaticMetadataSource) -> Self {
        Self {
            metadata: Mutex::new(source.metadata().clone()),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, source: StaticMetadataSource) {
        *self.metadata.lock().unwrap() = source.metadata().clone();
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataSource for MutableSource {
    async fn fetch(&self) -> anyhow::Result<RawMetadata> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.metadata.lock().unwrap().clone())
    }
}

/// A metadata source that always fails.
pub struct DownSource;

#[async_trait]
impl MetadataSource for DownSource {
    async fn fetch(&self) -> anyhow::Result<RawMetadata> {
        anyhow::bail!("connection refused")
    }
}

/// Query executor that records compiled queries and returns canned rows.
#[derive(Default)]
pub struct RecordingExecutor {
    queries: Mutex<Vec<CompiledQuery>>,
    rows: Vec<Row>,
    delay: Duration,
    fail: bool,
}

impl RecordingExecutor {
    pub fn with_rows(count: usize) -> Self {
        let rows = (0..count)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".into(), json!(i + 1));
                row.insert("total".into(), json!(format!("{}.00", (i + 1) * 10)));
                row
            })
            .collect();
        Self {
            rows,
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn queries(&self) -> Vec<CompiledQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn fetch_rows(&self, query: &CompiledQuery) -> Result<Vec<Row>, ExecutionError> {
        self.queries.lock().unwrap().push(query.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(ExecutionError::Failed(anyhow::anyhow!(
                "Table 'shop.orders' doesn't exist: SELECT secret FROM x"
            )));
        }
        Ok(self.rows.clone())
    }
}

/// Write `files` into a fresh temporary project directory.
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
    dir
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

pub struct TestContext {
    pub server: McpServer,
    pub session: Session,
    pub executor: Arc<RecordingExecutor>,
    pub source: Arc<MutableSource>,
    pub project: TempDir,
}

pub struct TestContextBuilder {
    metadata: StaticMetadataSource,
    executor: RecordingExecutor,
    files: Vec<(String, String)>,
    guardrails: GuardrailsConfig,
}

impl TestContextBuilder {
    pub fn metadata(mut self, metadata: StaticMetadataSource) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn executor(mut self, executor: RecordingExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn file(mut self, name: &str, content: &str) -> Self {
        self.files.push((name.to_string(), content.to_string()));
        self
    }

    pub fn guardrails(mut self, guardrails: GuardrailsConfig) -> Self {
        self.guardrails = guardrails;
        self
    }

    pub fn build(self) -> TestContext {
        let files: Vec<(&str, &str)> = self
            .files
            .iter()
            .map(|(n, c)| (n.as_str(), c.as_str()))
            .collect();
        let project = project(&files);

        let source = Arc::new(MutableSource::new(self.metadata));
        let executor = Arc::new(self.executor);
        let server = server_with(source.clone(), executor.clone(), project.path(), &self.guardrails);

        TestContext {
            server,
            session: Session::new(),
            executor,
            source,
            project,
        }
    }
}

pub fn server_with(
    source: Arc<dyn MetadataSource>,
    executor: Arc<dyn QueryExecutor>,
    project_root: &Path,
    guardrails: &GuardrailsConfig,
) -> McpServer {
    mcp_server(source, executor, project_root, guardrails, McpConfig::default())
}

pub fn mcp_server(
    source: Arc<dyn MetadataSource>,
    executor: Arc<dyn QueryExecutor>,
    project_root: &Path,
    guardrails: &GuardrailsConfig,
    mcp: McpConfig,
) -> McpServer {
    let policy = CatalogPolicy {
        retry_delay: Duration::from_millis(1),
        ..Default::default()
    };
    let catalog = Arc::new(SchemaCatalog::new(source, policy));
    let inference = InferenceConfig {
        project_root: Some(project_root.to_path_buf()),
        ..Default::default()
    };
    let tools = ToolExecutor::new(
        catalog,
        executor,
        InferenceEngine::new(inference),
        guardrails,
    );
    McpServer::new(mcp, tools)
}

impl TestContext {
    pub fn builder() -> TestContextBuilder {
        TestContextBuilder {
            metadata: shop_metadata(),
            executor: RecordingExecutor::with_rows(3),
            files: Vec::new(),
            guardrails: GuardrailsConfig::default(),
        }
    }

    /// Shop catalog, empty project directory, three canned rows.
    pub fn setup() -> TestContext {
        Self::builder().build()
    }

    /// Send `tools/call` and return the tool result object.
    pub async fn call(&self, tool: &str, arguments: Value) -> Value {
        let request = JsonRpcRequest::new(
            1,
            "tools/call",
            Some(json!({ "name": tool, "arguments": arguments })),
        );
        let response = self.server.handle_request(request, &self.session).await;
        assert!(
            response.error.is_none(),
            "protocol error calling {tool}: {:?}",
            response.error
        );
        response.result.expect("result")
    }

    /// Call a tool that must succeed and return its JSON payload.
    pub async fn call_ok(&self, tool: &str, arguments: Value) -> Value {
        let result = self.call(tool, arguments).await;
        assert_success(&result, tool);
        result["content"][0]["json"].clone()
    }

    /// Call a tool that must fail and return its error body.
    pub async fn call_err(&self, tool: &str, arguments: Value) -> Value {
        let result = self.call(tool, arguments).await;
        assert_eq!(result["isError"], true, "{tool} unexpectedly succeeded: {result}");
        result["content"][1]["json"]["error"].clone()
    }
}

// =============================================================================
// ASSERTIONS
// =============================================================================

pub fn assert_success(result: &Value, context: &str) {
    assert_eq!(
        result["isError"], false,
        "{context} failed: {}",
        result["content"]
    );
}

pub fn assert_error_kind(error: &Value, kind: &str) {
    assert_eq!(error["kind"], kind, "unexpected error: {error}");
}
