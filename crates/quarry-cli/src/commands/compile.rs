//! `quarry compile` - dry run of a `select_rows` request.
//!
//! The request is checked against the tool's input schema, validated
//! against the live catalog and compiled. Nothing is executed.

use anyhow::{Context, Result, bail};
use clap::Args;
use quarry_core::QuarryConfig;
use quarry_mcp::{Session, ToolRegistry, tools};
use quarry_policy::{CompiledQuery, SelectRequest, Whitelist};
use serde_json::{Value, json};
use std::io::Read;
use std::path::{Path, PathBuf};

use super::{Gateway, gateway_error, print_json};

/// Arguments for `quarry compile`.
#[derive(Debug, Args)]
pub struct CompileArgs {
    /// JSON request file, or `-` for stdin.
    #[arg(long)]
    pub request: PathBuf,
}

pub async fn execute(config: QuarryConfig, args: CompileArgs) -> Result<()> {
    let raw = read_request(&args.request)?;
    let request = parse_request(&raw)?;

    let gateway = Gateway::connect(&config)?;
    let snapshot = gateway
        .catalog
        .snapshot()
        .await
        .map_err(|e| gateway_error(e.into()))?;

    let session = Session::new();
    let db = {
        let mut state = session.lock().await;
        gateway
            .tools
            .resolver()
            .resolve(&mut state, &snapshot, request.db.as_deref())
            .await
            .map_err(gateway_error)?
    };

    let query = request
        .plan(&db, &Whitelist::new(&snapshot), gateway.tools.compiler())
        .map_err(|e| gateway_error(e.into()))?;
    print_json(&summary(&query))
}

fn read_request(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read request from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file: {}", path.display()))
    }
}

/// Parse a request and check its shape against the `select_rows` input
/// schema. Limit bounds are left to the compiler so that an out-of-range
/// limit reports `LimitOutOfRange`, as it does over MCP.
fn parse_request(raw: &str) -> Result<SelectRequest> {
    let value: Value = serde_json::from_str(raw).context("Request is not valid JSON")?;

    let registry = ToolRegistry::builtin();
    let Some(tool) = registry.get(tools::SELECT_ROWS) else {
        bail!("select_rows tool is not registered");
    };
    let mut schema = tool.input_schema.clone();
    if let Some(limit) = schema
        .pointer_mut("/properties/limit")
        .and_then(Value::as_object_mut)
    {
        limit.remove("minimum");
        limit.remove("maximum");
        limit.insert("type".to_string(), json!("number"));
    }
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| anyhow::anyhow!("Invalid select_rows schema: {}", e))?;
    let problems: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| e.to_string())
        .collect();
    if !problems.is_empty() {
        bail!("Request does not match the select_rows schema:\n  {}", problems.join("\n  "));
    }

    serde_json::from_value(value).context("Request does not match the select_rows arguments")
}

/// Template and shape of a compiled query. Parameter values are omitted.
fn summary(query: &CompiledQuery) -> Value {
    json!({
        "db": query.database,
        "table": query.table,
        "sql": query.sql,
        "param_count": query.params.len(),
        "columns": query.columns,
        "limit": query.limit,
    })
}
