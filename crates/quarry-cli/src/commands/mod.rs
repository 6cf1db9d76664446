//! CLI command implementations for Quarry.

pub mod catalog;
pub mod compile;
pub mod infer;
pub mod serve;

use anyhow::{Context, Result};
use quarry_adapter_mysql::MySqlAdapter;
use quarry_catalog::{CatalogPolicy, SchemaCatalog};
use quarry_core::QuarryConfig;
use quarry_infer::InferenceEngine;
use quarry_mcp::{GatewayError, Session, ToolExecutor};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

pub use catalog::TablesArgs;
pub use compile::CompileArgs;
pub use infer::InferArgs;
pub use serve::ServeArgs;

/// Load the config file (or defaults when it is absent), overlay the
/// environment and validate.
pub fn load_config(path: &Path) -> Result<QuarryConfig> {
    let mut config = if path.exists() {
        QuarryConfig::from_file(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?
    } else {
        warn!(config = %path.display(), "Config file not found, using defaults");
        QuarryConfig::default()
    };
    config
        .apply_env()
        .context("Invalid database settings in environment")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Catalog and tool executor wired to the configured MySQL server.
pub struct Gateway {
    pub catalog: Arc<SchemaCatalog>,
    pub tools: ToolExecutor,
}

impl Gateway {
    pub fn connect(config: &QuarryConfig) -> Result<Self> {
        let adapter = MySqlAdapter::connect_lazy(&config.upstream)
            .context("Failed to configure MySQL connection")?;
        let catalog = Arc::new(SchemaCatalog::new(
            Arc::new(adapter.clone()),
            CatalogPolicy::from(&config.catalog),
        ));
        let tools = ToolExecutor::new(
            catalog.clone(),
            Arc::new(adapter),
            InferenceEngine::new(config.inference.clone()),
            &config.guardrails,
        );
        Ok(Self { catalog, tools })
    }

    /// Run one tool in a throwaway session.
    pub async fn call(&self, tool: &str, arguments: Value) -> Result<Value> {
        self.tools
            .execute(tool, arguments, &Session::new())
            .await
            .map_err(gateway_error)
    }
}

pub fn gateway_error(err: GatewayError) -> anyhow::Error {
    anyhow::anyhow!("{}: {}", err.kind(), err)
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
