//! Configuration types for the Quarry query gateway.
//!
//! Configuration is loaded from a single YAML file (`quarry.yaml`) and then
//! overlaid with the conventional `DB_*` environment variables so the gateway
//! can run with no file at all.
//!
//! # Sections
//!
//! - **upstream**: MySQL endpoint and pool sizing (read-only credential expected)
//! - **mcp**: transport selection for the MCP server
//! - **guardrails**: row limits and query timeout
//! - **catalog**: schema snapshot freshness and database exclusions
//! - **inference**: project scan budgets and signal weights

pub mod inference;
pub mod mcp;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use inference::{InferenceConfig, SignalWeights};
pub use mcp::{McpConfig, Transport};
pub use upstream::{PoolConfig, UpstreamConfig};

use crate::ABSOLUTE_MAX_LIMIT;

/// Complete Quarry configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// Upstream MySQL connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// MCP server configuration.
    #[serde(default)]
    pub mcp: McpConfig,

    /// Row limits and timeouts applied to every read.
    #[serde(default)]
    pub guardrails: GuardrailsConfig,

    /// Schema snapshot policy.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Database inference budgets and weights.
    #[serde(default)]
    pub inference: InferenceConfig,
}

/// Global guardrails configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailsConfig {
    /// Limit applied when a request omits one.
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Largest limit a request may ask for. Requests above it are rejected.
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,

    /// Per-query execution timeout in seconds.
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

/// Schema catalog configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Age after which a cached snapshot is refreshed on next use.
    /// `None` keeps a snapshot until it is explicitly invalidated.
    #[serde(default)]
    pub max_age_secs: Option<u64>,

    /// Databases hidden in addition to the built-in system databases.
    #[serde(default)]
    pub excluded_databases: Vec<String>,

    /// Delay before the single retry of a failed metadata fetch.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            max_age_secs: None,
            excluded_databases: Vec::new(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

// Default value functions
fn default_limit() -> u64 {
    100
}

fn default_max_limit() -> u64 {
    ABSOLUTE_MAX_LIMIT
}

fn default_query_timeout_secs() -> u64 {
    30
}

fn default_retry_delay_ms() -> u64 {
    200
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl QuarryConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Overlay `DB_HOST`, `DB_PORT`, `DB_USER` and `DB_PASS` from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay environment values obtained through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.upstream.apply_env_from(lookup)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.guardrails;
        if g.max_limit == 0 || g.max_limit > ABSOLUTE_MAX_LIMIT {
            return Err(ConfigError::Config(format!(
                "guardrails.max_limit must be between 1 and {}, got {}",
                ABSOLUTE_MAX_LIMIT, g.max_limit
            )));
        }
        if g.default_limit == 0 || g.default_limit > g.max_limit {
            return Err(ConfigError::Config(format!(
                "guardrails.default_limit must be between 1 and {}, got {}",
                g.max_limit, g.default_limit
            )));
        }
        if g.query_timeout_secs == 0 {
            return Err(ConfigError::Config(
                "guardrails.query_timeout_secs must be positive".to_string(),
            ));
        }
        self.mcp.validate()?;
        self.inference.validate()
    }
}
