//! Error types for the MCP crate.

use quarry_catalog::CatalogError;
use quarry_infer::InferenceError;
use quarry_policy::ValidationError;
use quarry_runtime::ExecutionError;
use serde_json::{Value, json};
use thiserror::Error;

/// Errors that can occur in the MCP server.
#[derive(Debug, Error)]
pub enum McpError {
    /// Failed to start the server.
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// A failed tool call, reported to the caller as an `isError` result.
///
/// Every variant maps to one stable kind string. Messages never carry file
/// paths, file content, driver output or names that fail the identifier
/// charset.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(
        "no default database: pass `db`, call use_database, or run infer_database on the project"
    )]
    NoDefaultDatabase,

    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
}

impl GatewayError {
    /// Wrap an argument decoding failure without echoing caller values.
    pub fn invalid_arguments(tool: &str, err: &serde_json::Error) -> Self {
        let text = err.to_string();
        // Missing-field messages name only the schema field.
        let reason = if text.starts_with("missing field") {
            text.split(" at line").next().unwrap_or("missing field").to_string()
        } else {
            "arguments do not match the tool's input schema".to_string()
        };
        Self::InvalidArguments {
            tool: tool.to_string(),
            reason,
        }
    }

    /// Stable kind name reported to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Catalog(CatalogError::Unavailable(_)) => "CatalogUnavailable",
            Self::Validation(e) => e.kind_str(),
            Self::Inference(InferenceError::NoSignalsFound) => "NoSignalsFound",
            Self::Inference(InferenceError::Ambiguous { .. }) => "AmbiguousInference",
            Self::Inference(InferenceError::ScanAborted(_)) => "ScanAborted",
            Self::Execution(ExecutionError::Timeout(_)) => "QueryTimeout",
            Self::Execution(ExecutionError::Failed(_)) => "QueryFailed",
            Self::NoDefaultDatabase => "NoDefaultDatabase",
            Self::InvalidArguments { .. } => "InvalidArguments",
        }
    }

    /// Whether the same call may succeed if simply repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Catalog(_) => true,
            Self::Execution(e) => e.is_retryable(),
            Self::Inference(InferenceError::ScanAborted(_)) => true,
            _ => false,
        }
    }

    /// JSON body placed in the tool result.
    pub fn to_body(&self) -> Value {
        json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        })
    }
}
