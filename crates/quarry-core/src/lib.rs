// Configuration types shared across all Quarry crates
pub mod config;

// Identifier charset and quoting
pub mod identifier;

// Re-export commonly used config types for convenience
pub use config::{
    CatalogConfig, ConfigError, GuardrailsConfig, InferenceConfig, McpConfig, PoolConfig,
    QuarryConfig, SignalWeights, Transport, UpstreamConfig,
};
pub use identifier::{display_identifier, is_valid_identifier, quote_identifier};

/// Hard ceiling on rows a single read may return, whatever the configuration says.
pub const ABSOLUTE_MAX_LIMIT: u64 = 1000;
