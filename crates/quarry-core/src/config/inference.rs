//! Database inference configuration.
//!
//! Budgets bound how much of a project the scanner may read; weights decide
//! how strongly each kind of signal counts toward a database.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::ConfigError;

/// Upper bound for any single signal weight and for the ambiguity margin.
pub const MAX_SIGNAL_WEIGHT: u32 = 100;

/// Configuration for the project scanner and inference engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Project root scanned when a request does not name one.
    /// Defaults to the process working directory.
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Maximum number of files read in one scan.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Bytes read from the head of each file.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Directory levels below the root visited by the walk.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Wall-clock budget for one scan, in milliseconds.
    #[serde(default = "default_time_budget_ms")]
    pub time_budget_ms: u64,

    /// A session database scoring within this many points of the top
    /// candidate makes the inference ambiguous.
    #[serde(default = "default_ambiguity_margin")]
    pub ambiguity_margin: u32,

    #[serde(default)]
    pub weights: SignalWeights,

    /// Root-level files scanned first, in order.
    #[serde(default = "default_preferred_files")]
    pub preferred_files: Vec<String>,

    /// File extensions (without the dot) considered by the walk.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names never descended into.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

/// Score contributed by one match of each signal category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalWeights {
    #[serde(default = "default_connection_string_weight")]
    pub connection_string: u32,
    #[serde(default = "default_env_assignment_weight")]
    pub env_assignment: u32,
    #[serde(default = "default_orm_config_weight")]
    pub orm_config: u32,
    #[serde(default = "default_table_literal_weight")]
    pub table_literal: u32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            connection_string: default_connection_string_weight(),
            env_assignment: default_env_assignment_weight(),
            orm_config: default_orm_config_weight(),
            table_literal: default_table_literal_weight(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            max_depth: default_max_depth(),
            time_budget_ms: default_time_budget_ms(),
            ambiguity_margin: default_ambiguity_margin(),
            weights: SignalWeights::default(),
            preferred_files: default_preferred_files(),
            extensions: default_extensions(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl InferenceConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_files == 0 {
            return Err(ConfigError::Config(
                "inference.max_files must be positive".to_string(),
            ));
        }
        if self.max_file_bytes == 0 {
            return Err(ConfigError::Config(
                "inference.max_file_bytes must be positive".to_string(),
            ));
        }
        if self.time_budget_ms == 0 {
            return Err(ConfigError::Config(
                "inference.time_budget_ms must be positive".to_string(),
            ));
        }
        if self.ambiguity_margin > MAX_SIGNAL_WEIGHT {
            return Err(ConfigError::Config(format!(
                "inference.ambiguity_margin must be at most {}",
                MAX_SIGNAL_WEIGHT
            )));
        }
        self.weights.validate()
    }
}

impl SignalWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("connection_string", self.connection_string),
            ("env_assignment", self.env_assignment),
            ("orm_config", self.orm_config),
            ("table_literal", self.table_literal),
        ];
        for (name, weight) in named {
            if !(1..=MAX_SIGNAL_WEIGHT).contains(&weight) {
                return Err(ConfigError::Config(format!(
                    "inference.weights.{} must be between 1 and {}",
                    name, MAX_SIGNAL_WEIGHT
                )));
            }
        }
        // A table mention is the weakest signal.
        if [self.connection_string, self.env_assignment, self.orm_config]
            .iter()
            .any(|w| *w <= self.table_literal)
        {
            return Err(ConfigError::Config(
                "inference.weights.table_literal must be lower than every other weight"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_files() -> usize {
    200
}

fn default_max_file_bytes() -> u64 {
    256 * 1024
}

fn default_max_depth() -> usize {
    2
}

fn default_time_budget_ms() -> u64 {
    2000
}

fn default_ambiguity_margin() -> u32 {
    2
}

fn default_connection_string_weight() -> u32 {
    5
}

fn default_env_assignment_weight() -> u32 {
    4
}

fn default_orm_config_weight() -> u32 {
    3
}

fn default_table_literal_weight() -> u32 {
    1
}

fn default_preferred_files() -> Vec<String> {
    [
        ".env",
        ".env.local",
        "env.example",
        ".env.example",
        "config.yml",
        "application.yml",
        "application.yaml",
        "application.properties",
        "config.json",
        "settings.py",
        "database.yml",
        "package.json",
        "pyproject.toml",
        "docker-compose.yml",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    [
        "env",
        "yml",
        "yaml",
        "json",
        "py",
        "ts",
        "js",
        "toml",
        "ini",
        "properties",
        "xml",
        "conf",
        "cfg",
        "sql",
        "php",
        "rb",
        "go",
        "java",
        "rs",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_skip_dirs() -> Vec<String> {
    [
        ".git",
        "node_modules",
        "target",
        "vendor",
        "dist",
        "build",
        "__pycache__",
        ".venv",
        "venv",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
