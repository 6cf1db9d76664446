//! Settings for the MCP front end.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ConfigError;

/// How agents reach the gateway, and how long HTTP sessions live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    #[serde(default)]
    pub transport: Transport,

    /// Listen address for the HTTP transport.
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,

    /// HTTP sessions unused for this long are dropped.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,

    /// Open HTTP sessions kept at most; the least recently used goes first.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

/// Wire transport. `stdio` serves one agent per process.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: default_http_host(),
            port: default_http_port(),
            session_idle_secs: default_session_idle_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl McpConfig {
    pub fn is_http(&self) -> bool {
        matches!(self.transport, Transport::Http)
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Config("mcp.host must not be empty".to_string()));
        }
        if self.session_idle_secs == 0 || self.max_sessions == 0 {
            return Err(ConfigError::Config(
                "mcp.session_idle_secs and mcp.max_sessions must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    3000
}

fn default_session_idle_secs() -> u64 {
    30 * 60
}

fn default_max_sessions() -> usize {
    256
}
