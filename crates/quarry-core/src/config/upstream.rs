//! Upstream MySQL connection configuration.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Configuration for the upstream MySQL connection.
///
/// No database name is configured here. The gateway connects without a
/// default schema and every query names its database explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Hostname of the MySQL server.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the MySQL server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username for the upstream connection.
    #[serde(default = "default_username")]
    pub username: String,

    /// Password for the upstream connection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable holding the password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// Environment variable holding a full `mysql://` URL. Takes precedence
    /// over the individual fields when set and present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url_env: Option<String>,

    /// Connection pool settings.
    #[serde(default)]
    pub pool: PoolConfig,
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_acquire_timeout_seconds")]
    pub acquire_timeout_seconds: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: default_max_connections(),
            acquire_timeout_seconds: default_acquire_timeout_seconds(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: default_username(),
            password: None,
            password_env: None,
            database_url_env: None,
            pool: PoolConfig::default(),
        }
    }
}

impl UpstreamConfig {
    /// Full connection URL from `database_url_env`, if configured and set.
    pub fn database_url(&self) -> Option<String> {
        self.database_url_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
    }

    /// Password from `password_env` when present, otherwise the inline value.
    pub fn resolve_password(&self) -> Option<String> {
        if let Some(var) = &self.password_env {
            if let Ok(value) = std::env::var(var) {
                return Some(value);
            }
        }
        self.password.clone()
    }

    /// Connection target without credentials, safe to log.
    pub fn display_target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    pub(crate) fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DB_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("DB_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Config(format!("DB_PORT is not a valid port: {port}")))?;
        }
        if let Some(user) = lookup("DB_USER") {
            self.username = user;
        }
        if let Some(pass) = lookup("DB_PASS") {
            self.password = Some(pass);
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_username() -> String {
    "root".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_seconds() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_target_omits_password() {
        let config = UpstreamConfig {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let target = config.display_target();
        assert_eq!(target, "root@127.0.0.1:3306");
        assert!(!target.contains("hunter2"));
    }

    #[test]
    fn inline_password_used_without_env() {
        let config = UpstreamConfig {
            password: Some("pw".to_string()),
            password_env: Some("QUARRY_TEST_UNSET_PASSWORD_VAR".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolve_password().as_deref(), Some("pw"));
    }
}
