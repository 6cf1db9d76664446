use async_trait::async_trait;
use quarry_core::UpstreamConfig;
use quarry_policy::{CompiledQuery, SqlValue};
use quarry_runtime::{ExecutionError, QueryExecutor, Row};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use sqlx::{Executor, MySqlPool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

mod decode;
pub mod introspect;

/// Statements run on every new pooled connection. The gateway only reads;
/// these make the server refuse writes as well.
const SESSION_SETUP: &[&str] = &[
    "SET SESSION TRANSACTION READ ONLY",
    "SET SESSION sql_safe_updates = 1",
];

/// MySQL / MariaDB adapter backing both the schema catalog and query execution.
#[derive(Clone)]
pub struct MySqlAdapter {
    pool: MySqlPool,
}

impl MySqlAdapter {
    /// Build a lazily connecting pool. No connection is attempted until the
    /// first metadata fetch or query.
    pub fn connect_lazy(upstream: &UpstreamConfig) -> anyhow::Result<Self> {
        let options = connect_options(upstream)?;
        let pool = MySqlPoolOptions::new()
            .max_connections(upstream.pool.max_connections)
            .acquire_timeout(Duration::from_secs(upstream.pool.acquire_timeout_seconds))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    for stmt in SESSION_SETUP {
                        conn.execute(*stmt).await?;
                    }
                    Ok(())
                })
            })
            .connect_lazy_with(options);

        info!(target = %upstream.display_target(), "Configured MySQL pool");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

/// Connection options without a default database.
pub fn connect_options(upstream: &UpstreamConfig) -> anyhow::Result<MySqlConnectOptions> {
    if let Some(url) = upstream.database_url() {
        return MySqlConnectOptions::from_str(&url)
            .map_err(|e| anyhow::anyhow!("Invalid database URL: {}", e));
    }
    let mut options = MySqlConnectOptions::new()
        .host(&upstream.host)
        .port(upstream.port)
        .username(&upstream.username);
    if let Some(password) = upstream.resolve_password() {
        options = options.password(&password);
    }
    Ok(options)
}

#[async_trait]
impl QueryExecutor for MySqlAdapter {
    async fn fetch_rows(&self, query: &CompiledQuery) -> Result<Vec<Row>, ExecutionError> {
        let mut stmt = sqlx::query(&query.sql);
        for param in &query.params {
            stmt = match param {
                SqlValue::Bool(v) => stmt.bind(*v),
                SqlValue::Int(v) => stmt.bind(*v),
                SqlValue::UInt(v) => stmt.bind(*v),
                SqlValue::Float(v) => stmt.bind(*v),
                SqlValue::Text(v) => stmt.bind(v.as_str()),
            };
        }

        let rows = stmt.fetch_all(&self.pool).await.map_err(|e| {
            warn!(
                database = %query.database,
                table = %query.table,
                error = %e,
                "MySQL query failed"
            );
            ExecutionError::Failed(anyhow::Error::new(e))
        })?;

        Ok(rows
            .iter()
            .map(|row| decode::row_to_json(row, &query.columns))
            .collect())
    }
}
