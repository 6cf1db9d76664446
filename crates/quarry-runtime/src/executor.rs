use async_trait::async_trait;
use quarry_policy::CompiledQuery;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// One result row, keyed by column name in selection order.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The query did not finish within the configured timeout.
    #[error("query exceeded the {}s timeout", .0.as_secs())]
    Timeout(Duration),

    /// The database rejected or failed the query. The source is logged,
    /// never shown to callers.
    #[error("query failed")]
    Failed(#[source] anyhow::Error),
}

impl ExecutionError {
    /// Timeouts may succeed on a later attempt; failures will not.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a compiled, single-statement `SELECT` and decode its rows.
    async fn fetch_rows(&self, query: &CompiledQuery) -> Result<Vec<Row>, ExecutionError>;
}

/// Execute `query` with a timeout and cap the result at `query.limit` rows.
pub async fn run_bounded(
    executor: &dyn QueryExecutor,
    query: &CompiledQuery,
    timeout: Duration,
) -> Result<Vec<Row>, ExecutionError> {
    let mut rows = match tokio::time::timeout(timeout, executor.fetch_rows(query)).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(
                database = %query.database,
                table = %query.table,
                timeout_secs = timeout.as_secs(),
                "Query timed out"
            );
            return Err(ExecutionError::Timeout(timeout));
        }
    };
    let limit = usize::try_from(query.limit).unwrap_or(usize::MAX);
    rows.truncate(limit);
    Ok(rows)
}
