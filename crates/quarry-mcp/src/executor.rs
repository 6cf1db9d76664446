//! Tool execution.
//!
//! Every tool call takes the current schema snapshot, resolves its target
//! database through the session, and validates names against the snapshot
//! before anything reaches the database.

use quarry_catalog::SchemaCatalog;
use quarry_core::GuardrailsConfig;
use quarry_infer::InferenceEngine;
use quarry_policy::{LimitPolicy, QueryCompiler, SelectRequest, Whitelist};
use quarry_runtime::{QueryExecutor, run_bounded};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::GatewayError;
use crate::session::{DatabaseResolver, Session};
use crate::tools;

#[derive(Debug, Default, Deserialize)]
struct InferArgs {
    #[serde(default)]
    project_root: Option<PathBuf>,
    #[serde(default)]
    include_evidence: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DbArgs {
    #[serde(default)]
    db: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DescribeArgs {
    table: String,
    #[serde(default)]
    db: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UseArgs {
    db: String,
}

/// Executes gateway tools against the catalog and the upstream database.
pub struct ToolExecutor {
    catalog: Arc<SchemaCatalog>,
    executor: Arc<dyn QueryExecutor>,
    compiler: QueryCompiler,
    resolver: DatabaseResolver,
    query_timeout: Duration,
}

impl ToolExecutor {
    pub fn new(
        catalog: Arc<SchemaCatalog>,
        executor: Arc<dyn QueryExecutor>,
        engine: InferenceEngine,
        guardrails: &GuardrailsConfig,
    ) -> Self {
        Self {
            catalog,
            executor,
            compiler: QueryCompiler::new(LimitPolicy::from(guardrails)),
            resolver: DatabaseResolver::new(engine),
            query_timeout: Duration::from_secs(guardrails.query_timeout_secs),
        }
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn resolver(&self) -> &DatabaseResolver {
        &self.resolver
    }

    /// Run one tool call within `session`.
    pub async fn execute(
        &self,
        tool: &str,
        arguments: Value,
        session: &Session,
    ) -> Result<Value, GatewayError> {
        debug!(tool, "Executing tool");
        match tool {
            tools::LIST_DATABASES => self.list_databases().await,
            tools::INFER_DATABASE => self.infer_database(parse(tool, arguments)?, session).await,
            tools::LIST_TABLES => self.list_tables(parse(tool, arguments)?, session).await,
            tools::DESCRIBE_TABLE => self.describe_table(parse(tool, arguments)?, session).await,
            tools::SELECT_ROWS => self.select_rows(parse(tool, arguments)?, session).await,
            tools::CURRENT_DATABASE => self.current_database(session).await,
            tools::USE_DATABASE => self.use_database(parse(tool, arguments)?, session).await,
            tools::REFRESH_SCHEMA => self.refresh_schema(session).await,
            other => Err(GatewayError::InvalidArguments {
                tool: other.to_string(),
                reason: "unknown tool".to_string(),
            }),
        }
    }

    async fn list_databases(&self) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.snapshot().await?;
        Ok(json!(Whitelist::new(&snapshot).databases()))
    }

    async fn infer_database(&self, args: InferArgs, session: &Session) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.snapshot().await?;
        let mut state = session.lock().await;
        let result = self
            .resolver
            .infer(&mut state, &snapshot, args.project_root)
            .await?;

        if args.include_evidence {
            Ok(json!({ "db": result.database, "evidence": result.evidence }))
        } else {
            Ok(json!({ "db": result.database }))
        }
    }

    async fn list_tables(&self, args: DbArgs, session: &Session) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.snapshot().await?;
        let db = {
            let mut state = session.lock().await;
            self.resolver
                .resolve(&mut state, &snapshot, args.db.as_deref())
                .await?
        };
        Ok(json!(Whitelist::new(&snapshot).tables(&db)?))
    }

    async fn describe_table(
        &self,
        args: DescribeArgs,
        session: &Session,
    ) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.snapshot().await?;
        let db = {
            let mut state = session.lock().await;
            self.resolver
                .resolve(&mut state, &snapshot, args.db.as_deref())
                .await?
        };
        let table = Whitelist::new(&snapshot).describe(&db, &args.table)?;
        Ok(json!({
            "db": db,
            "table": table.name,
            "comment": table.comment,
            "columns": table.columns,
            "primary_key": table.primary_key(),
            "indexes": table.indexes,
        }))
    }

    async fn select_rows(
        &self,
        request: SelectRequest,
        session: &Session,
    ) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.snapshot().await?;
        let db = {
            let mut state = session.lock().await;
            self.resolver
                .resolve(&mut state, &snapshot, request.db.as_deref())
                .await?
        };

        let query = request.plan(&db, &Whitelist::new(&snapshot), &self.compiler)?;
        let rows = run_bounded(self.executor.as_ref(), &query, self.query_timeout).await?;
        info!(
            database = %query.database,
            table = %query.table,
            rows = rows.len(),
            "select_rows completed"
        );

        Ok(json!({
            "db": query.database,
            "table": query.table,
            "columns": query.columns,
            "row_count": rows.len(),
            "limit": query.limit,
            "rows": rows,
        }))
    }

    async fn current_database(&self, session: &Session) -> Result<Value, GatewayError> {
        let mut state = session.lock().await;
        // The session database is checked against the last published
        // snapshot only; reading it never triggers a fetch.
        let db = match self.catalog.published() {
            Some(snapshot) => self.resolver.current_database(&mut state, &snapshot),
            None => None,
        };
        Ok(json!({ "db": db }))
    }

    async fn use_database(&self, args: UseArgs, session: &Session) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.snapshot().await?;
        let mut state = session.lock().await;
        self.resolver.set_database(&mut state, &snapshot, &args.db)?;
        Ok(json!({ "db": args.db }))
    }

    async fn refresh_schema(&self, session: &Session) -> Result<Value, GatewayError> {
        let snapshot = self.catalog.refresh().await?;
        let mut state = session.lock().await;
        self.resolver.current_database(&mut state, &snapshot);
        Ok(json!({
            "generation": snapshot.generation,
            "databases": snapshot.database_names(),
        }))
    }
}

/// Decode tool arguments. Absent arguments decode as an empty object.
fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, GatewayError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| GatewayError::invalid_arguments(tool, &e))
}
