//! Tool registry for MCP tools.
//!
//! The gateway exposes a fixed set of read-only tools. Their definitions and
//! input schemas live here; dispatch lives in the `executor` module.

use crate::protocol::{ToolAnnotations, ToolDefinition};
use quarry_core::ABSOLUTE_MAX_LIMIT;
use serde_json::{Value, json};
use std::collections::HashMap;

pub const LIST_DATABASES: &str = "list_databases";
pub const INFER_DATABASE: &str = "infer_database";
pub const LIST_TABLES: &str = "list_tables";
pub const DESCRIBE_TABLE: &str = "describe_table";
pub const SELECT_ROWS: &str = "select_rows";
pub const CURRENT_DATABASE: &str = "current_database";
pub const USE_DATABASE: &str = "use_database";
pub const REFRESH_SCHEMA: &str = "refresh_schema";

/// Registry of available MCP tools.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolDefinition>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every gateway tool.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for tool in builtin_tools() {
            registry.register(tool);
        }
        registry
    }

    /// Register a tool.
    pub fn register(&mut self, tool: ToolDefinition) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// List all tools, sorted by name.
    pub fn list(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn tool(name: &str, description: &str, input_schema: Value, idempotent: bool) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema,
        annotations: Some(ToolAnnotations {
            read_only: Some(true),
            idempotent: Some(idempotent),
        }),
    }
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false
    })
}

fn identifier_schema(description: &str) -> Value {
    json!({
        "type": "string",
        "description": description,
        "pattern": "^[A-Za-z0-9_]{1,64}$"
    })
}

fn builtin_tools() -> Vec<ToolDefinition> {
    let db = identifier_schema("Database name. Defaults to the session database.");
    let table = identifier_schema("Table name.");

    vec![
        tool(
            LIST_DATABASES,
            "List the databases visible to the gateway.",
            object_schema(json!({}), &[]),
            true,
        ),
        tool(
            INFER_DATABASE,
            "Infer which database a project uses by scanning its configuration and source files. \
             On success the database becomes the session default.",
            object_schema(
                json!({
                    "project_root": {
                        "type": "string",
                        "description": "Directory to scan. Defaults to the configured project root."
                    },
                    "include_evidence": {
                        "type": "boolean",
                        "default": false,
                        "description": "Return aggregate match counts per candidate."
                    }
                }),
                &[],
            ),
            false,
        ),
        tool(
            LIST_TABLES,
            "List the tables of a database.",
            object_schema(json!({ "db": db }), &[]),
            true,
        ),
        tool(
            DESCRIBE_TABLE,
            "Describe the columns and primary key of a table.",
            object_schema(json!({ "table": table, "db": db }), &["table"]),
            true,
        ),
        tool(
            SELECT_ROWS,
            "Read rows from a table. Filters are structured predicates; values are always bound as parameters.",
            object_schema(
                json!({
                    "table": table,
                    "db": db,
                    "columns": {
                        "type": "array",
                        "items": identifier_schema("Column name."),
                        "description": "Columns to return. Defaults to every column."
                    },
                    "where": {
                        "description": "Equality map {\"col\": value}, predicate {\"field\", \"op\", \"value\"}, \
                                        a list of predicates (all must hold), or {\"all\"|\"any\": [...]}.",
                        "type": ["object", "array", "null"]
                    },
                    "order_by": {
                        "description": "\"col\", \"-col\", \"col desc\", {\"column\", \"direction\"}, or a list of these.",
                        "type": ["string", "object", "array", "null"]
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": ABSOLUTE_MAX_LIMIT,
                        "description": "Maximum rows returned. Defaults to 100."
                    }
                }),
                &["table"],
            ),
            true,
        ),
        tool(
            CURRENT_DATABASE,
            "Show the session's current database, if one is set.",
            object_schema(json!({}), &[]),
            true,
        ),
        tool(
            USE_DATABASE,
            "Set the session's current database.",
            object_schema(json!({ "db": identifier_schema("Database name.") }), &["db"]),
            true,
        ),
        tool(
            REFRESH_SCHEMA,
            "Reload database, table and column metadata from the server.",
            object_schema(json!({}), &[]),
            false,
        ),
    ]
}
