//! # quarry-mcp
//!
//! MCP (Model Context Protocol) server for Quarry.
//!
//! The server exposes a fixed set of read-only tools that let an AI agent
//! discover databases and read rows without ever writing SQL:
//!
//! | Tool | Purpose |
//! |------|---------|
//! | `list_databases` | Databases visible to the gateway |
//! | `infer_database` | Pick a project's database from its files |
//! | `list_tables` | Tables of a database |
//! | `describe_table` | Columns and primary key of a table |
//! | `select_rows` | Structured, parameterized, bounded read |
//! | `current_database` / `use_database` | Session default database |
//! | `refresh_schema` | Reload metadata |
//!
//! ## Request path
//!
//! ```text
//! AI Agent
//!       │  tools/call (stdio or HTTP)
//!       ▼
//! ┌──────────────────────┐
//! │ 1. Snapshot catalog  │  ← quarry-catalog
//! │ 2. Resolve database  │  ← session / quarry-infer
//! │ 3. Whitelist names   │  ← quarry-policy
//! │ 4. Compile SELECT    │
//! │ 5. Execute, bounded  │  ← quarry-runtime
//! └──────────┬───────────┘
//!            ▼
//!        Upstream MySQL
//! ```

pub mod error;
pub mod executor;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod session;
pub mod tools;

pub use error::{GatewayError, McpError};
pub use executor::ToolExecutor;
pub use http_transport::{HttpServer, HttpTransportState, SESSION_HEADER, create_router};
pub use protocol::{
    CallToolParams, CallToolResponse, JsonRpcRequest, JsonRpcResponse, ToolAnnotations,
    ToolContent, ToolDefinition,
};
pub use server::McpServer;
pub use session::{DatabaseResolver, Session, SessionState, SessionStore};
pub use tools::ToolRegistry;
