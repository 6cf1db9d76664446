//! `quarry databases` and `quarry tables`.

use anyhow::Result;
use clap::Args;
use quarry_core::QuarryConfig;
use serde_json::json;

use super::{Gateway, print_json};

/// Arguments for `quarry tables`.
#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Database to list. Defaults to the inferred or only database.
    #[arg(long)]
    pub db: Option<String>,
}

pub async fn databases(config: QuarryConfig) -> Result<()> {
    let gateway = Gateway::connect(&config)?;
    print_json(&gateway.call("list_databases", json!({})).await?)
}

pub async fn tables(config: QuarryConfig, args: TablesArgs) -> Result<()> {
    let gateway = Gateway::connect(&config)?;
    print_json(&gateway.call("list_tables", json!({ "db": args.db })).await?)
}
