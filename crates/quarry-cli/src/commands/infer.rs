//! `quarry infer` - infer the database a project uses.

use anyhow::Result;
use clap::Args;
use quarry_core::QuarryConfig;
use serde_json::json;
use std::path::PathBuf;

use super::{Gateway, print_json};

/// Arguments for `quarry infer`.
#[derive(Debug, Args)]
pub struct InferArgs {
    /// Project directory to scan. Defaults to the configured project root.
    #[arg(long)]
    pub project: Option<PathBuf>,

    /// Include aggregate evidence in the output.
    #[arg(long)]
    pub evidence: bool,
}

pub async fn execute(config: QuarryConfig, args: InferArgs) -> Result<()> {
    let gateway = Gateway::connect(&config)?;
    let result = gateway
        .call(
            "infer_database",
            json!({
                "project_root": args.project,
                "include_evidence": args.evidence,
            }),
        )
        .await?;
    print_json(&result)
}
