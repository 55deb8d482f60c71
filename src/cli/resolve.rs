//! Resolve command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::utils::build_ingestor;
use crate::ingest::IngestRequest;

#[derive(Args)]
pub struct ResolveArgs {
    /// Repository URL (github.com or gitlab.com)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Branch to resolve (defaults to the remote HEAD)
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Config file (TOML or YAML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: ResolveArgs) -> Result<()> {
    let ingestor = build_ingestor(args.config.as_deref())?;
    let request = IngestRequest { repo_url: args.url, branch: args.branch, commit: None };
    println!("{}", ingestor.resolve(&request)?);
    Ok(())
}
