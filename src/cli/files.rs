//! Files command implementation

use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

use super::utils::{ingest_snapshot, write_output, SnapshotArgs};
use crate::render::format_files;

#[derive(Args)]
pub struct FilesArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Repository-relative path to include (repeatable)
    #[arg(short, long = "path", value_name = "PATH", required = true)]
    pub paths: Vec<String>,

    /// Write the canonical text to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: FilesArgs) -> Result<()> {
    let outcome = ingest_snapshot(&args.snapshot)?;
    let selected = outcome.snapshot.select(args.paths.as_slice());
    if selected.is_empty() {
        bail!("No files in {} match the requested paths", outcome.snapshot.key);
    }
    if selected.len() < args.paths.len() {
        eprintln!("warning: {} of {} requested paths matched", selected.len(), args.paths.len());
    }
    write_output(&format_files(selected), args.output.as_deref())
}
