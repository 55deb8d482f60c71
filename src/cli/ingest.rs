//! Ingest command implementation

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::utils::{ingest_snapshot, write_output, SnapshotArgs};
use crate::domain::SnapshotSource;
use crate::render::format_files;

#[derive(Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub snapshot: SnapshotArgs,

    /// Write the canonical text to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: IngestArgs) -> Result<()> {
    let outcome = ingest_snapshot(&args.snapshot)?;
    let snapshot = &outcome.snapshot;

    let origin = match outcome.source {
        SnapshotSource::Cache => "cached",
        SnapshotSource::Fresh => "fresh",
    };
    eprintln!("{} ({} files, {})", snapshot.key, snapshot.files.len(), origin);

    write_output(&format_files(&snapshot.files), args.output.as_deref())
}
