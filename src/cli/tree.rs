//! Tree command implementation

use anyhow::Result;

use super::utils::{ingest_snapshot, SnapshotArgs};
use crate::render::render_tree;

pub fn run(args: SnapshotArgs) -> Result<()> {
    let outcome = ingest_snapshot(&args)?;
    let snapshot = &outcome.snapshot;
    println!("{}", render_tree(&snapshot.key.repo_path, &snapshot.paths_sorted()));
    Ok(())
}
