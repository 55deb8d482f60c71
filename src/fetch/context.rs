//! Ephemeral working copy management

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// A uniquely named directory that is removed when dropped.
///
/// Dropping covers every exit path of an ingestion: success, errors propagated
/// with `?`, cancellation, and unwinding.
#[derive(Debug)]
pub struct WorkingCopy {
    root_path: PathBuf,
}

impl WorkingCopy {
    /// Create a fresh, empty directory under `parent`.
    pub fn create(parent: &Path) -> Result<Self> {
        let root_path = parent.join(unique_dir_name());
        std::fs::create_dir_all(&root_path)
            .with_context(|| format!("Failed creating temp directory: {}", root_path.display()))?;
        tracing::debug!("Created working copy {}", root_path.display());
        Ok(Self { root_path })
    }

    pub fn root(&self) -> &Path {
        &self.root_path
    }
}

impl Drop for WorkingCopy {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.root_path) {
            Ok(()) => tracing::debug!("Removed working copy {}", self.root_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "Failed removing working copy {}: {}",
                self.root_path.display(),
                e
            ),
        }
    }
}

fn unique_dir_name() -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let pid = std::process::id();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("repo-ingest-{pid}-{nanos}-{seq}")
}
