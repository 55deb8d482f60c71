//! Materialize a repository at a commit into an ephemeral working copy.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::domain::DEFAULT_BRANCH;
use crate::error::IngestError;
use crate::fetch::context::WorkingCopy;
use crate::fetch::transport::{CloneOptions, GitTransport};

/// Clones repositories into uniquely named directories under `work_root`.
pub struct SnapshotAcquirer {
    transport: Arc<dyn GitTransport>,
    work_root: PathBuf,
    default_branches: Vec<String>,
}

impl SnapshotAcquirer {
    pub fn new(
        transport: Arc<dyn GitTransport>,
        work_root: impl Into<PathBuf>,
        default_branches: Vec<String>,
    ) -> Self {
        Self { transport, work_root: work_root.into(), default_branches }
    }

    /// Produce a working copy of `url` whose tree matches `commit`, or the tip
    /// of `branch` when no commit is given.
    ///
    /// The clone is shallow exactly when no commit is requested. Default branch
    /// names are never passed to the clone. On any failure the partial working
    /// copy is removed before the error is returned. A clone interrupted by
    /// `cancel` yields [`IngestError::Cancelled`].
    pub fn materialize(
        &self,
        url: &str,
        branch: Option<&str>,
        commit: Option<&str>,
        cancel: &CancelToken,
    ) -> Result<WorkingCopy, IngestError> {
        let acquisition = |source: anyhow::Error| IngestError::Acquisition {
            url: url.to_string(),
            source,
        };

        std::fs::create_dir_all(&self.work_root)
            .with_context(|| format!("Failed creating work root {}", self.work_root.display()))
            .map_err(acquisition)?;
        let copy = WorkingCopy::create(&self.work_root).map_err(acquisition)?;

        let options = CloneOptions {
            branch: branch.filter(|b| !self.is_default_branch(b)).map(str::to_string),
            shallow: commit.is_none(),
        };
        info!(
            "Cloning {} (branch: {}, shallow: {})",
            url,
            options.branch.as_deref().unwrap_or("default"),
            options.shallow
        );
        if let Err(e) = self.transport.clone_repo(url, copy.root(), &options, cancel) {
            cancel.check()?;
            return Err(acquisition(e));
        }
        cancel.check()?;

        if let Some(commit) = commit {
            debug!("Checking out {}", commit);
            self.transport.checkout(copy.root(), commit).map_err(acquisition)?;
        }

        Ok(copy)
    }

    fn is_default_branch(&self, branch: &str) -> bool {
        branch == DEFAULT_BRANCH || self.default_branches.iter().any(|b| b == branch)
    }
}
