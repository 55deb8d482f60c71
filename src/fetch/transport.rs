//! Version-control transport: remote ref listing, cloning, and checkout.

use anyhow::{Context, Result};
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Direction, FetchOptions, ObjectType, Remote, RemoteCallbacks, Repository};
use std::path::Path;

use crate::cancel::CancelToken;

/// One advertised reference of a remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub name: String,
    pub oid: String,
}

/// How a clone should be performed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Branch to check out instead of the remote default.
    pub branch: Option<String>,
    /// Fetch only the tip commit.
    pub shallow: bool,
}

/// Operations the pipeline needs from a VCS client.
pub trait GitTransport: Send + Sync {
    /// List the remote's advertised refs in advertisement order.
    fn list_refs(&self, url: &str) -> Result<Vec<RemoteRef>>;

    /// Clone `url` into the existing, empty directory `dest`.
    ///
    /// Implementations abort the transfer once `cancel` is set.
    fn clone_repo(
        &self,
        url: &str,
        dest: &Path,
        options: &CloneOptions,
        cancel: &CancelToken,
    ) -> Result<()>;

    /// Check out `commit` in the repository at `repo_dir` with a detached HEAD.
    fn checkout(&self, repo_dir: &Path, commit: &str) -> Result<()>;
}

/// libgit2-backed transport.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibGitTransport;

impl GitTransport for LibGitTransport {
    fn list_refs(&self, url: &str) -> Result<Vec<RemoteRef>> {
        let mut remote = Remote::create_detached(url)
            .with_context(|| format!("Invalid remote URL: {url}"))?;
        remote
            .connect(Direction::Fetch)
            .with_context(|| format!("Failed connecting to {url}"))?;

        let refs: Vec<RemoteRef> = remote
            .list()
            .with_context(|| format!("Failed listing refs of {url}"))?
            .iter()
            .map(|head| RemoteRef { name: head.name().to_string(), oid: head.oid().to_string() })
            .collect();

        remote.disconnect().ok();
        Ok(refs)
    }

    fn clone_repo(
        &self,
        url: &str,
        dest: &Path,
        options: &CloneOptions,
        cancel: &CancelToken,
    ) -> Result<()> {
        if options.shallow {
            match clone_with(url, dest, options.branch.as_deref(), true, cancel) {
                Ok(()) => return Ok(()),
                Err(e) if cancel.is_cancelled() => return Err(e),
                Err(e) => {
                    // Some transports (e.g. local paths) refuse shallow fetches.
                    tracing::debug!("Shallow clone failed, retrying full clone: {:#}", e);
                    reset_dir(dest)?;
                }
            }
        }
        clone_with(url, dest, options.branch.as_deref(), false, cancel)
    }

    fn checkout(&self, repo_dir: &Path, commit: &str) -> Result<()> {
        let repo = Repository::open(repo_dir)
            .with_context(|| format!("Failed opening clone at {}", repo_dir.display()))?;
        let object = repo
            .revparse_single(commit)
            .with_context(|| format!("Failed to resolve ref: {commit}"))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        repo.checkout_tree(&object, Some(&mut checkout))
            .with_context(|| format!("Failed to checkout tree for ref: {commit}"))?;

        let target = match object.kind() {
            Some(ObjectType::Commit) => object.id(),
            _ => object.peel_to_commit().with_context(|| format!("Not a commit: {commit}"))?.id(),
        };
        repo.set_head_detached(target)
            .with_context(|| format!("Failed to set detached HEAD for ref: {commit}"))?;

        Ok(())
    }
}

fn clone_with(
    url: &str,
    dest: &Path,
    branch: Option<&str>,
    shallow: bool,
    cancel: &CancelToken,
) -> Result<()> {
    if cancel.is_cancelled() {
        anyhow::bail!("Clone from {url} cancelled");
    }

    let mut builder = RepoBuilder::new();
    if let Some(branch) = branch {
        builder.branch(branch);
    }

    // Returning false from the progress callback makes libgit2 abort the fetch.
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(|_| !cancel.is_cancelled());

    let mut fo = FetchOptions::new();
    fo.remote_callbacks(callbacks);
    if shallow {
        fo.depth(1);
    }
    builder.fetch_options(fo);

    let mode = if shallow { "Shallow clone" } else { "Clone" };
    builder.clone(url, dest).with_context(|| format!("{mode} from {url} failed"))?;
    Ok(())
}

/// Empty `dir` so a failed clone attempt does not poison the next one.
fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("Failed clearing {}", dir.display()))?;
    }
    std::fs::create_dir_all(dir).with_context(|| format!("Failed recreating {}", dir.display()))
}
