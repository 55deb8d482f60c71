//! Commit resolution from a remote's ref advertisement.

use tracing::{debug, warn};

use crate::domain::DEFAULT_BRANCH;
use crate::fetch::transport::{GitTransport, RemoteRef};

/// Resolve `branch` (or the remote's default `HEAD`) of `url` to a commit hash.
///
/// Fails soft: transport errors and unknown refs both yield `None`.
pub fn resolve_commit(
    transport: &dyn GitTransport,
    url: &str,
    branch: Option<&str>,
) -> Option<String> {
    let pattern = branch.unwrap_or(DEFAULT_BRANCH);

    let refs = match transport.list_refs(url) {
        Ok(refs) => refs,
        Err(e) => {
            warn!("Unable to list refs of {}: {:#}", url, e);
            return None;
        }
    };

    let commit = first_matching(&refs, pattern).map(|r| r.oid.clone());
    match &commit {
        Some(oid) => debug!("Resolved {}@{} to {}", url, pattern, oid),
        None => warn!("No ref matching '{}' advertised by {}", pattern, url),
    }
    commit
}

/// `git ls-remote` pattern semantics: exact name or a trailing path component match.
fn first_matching<'a>(refs: &'a [RemoteRef], pattern: &str) -> Option<&'a RemoteRef> {
    let suffix = format!("/{pattern}");
    refs.iter().find(|r| r.name == pattern || r.name.ends_with(&suffix))
}
