//! Repository URL validation and snapshot identity.

use std::collections::BTreeMap;
use url::Url;

use crate::domain::SnapshotKey;
use crate::error::IngestError;
use crate::utils::normalize_path;

/// Provider name used for `file://` repositories.
pub const LOCAL_PROVIDER: &str = "local";

/// A repository URL on a supported forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    url: Url,
    provider: String,
    repo_path: String,
}

impl RepoUrl {
    /// Parse and validate `raw` against the configured forge hosts.
    pub fn parse(
        raw: &str,
        providers: &BTreeMap<String, String>,
        allow_file_urls: bool,
    ) -> Result<Self, IngestError> {
        let invalid =
            |reason: String| IngestError::InvalidRepository { url: raw.to_string(), reason };

        let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;

        let provider = match url.scheme() {
            "file" if allow_file_urls => LOCAL_PROVIDER.to_string(),
            "file" => return Err(invalid("file URLs are disabled".to_string())),
            "http" | "https" => {
                let host = url.host_str().unwrap_or("").to_ascii_lowercase();
                match providers.get(&host) {
                    Some(name) => name.clone(),
                    None => {
                        let supported: Vec<&str> = providers.keys().map(String::as_str).collect();
                        return Err(invalid(format!(
                            "host must be one of {}",
                            supported.join(", ")
                        )));
                    }
                }
            }
            other => return Err(invalid(format!("unsupported scheme '{other}'"))),
        };

        let repo_path = repo_path_from(url.path());
        if repo_path.is_empty() {
            return Err(invalid("missing repository path".to_string()));
        }

        Ok(Self { url, provider, repo_path })
    }

    /// URL handed to the git transport.
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Repository path without leading slash or `.git` suffix, e.g. `owner/repo`.
    pub fn repo_path(&self) -> &str {
        &self.repo_path
    }

    pub fn snapshot_key(&self, branch: Option<&str>, commit: &str) -> SnapshotKey {
        SnapshotKey::new(self.provider.clone(), self.repo_path.clone(), branch, commit)
    }
}

fn repo_path_from(path: &str) -> String {
    let normalized = normalize_path(path);
    normalized.strip_suffix(".git").unwrap_or(&normalized).to_string()
}
