//! Core data model: snapshot identity, file records, and snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::render::pathsort::sort_paths;
use crate::utils::normalize_path;

/// Branch sentinel used when the caller does not name a branch.
pub const DEFAULT_BRANCH: &str = "HEAD";

/// Immutable identity of a repository snapshot.
///
/// The 4-tuple is the primary key of persisted snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub provider: String,
    pub repo_path: String,
    pub branch: String,
    pub commit: String,
}

impl SnapshotKey {
    pub fn new(
        provider: impl Into<String>,
        repo_path: impl Into<String>,
        branch: Option<&str>,
        commit: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            repo_path: repo_path.into(),
            branch: branch.unwrap_or(DEFAULT_BRANCH).to_string(),
            commit: commit.into(),
        }
    }
}

impl fmt::Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}#{}", self.provider, self.repo_path, self.branch, self.commit)
    }
}

/// Which enrichment strategy produced (or failed to produce) a record's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Document,
    Image,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Document => "document",
            Strategy::Image => "image",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page of a document extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub index: usize,
    pub markdown: String,
}

/// The authoritative rendering source of a file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileContent {
    /// Verbatim file content decoded as text.
    Text { text: String },
    /// Page-wise markdown produced by the document backend.
    Document { pages: Vec<DocumentPage> },
    /// Natural-language description produced by the vision backend.
    ImageDescription { description: String },
    /// Enrichment was attempted and failed. `transient` failures may succeed
    /// on a later attempt.
    Degraded {
        strategy: Strategy,
        reason: String,
        #[serde(default)]
        transient: bool,
    },
}

impl FileContent {
    pub fn is_degraded(&self) -> bool {
        matches!(self, FileContent::Degraded { .. })
    }

    pub fn is_transient_failure(&self) -> bool {
        matches!(self, FileContent::Degraded { transient: true, .. })
    }
}

/// One ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Relative, forward-slash separated, no leading slash.
    pub path: String,
    pub media_type: String,
    pub content: FileContent,
}

impl FileRecord {
    pub fn new(path: &str, media_type: impl Into<String>, content: FileContent) -> Self {
        Self { path: normalize_path(path), media_type: media_type.into(), content }
    }

    pub fn text(path: &str, media_type: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(path, media_type, FileContent::Text { text: text.into() })
    }
}

/// The complete extraction result for one repository at one commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: SnapshotKey,
    pub files: Vec<FileRecord>,
    pub ingested_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(key: SnapshotKey, files: Vec<FileRecord>) -> Self {
        Self { key, files, ingested_at: Utc::now() }
    }

    /// Record paths ordered for tree display.
    pub fn paths_sorted(&self) -> Vec<String> {
        sort_paths(self.files.iter().map(|f| f.path.clone()).collect())
    }

    /// Records whose path matches one of `paths` after normalization, in snapshot order.
    pub fn select<S: AsRef<str>>(&self, paths: &[S]) -> Vec<&FileRecord> {
        let wanted: HashSet<String> = paths.iter().map(|p| normalize_path(p.as_ref())).collect();
        self.files.iter().filter(|f| wanted.contains(&f.path)).collect()
    }

    pub fn degraded_paths(&self) -> Vec<String> {
        self.files.iter().filter(|f| f.content.is_degraded()).map(|f| f.path.clone()).collect()
    }

    /// Paths whose enrichment failed for a reason that may clear on retry.
    /// A snapshot with any of these is not worth caching.
    pub fn transient_failures(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|f| f.content.is_transient_failure())
            .map(|f| f.path.clone())
            .collect()
    }

    pub fn stats(&self) -> SnapshotStats {
        let mut stats = SnapshotStats { files: self.files.len(), ..SnapshotStats::default() };
        for file in &self.files {
            match &file.content {
                FileContent::Text { text } => {
                    stats.text_files += 1;
                    stats.text_bytes += text.len() as u64;
                }
                FileContent::Document { .. } => stats.documents += 1,
                FileContent::ImageDescription { .. } => stats.images += 1,
                FileContent::Degraded { .. } => stats.degraded += 1,
            }
        }
        stats
    }
}

/// Per-snapshot counts, logged after ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotStats {
    pub files: usize,
    pub text_files: usize,
    pub documents: usize,
    pub images: usize,
    pub degraded: usize,
    pub text_bytes: u64,
}

/// Where an ingestion outcome came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Fresh,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> Snapshot {
        Snapshot::new(
            SnapshotKey::new("github", "o/r", None, "abc"),
            vec![
                FileRecord::text("src/main.rs", "text/x-rust", "fn main() {}"),
                FileRecord::text("README.md", "text/markdown", "# r"),
                FileRecord::new(
                    "logo.png",
                    "image/png",
                    FileContent::Degraded {
                        strategy: Strategy::Image,
                        reason: "boom".into(),
                        transient: false,
                    },
                ),
            ],
        )
    }

    #[test]
    fn key_defaults_branch_to_head() {
        let key = SnapshotKey::new("github", "o/r", None, "abc");
        assert_eq!(key.branch, "HEAD");
        assert_eq!(key.to_string(), "github:o/r@HEAD#abc");
    }

    #[test]
    fn record_paths_are_normalized() {
        let record = FileRecord::text("/src\\lib.rs", "text/x-rust", "");
        assert_eq!(record.path, "src/lib.rs");
    }

    #[test]
    fn select_normalizes_lookup_paths() {
        let snap = snapshot();
        let picked = snap.select(&["/src/main.rs", "./README.md", "missing.txt"]);
        let paths: Vec<&str> = picked.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/main.rs", "README.md"]);
    }

    #[test]
    fn stats_count_each_content_kind() {
        let stats = snapshot().stats();
        assert_eq!(stats.files, 3);
        assert_eq!(stats.text_files, 2);
        assert_eq!(stats.degraded, 1);
        assert_eq!(stats.text_bytes, "fn main() {}".len() as u64 + 3);
    }

    #[test]
    fn content_serializes_with_kind_tag() {
        let json = serde_json::to_string(&FileContent::ImageDescription {
            description: "a cat".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"image_description","description":"a cat"}"#);
    }

    #[test]
    fn only_transient_failures_are_reported_as_retryable() {
        let mut snap = snapshot();
        assert_eq!(snap.degraded_paths(), vec!["logo.png"]);
        assert!(snap.transient_failures().is_empty());

        snap.files.push(FileRecord::new(
            "docs/manual.pdf",
            "application/pdf",
            FileContent::Degraded {
                strategy: Strategy::Document,
                reason: "backend returned HTTP 503: busy".into(),
                transient: true,
            },
        ));
        assert_eq!(snap.transient_failures(), vec!["docs/manual.pdf"]);
    }

    #[test]
    fn degraded_records_without_transient_flag_read_as_permanent() {
        let json = r#"{"kind":"degraded","strategy":"image","reason":"boom"}"#;
        let content: FileContent = serde_json::from_str(json).unwrap();
        assert!(content.is_degraded());
        assert!(!content.is_transient_failure());
    }
}
