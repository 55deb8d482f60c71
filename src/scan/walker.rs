//! Tree walker that prunes excluded directories and classifies files.

use crate::scan::exclude::ExclusionFilter;
use crate::utils::{classify_file, normalize_path, FileKind};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

const SNIFF_BYTES: usize = 512;

/// A file that survived exclusion, with its media type decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    /// Normalized repository-relative path.
    pub relative_path: String,
    pub media_type: String,
    pub kind: FileKind,
    pub size_bytes: u64,
}

/// Counters collected during a walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub files_seen: usize,
    pub files_included: usize,
    pub files_skipped_size: usize,
    pub files_skipped_unreadable: usize,
    /// Entries whose relative path is not valid UTF-8.
    pub entries_skipped_non_utf8: usize,
    pub entries_excluded: usize,
}

/// Walks a working directory, skipping excluded paths without descending into them.
pub struct TreeWalker {
    filter: Arc<ExclusionFilter>,
    max_file_bytes: u64,
    follow_symlinks: bool,
    stats: WalkStats,
}

impl TreeWalker {
    pub fn new(filter: Arc<ExclusionFilter>) -> Self {
        Self {
            filter,
            max_file_bytes: 10 * 1024 * 1024,
            follow_symlinks: false,
            stats: WalkStats::default(),
        }
    }

    /// Set maximum file size in bytes
    pub fn max_file_bytes(mut self, max_bytes: u64) -> Self {
        self.max_file_bytes = max_bytes;
        self
    }

    /// Set whether to follow symbolic links
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Walk `root` and return classified files in traversal order.
    ///
    /// Entries of a directory are visited in file-name order so repeated walks of
    /// the same tree agree. Excluded directories are pruned before their
    /// contents are listed. Entries whose names are not valid UTF-8 are skipped
    /// since they have no faithful record path.
    pub fn walk(&mut self, root: &Path) -> Result<Vec<ClassifiedFile>> {
        self.stats = WalkStats::default();

        if !root.is_dir() {
            anyhow::bail!("Working tree is not a directory: {}", root.display());
        }

        let filter = Arc::clone(&self.filter);
        let mut excluded = 0usize;
        let mut non_utf8 = 0usize;
        let walker = WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                let Some(rel_path) = relative_to(root, entry.path()) else {
                    warn!("Skipping non-UTF-8 path {}", entry.path().display());
                    non_utf8 += 1;
                    return false;
                };
                let keep = !filter.matches(&rel_path, entry.file_type().is_dir());
                if !keep {
                    debug!("Excluded {}", rel_path);
                    excluded += 1;
                }
                keep
            });

        let mut files = Vec::new();
        for entry_result in walker {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    self.stats.files_skipped_unreadable += 1;
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if file_type.is_symlink() {
                debug!("Skipping symlink {}", entry.path().display());
                continue;
            }

            self.stats.files_seen += 1;

            let Some(rel_path) = relative_to(root, entry.path()) else {
                continue;
            };

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    warn!("Skipping {}: {}", rel_path, e);
                    self.stats.files_skipped_unreadable += 1;
                    continue;
                }
            };
            if size > self.max_file_bytes {
                debug!("Skipping {} ({} bytes exceeds limit)", rel_path, size);
                self.stats.files_skipped_size += 1;
                continue;
            }

            let head = read_head(entry.path())
                .with_context(|| format!("Failed reading {}", entry.path().display()))?;
            let (media_type, kind) = classify_file(entry.path(), &head);
            debug!("Classified {} as {} ({:?})", rel_path, media_type, kind);

            files.push(ClassifiedFile {
                path: entry.path().to_path_buf(),
                relative_path: rel_path,
                media_type,
                kind,
                size_bytes: size,
            });
        }

        self.stats.entries_excluded = excluded;
        self.stats.entries_skipped_non_utf8 = non_utf8;
        self.stats.files_included = files.len();
        Ok(files)
    }

    /// Get walk statistics
    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }
}

/// Normalized path of `path` below `root`, or `None` when it is not valid UTF-8.
fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    rel.to_str().map(normalize_path)
}

fn read_head(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(SNIFF_BYTES);
    File::open(path)?.take(SNIFF_BYTES as u64).read_to_end(&mut head)?;
    Ok(head)
}
