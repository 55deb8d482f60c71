//! End-to-end ingestion: resolve, consult the cache, materialize, walk,
//! extract, persist.

use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::{SnapshotCache, SqliteStore};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::domain::{FileRecord, Snapshot, SnapshotSource, DEFAULT_BRANCH};
use crate::error::{IngestError, IngestWarning};
use crate::extract::Extractors;
use crate::fetch::{resolve_commit, GitTransport, LibGitTransport, RepoUrl, SnapshotAcquirer};
use crate::scan::{ClassifiedFile, ExclusionFilter, TreeWalker};

/// What to ingest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestRequest {
    pub repo_url: String,
    pub branch: Option<String>,
    /// Trusted as-is; skips remote resolution.
    pub commit: Option<String>,
}

impl IngestRequest {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self { repo_url: repo_url.into(), ..Self::default() }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn commit(mut self, commit: impl Into<String>) -> Self {
        self.commit = Some(commit.into());
        self
    }
}

/// A snapshot plus how it was obtained.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub snapshot: Snapshot,
    pub source: SnapshotSource,
    pub warnings: Vec<IngestWarning>,
}

pub struct Ingestor {
    config: Config,
    transport: Arc<dyn GitTransport>,
    filter: Arc<ExclusionFilter>,
    extractors: Extractors,
    cache: SnapshotCache,
}

impl Ingestor {
    pub fn new(
        config: Config,
        transport: Arc<dyn GitTransport>,
        filter: Arc<ExclusionFilter>,
        extractors: Extractors,
        cache: SnapshotCache,
    ) -> Self {
        Self { config, transport, filter, extractors, cache }
    }

    /// Wire up libgit2, the configured backends and the SQLite cache.
    ///
    /// A cache database that cannot be opened degrades to an in-memory cache.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let filter = Arc::new(ExclusionFilter::with_extra(&config.extra_exclude)?);
        let extractors = Extractors::from_config(&config)?;
        let cache = match config.cache_db_path() {
            Some(path) => match SqliteStore::open(&path) {
                Ok(store) => SnapshotCache::new(Arc::new(store)),
                Err(e) => {
                    warn!("Snapshot cache {} unavailable, using memory: {}", path.display(), e);
                    SnapshotCache::in_memory()
                }
            },
            None => SnapshotCache::in_memory(),
        };
        Ok(Self::new(config, Arc::new(LibGitTransport), filter, extractors, cache))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn parse_url(&self, raw: &str) -> Result<RepoUrl, IngestError> {
        RepoUrl::parse(raw, &self.config.providers, self.config.allow_file_urls)
    }

    /// Resolve the commit a request refers to without cloning.
    pub fn resolve(&self, request: &IngestRequest) -> Result<String, IngestError> {
        let repo = self.parse_url(&request.repo_url)?;
        self.resolve_for(&repo, request)
    }

    fn resolve_for(&self, repo: &RepoUrl, request: &IngestRequest) -> Result<String, IngestError> {
        if let Some(commit) = &request.commit {
            return Ok(commit.clone());
        }
        let branch = request.branch.as_deref();
        resolve_commit(self.transport.as_ref(), repo.as_str(), branch).ok_or_else(|| {
            IngestError::Unresolved {
                url: request.repo_url.clone(),
                reference: branch.unwrap_or(DEFAULT_BRANCH).to_string(),
            }
        })
    }

    /// Produce the snapshot for `request`, from cache when possible.
    pub fn ingest(
        &self,
        request: &IngestRequest,
        cancel: &CancelToken,
    ) -> Result<IngestOutcome, IngestError> {
        let repo = self.parse_url(&request.repo_url)?;
        let commit = self.resolve_for(&repo, request)?;
        let key = repo.snapshot_key(request.branch.as_deref(), &commit);
        let mut warnings = Vec::new();

        match self.cache.get(&key) {
            Ok(Some(snapshot)) => {
                info!("Serving {} from cache ({} files)", key, snapshot.files.len());
                return Ok(IngestOutcome { snapshot, source: SnapshotSource::Cache, warnings });
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Snapshot cache lookup failed for {}: {}", key, e);
                warnings.push(IngestWarning::CacheUnavailable { reason: e.to_string() });
            }
        }
        cancel.check()?;

        info!("Ingesting {}", key);
        let acquirer = SnapshotAcquirer::new(
            Arc::clone(&self.transport),
            self.config.work_dir_path(),
            self.config.default_branches.clone(),
        );
        let files = {
            let copy = acquirer.materialize(
                repo.as_str(),
                request.branch.as_deref(),
                request.commit.as_deref(),
                cancel,
            )?;
            cancel.check()?;
            let classified = self.walk(copy.root())?;
            cancel.check()?;
            self.extract_all(&classified, cancel)?
        };

        let snapshot = Snapshot::new(key, files);
        let degraded = snapshot.degraded_paths();
        if !degraded.is_empty() {
            warnings.push(IngestWarning::Degraded { paths: degraded });
        }

        // Permanent rejections would repeat on every attempt, so they are cached.
        let transient = snapshot.transient_failures();
        if transient.is_empty() {
            if let Err(e) = self.cache.store(&snapshot) {
                warn!("Failed to persist snapshot {}: {}", snapshot.key, e);
                warnings.push(IngestWarning::NotPersisted { reason: e.to_string() });
            }
        } else {
            warn!("Not persisting {}: {} transient failure(s)", snapshot.key, transient.len());
            warnings.push(IngestWarning::NotPersisted {
                reason: format!("transient extraction failures: {}", transient.join(", ")),
            });
        }

        let stats = snapshot.stats();
        info!(
            "Ingested {}: {} files ({} text, {} documents, {} images, {} degraded, {} text bytes)",
            snapshot.key,
            stats.files,
            stats.text_files,
            stats.documents,
            stats.images,
            stats.degraded,
            stats.text_bytes
        );

        Ok(IngestOutcome { snapshot, source: SnapshotSource::Fresh, warnings })
    }

    fn walk(&self, root: &Path) -> Result<Vec<ClassifiedFile>, IngestError> {
        let mut walker = TreeWalker::new(Arc::clone(&self.filter))
            .max_file_bytes(self.config.max_file_bytes);
        let files = walker.walk(root).map_err(IngestError::Walk)?;
        let stats = walker.stats();
        info!(
            "Scanned {} files, {} included, {} excluded entries, {} over size limit, {} non-UTF-8",
            stats.files_seen,
            stats.files_included,
            stats.entries_excluded,
            stats.files_skipped_size,
            stats.entries_skipped_non_utf8
        );
        Ok(files)
    }

    /// Extract every file on a bounded pool, keeping traversal order.
    fn extract_all(
        &self,
        files: &[ClassifiedFile],
        cancel: &CancelToken,
    ) -> Result<Vec<FileRecord>, IngestError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_concurrent_extractions.max(1))
            .build()?;

        pool.install(|| {
            files
                .par_iter()
                .map(|file| -> Result<FileRecord, IngestError> {
                    cancel.check()?;
                    let content = self.extractors.extract(file, cancel)?;
                    Ok(FileRecord::new(&file.relative_path, file.media_type.clone(), content))
                })
                .collect()
        })
    }
}
