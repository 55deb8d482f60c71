//! End-to-end pipeline tests against local git repositories

use git2::{IndexAddOption, Oid, Repository, Signature};
use repo_ingest::cache::{MemoryStore, SnapshotCache, SnapshotStore};
use repo_ingest::config::Config;
use repo_ingest::domain::{DocumentPage, FileContent, SnapshotSource, Strategy};
use repo_ingest::error::{CacheError, ExtractError, IngestError, IngestWarning};
use repo_ingest::extract::{Capability, DocumentExtractor, Extractors, ImageDescriber};
use repo_ingest::fetch::{resolve_commit, LibGitTransport};
use repo_ingest::render::format_files;
use repo_ingest::scan::ExclusionFilter;
use repo_ingest::{CancelToken, IngestRequest, Ingestor, Snapshot, SnapshotKey};
use similar_asserts::assert_eq;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    _tmp: TempDir,
    origin: PathBuf,
    work_dir: PathBuf,
    repo: Repository,
}

impl Fixture {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let origin = tmp.path().join("origin");
        let work_dir = tmp.path().join("work");
        fs::create_dir_all(&origin).unwrap();
        let repo = Repository::init(&origin).unwrap();
        Self { _tmp: tmp, origin, work_dir, repo }
    }

    fn write(&self, rel: &str, contents: &[u8]) {
        let path = self.origin.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn commit(&self, message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        index.add_all(["*"].iter(), IndexAddOption::FORCE, None).unwrap();
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Test", "test@example.com").unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();
        self.repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents).unwrap()
    }

    fn url(&self) -> String {
        format!("file://{}", self.origin.display())
    }

    fn config(&self) -> Config {
        Config {
            allow_file_urls: true,
            work_dir: Some(self.work_dir.clone()),
            ..Config::default()
        }
    }

    fn ingestor(&self, extractors: Extractors, cache: SnapshotCache) -> Ingestor {
        self.ingestor_with(self.config(), extractors, cache)
    }

    fn ingestor_with(
        &self,
        config: Config,
        extractors: Extractors,
        cache: SnapshotCache,
    ) -> Ingestor {
        let filter = Arc::new(ExclusionFilter::with_extra(&config.extra_exclude).unwrap());
        Ingestor::new(config, Arc::new(LibGitTransport), filter, extractors, cache)
    }

    fn work_dir_is_empty(&self) -> bool {
        !self.work_dir.exists() || fs::read_dir(&self.work_dir).unwrap().next().is_none()
    }
}

fn sample_repo() -> (Fixture, Oid) {
    let fx = Fixture::new();
    fx.write("README.md", b"# Sample\n");
    fx.write("src/main.rs", b"fn main() {\n    println!(\"hi\");\n}\n");
    fx.write("src/bin/tool.rs", b"fn main() {}\n");
    fx.write("docs/guide.pdf", b"%PDF-1.4\n% fixture\n");
    fx.write("assets/logo.png", b"\x89PNG\r\n\x1a\nfixture");
    fx.write("node_modules/left-pad/index.js", b"module.exports = 1;\n");
    fx.write("dist/app.min.js", b"var a=1;");
    let oid = fx.commit("initial");
    (fx, oid)
}

fn paths(outcome: &repo_ingest::IngestOutcome) -> Vec<&str> {
    outcome.snapshot.files.iter().map(|f| f.path.as_str()).collect()
}

struct FixedPages;

impl DocumentExtractor for FixedPages {
    fn extract(&self, _: &[u8], _: &CancelToken) -> Result<Vec<DocumentPage>, ExtractError> {
        Ok(vec![
            DocumentPage { index: 0, markdown: "# Guide".into() },
            DocumentPage { index: 1, markdown: "Second page".into() },
        ])
    }
}

struct Describe(&'static str);

impl ImageDescriber for Describe {
    fn describe(&self, _: &[u8], mime: &str, _: &CancelToken) -> Result<String, ExtractError> {
        Ok(format!("{} ({mime})", self.0))
    }
}

/// Answers every call with one HTTP status and counts the calls.
struct Rejecting {
    status: u16,
    calls: AtomicUsize,
}

impl Rejecting {
    fn new(status: u16) -> Arc<Self> {
        Arc::new(Self { status, calls: AtomicUsize::new(0) })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageDescriber for Rejecting {
    fn describe(&self, _: &[u8], _: &str, _: &CancelToken) -> Result<String, ExtractError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ExtractError::Http { status: self.status, body: "rejected".into() })
    }
}

struct CancelOnCall(CancelToken);

impl ImageDescriber for CancelOnCall {
    fn describe(&self, _: &[u8], _: &str, _: &CancelToken) -> Result<String, ExtractError> {
        self.0.cancel();
        Ok("cancelled mid-run".into())
    }
}

/// Sees the cancellation while its request is in flight.
struct InterruptedRequest;

impl ImageDescriber for InterruptedRequest {
    fn describe(&self, _: &[u8], _: &str, cancel: &CancelToken) -> Result<String, ExtractError> {
        cancel.cancel();
        Err(ExtractError::Cancelled)
    }
}

/// A store whose backing database is gone.
struct BrokenStore;

impl SnapshotStore for BrokenStore {
    fn find_first(&self, _key: &SnapshotKey) -> Result<Option<Snapshot>, CacheError> {
        Err(CacheError::Corrupt("database disk image is malformed".into()))
    }

    fn insert(&self, _snapshot: &Snapshot) -> Result<(), CacheError> {
        Err(CacheError::Poisoned)
    }
}

fn describing(backend: Arc<dyn ImageDescriber>) -> Extractors {
    Extractors::new(Capability::Unavailable, Capability::Available(backend))
}

#[test]
fn ingest_walks_excludes_and_records_traversal_order() {
    let (fx, oid) = sample_repo();
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());

    let outcome = ingestor.ingest(&IngestRequest::new(fx.url()), &CancelToken::new()).unwrap();

    assert_eq!(outcome.source, SnapshotSource::Fresh);
    assert!(outcome.warnings.is_empty());
    assert_eq!(outcome.snapshot.key.commit, oid.to_string());
    assert_eq!(outcome.snapshot.key.branch, "HEAD");
    // node_modules/, dist/ and bin/ are pruned by the built-in rules.
    assert_eq!(
        paths(&outcome),
        vec!["README.md", "assets/logo.png", "docs/guide.pdf", "src/main.rs"]
    );
    assert!(outcome.snapshot.select(&["src/bin/tool.rs"]).is_empty());
    assert!(fx.work_dir_is_empty(), "working copy must be removed");
}

#[test]
fn unavailable_backends_fall_back_to_text() {
    let (fx, _) = sample_repo();
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let outcome = ingestor.ingest(&IngestRequest::new(fx.url()), &CancelToken::new()).unwrap();

    let pdf = outcome.snapshot.select(&["docs/guide.pdf"]);
    assert_eq!(pdf[0].media_type, "application/pdf");
    assert!(matches!(&pdf[0].content, FileContent::Text { text } if text.starts_with("%PDF-1.4")));
}

#[test]
fn repeat_ingestion_is_served_from_cache_with_identical_output() {
    let (fx, _) = sample_repo();
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let request = IngestRequest::new(fx.url());

    let first = ingestor.ingest(&request, &CancelToken::new()).unwrap();
    let second = ingestor.ingest(&request, &CancelToken::new()).unwrap();

    assert_eq!(first.source, SnapshotSource::Fresh);
    assert_eq!(second.source, SnapshotSource::Cache);
    assert_eq!(format_files(&first.snapshot.files), format_files(&second.snapshot.files));
}

#[test]
fn explicit_commit_materializes_older_tree() {
    let fx = Fixture::new();
    fx.write("app.txt", b"version one\n");
    let first = fx.commit("first");
    fx.write("app.txt", b"version two\n");
    fx.write("extra.txt", b"added later\n");
    fx.commit("second");

    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let request = IngestRequest::new(fx.url()).commit(first.to_string());
    let outcome = ingestor.ingest(&request, &CancelToken::new()).unwrap();

    assert_eq!(outcome.snapshot.key.commit, first.to_string());
    assert_eq!(paths(&outcome), vec!["app.txt"]);
    assert_eq!(
        outcome.snapshot.files[0].content,
        FileContent::Text { text: "version one\n".into() }
    );
}

#[test]
fn named_branch_resolves_and_clones_that_branch() {
    let fx = Fixture::new();
    fx.write("app.txt", b"main line\n");
    let base = fx.commit("base");
    let base_commit = fx.repo.find_commit(base).unwrap();
    fx.repo.branch("feature", &base_commit, false).unwrap();

    fx.repo.set_head("refs/heads/feature").unwrap();
    fx.write("feature.txt", b"feature work\n");
    let feature = fx.commit("feature work");
    fx.repo.set_head(&format!("refs/heads/{}", default_branch_name(&fx.repo, base))).unwrap();

    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let outcome = ingestor
        .ingest(&IngestRequest::new(fx.url()).branch("feature"), &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.snapshot.key.branch, "feature");
    assert_eq!(outcome.snapshot.key.commit, feature.to_string());
    assert_eq!(paths(&outcome), vec!["app.txt", "feature.txt"]);
}

/// The branch `Repository::init` created, which still points at `base`.
fn default_branch_name(repo: &Repository, base: Oid) -> String {
    repo.branches(Some(git2::BranchType::Local))
        .unwrap()
        .filter_map(|b| b.ok())
        .find(|(b, _)| b.get().target() == Some(base))
        .and_then(|(b, _)| b.name().ok().flatten().map(str::to_string))
        .unwrap()
}

#[test]
fn available_backends_enrich_documents_and_images() {
    let (fx, _) = sample_repo();
    let extractors = Extractors::new(
        Capability::Available(Arc::new(FixedPages)),
        Capability::Available(Arc::new(Describe("A small logo"))),
    );
    let ingestor = fx.ingestor(extractors, SnapshotCache::in_memory());
    let outcome = ingestor.ingest(&IngestRequest::new(fx.url()), &CancelToken::new()).unwrap();

    let picked = outcome.snapshot.select(&["docs/guide.pdf", "assets/logo.png"]);
    assert_eq!(
        picked[0].content,
        FileContent::ImageDescription { description: "A small logo (image/png)".into() }
    );
    assert!(matches!(&picked[1].content, FileContent::Document { pages } if pages.len() == 2));

    let text = format_files(picked);
    let banner = "=".repeat(48);
    assert!(text.contains(&format!("FILE: docs/guide.pdf\n{banner}\n# Guide\n\nSecond page\n")));
}

#[test]
fn transient_enrichment_failure_is_not_persisted() {
    let (fx, _) = sample_repo();
    let store = Arc::new(MemoryStore::new());
    let backend = Rejecting::new(503);
    let ingestor = fx.ingestor(describing(backend.clone()), SnapshotCache::new(store.clone()));
    let request = IngestRequest::new(fx.url());

    let outcome = ingestor.ingest(&request, &CancelToken::new()).unwrap();

    let degraded = IngestWarning::Degraded { paths: vec!["assets/logo.png".into()] };
    assert!(outcome.warnings.contains(&degraded));
    assert!(outcome.warnings.iter().any(|w| matches!(w, IngestWarning::NotPersisted { .. })));
    let logo = outcome.snapshot.select(&["assets/logo.png"]);
    match &logo[0].content {
        FileContent::Degraded { strategy, reason, transient } => {
            assert_eq!(*strategy, Strategy::Image);
            assert!(reason.contains("503"));
            assert!(*transient);
        }
        other => panic!("expected degraded record, got {other:?}"),
    }
    let text = format_files(&outcome.snapshot.files);
    assert!(text.contains("[image extraction failed: backend returned HTTP 503"));
    assert!(store.is_empty());

    let retry = ingestor.ingest(&request, &CancelToken::new()).unwrap();
    assert_eq!(retry.source, SnapshotSource::Fresh);
    assert_eq!(backend.calls(), 2);
}

#[test]
fn permanent_enrichment_failure_is_persisted_and_not_retried() {
    let fx = Fixture::new();
    fx.write("a.txt", b"alpha\n");
    fx.write("favicon.ico", b"\x00\x00\x01\x00\x01\x00\x10\x10");
    fx.commit("initial");

    let store = Arc::new(MemoryStore::new());
    let backend = Rejecting::new(400);
    let ingestor = fx.ingestor(describing(backend.clone()), SnapshotCache::new(store.clone()));
    let request = IngestRequest::new(fx.url());

    let first = ingestor.ingest(&request, &CancelToken::new()).unwrap();
    assert_eq!(first.source, SnapshotSource::Fresh);
    assert_eq!(first.warnings, vec![IngestWarning::Degraded { paths: vec!["favicon.ico".into()] }]);
    assert_eq!(store.len(), 1);

    let second = ingestor.ingest(&request, &CancelToken::new()).unwrap();
    let third = ingestor.ingest(&request, &CancelToken::new()).unwrap();
    assert_eq!(second.source, SnapshotSource::Cache);
    assert_eq!(third.source, SnapshotSource::Cache);
    assert_eq!(backend.calls(), 1);
    assert_eq!(format_files(&first.snapshot.files), format_files(&third.snapshot.files));
    assert!(format_files(&third.snapshot.files)
        .contains("[image extraction failed: backend returned HTTP 400: rejected]"));
}

#[test]
fn failing_cache_still_returns_fresh_snapshot_with_warnings() {
    let (fx, _) = sample_repo();
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::new(Arc::new(BrokenStore)));

    let outcome = ingestor.ingest(&IngestRequest::new(fx.url()), &CancelToken::new()).unwrap();

    assert_eq!(outcome.source, SnapshotSource::Fresh);
    assert_eq!(outcome.snapshot.files.len(), 4);
    assert_eq!(outcome.warnings.len(), 2);
    assert!(matches!(
        &outcome.warnings[0],
        IngestWarning::CacheUnavailable { reason } if reason.contains("malformed")
    ));
    assert!(matches!(
        &outcome.warnings[1],
        IngestWarning::NotPersisted { reason } if reason.contains("poisoned")
    ));
    assert!(fx.work_dir_is_empty());
}

#[test]
fn cancelled_before_start_returns_cancelled() {
    let (fx, _) = sample_repo();
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = ingestor.ingest(&IngestRequest::new(fx.url()), &cancel).unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
    assert!(fx.work_dir_is_empty());
}

#[test]
fn cancellation_during_extraction_cleans_up() {
    let (fx, _) = sample_repo();
    let cancel = CancelToken::new();
    let extractors = Extractors::new(
        Capability::Unavailable,
        Capability::Available(Arc::new(CancelOnCall(cancel.clone()))),
    );
    let store = Arc::new(MemoryStore::new());
    // A single worker visits files in traversal order, so files after the logo see the cancel.
    let config = Config { max_concurrent_extractions: 1, ..fx.config() };
    let ingestor = fx.ingestor_with(config, extractors, SnapshotCache::new(store.clone()));

    let err = ingestor.ingest(&IngestRequest::new(fx.url()), &cancel).unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
    assert!(fx.work_dir_is_empty());
    assert!(store.is_empty());
}

#[test]
fn cancellation_inside_a_backend_call_is_not_a_degraded_snapshot() {
    let fx = Fixture::new();
    fx.write("logo.png", b"\x89PNG\r\n\x1a\nfixture");
    fx.commit("initial");

    let store = Arc::new(MemoryStore::new());
    let extractors = describing(Arc::new(InterruptedRequest));
    let ingestor = fx.ingestor(extractors, SnapshotCache::new(store.clone()));
    let cancel = CancelToken::new();

    let err = ingestor.ingest(&IngestRequest::new(fx.url()), &cancel).unwrap_err();
    assert!(matches!(err, IngestError::Cancelled));
    assert!(fx.work_dir_is_empty());
    assert!(store.is_empty());
}

#[test]
fn unreachable_remote_is_unresolved() {
    let fx = Fixture::new();
    let missing = fx.origin.join("does-not-exist");
    let url = format!("file://{}", missing.display());

    assert_eq!(resolve_commit(&LibGitTransport, &url, None), None);

    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let err = ingestor.ingest(&IngestRequest::new(url), &CancelToken::new()).unwrap_err();
    assert!(matches!(err, IngestError::Unresolved { .. }));
    assert!(err.to_string().starts_with("Unable to resolve commit"));
}

#[test]
fn unsupported_host_is_rejected_before_any_network_access() {
    let fx = Fixture::new();
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::in_memory());
    let err = ingestor
        .ingest(&IngestRequest::new("https://example.com/o/r"), &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, IngestError::InvalidRepository { .. }));
}

#[test]
fn cache_keys_include_branch() {
    let (fx, _) = sample_repo();
    let store = Arc::new(MemoryStore::new());
    let ingestor = fx.ingestor(Extractors::text_only(), SnapshotCache::new(store.clone()));
    ingestor.ingest(&IngestRequest::new(fx.url()), &CancelToken::new()).unwrap();
    assert_eq!(store.len(), 1);

    let head = fx.repo.head().unwrap();
    let branch = head.shorthand().unwrap().to_string();
    let outcome = ingestor
        .ingest(&IngestRequest::new(fx.url()).branch(branch), &CancelToken::new())
        .unwrap();
    assert_eq!(outcome.source, SnapshotSource::Fresh);
    assert_eq!(store.len(), 2);
    assert!(store.find_first(&outcome.snapshot.key).unwrap().is_some());
}
