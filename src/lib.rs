//! repo-ingest: snapshot remote git repositories into a canonical text corpus
//!
//! A request names a repository URL plus an optional branch or commit. The
//! pipeline resolves the commit, serves a cached snapshot when one exists, and
//! otherwise clones, walks, extracts and persists a fresh one.

pub mod cache;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod ingest;
pub mod render;
pub mod scan;
pub mod utils;

pub use cancel::CancelToken;
pub use domain::{FileContent, FileRecord, Snapshot, SnapshotKey, SnapshotSource};
pub use error::{IngestError, IngestWarning};
pub use ingest::{IngestOutcome, IngestRequest, Ingestor};
