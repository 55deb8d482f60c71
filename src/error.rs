//! Typed failures surfaced by the ingestion pipeline.

use std::fmt;
use thiserror::Error;

/// Terminal failures of one ingestion request.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported repository URL '{url}': {reason}")]
    InvalidRepository { url: String, reason: String },

    #[error("Unable to resolve commit for {url} (ref {reference})")]
    Unresolved { url: String, reference: String },

    #[error("Failed to acquire {url}: {source:#}")]
    Acquisition {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to walk working tree: {0:#}")]
    Walk(#[source] anyhow::Error),

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Ingestion cancelled")]
    Cancelled,

    #[error("Failed to start extraction workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}

/// Failures of the snapshot persistence layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("snapshot store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("snapshot serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("snapshot store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot record: {0}")]
    Corrupt(String),

    #[error("snapshot store lock poisoned")]
    Poisoned,

    #[error("unsupported snapshot schema version {found}; expected {expected}")]
    SchemaVersion { found: i64, expected: i64 },
}

/// Failures of a document or vision backend call.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("backend request cancelled")]
    Cancelled,
}

impl ExtractError {
    /// Whether a later attempt at the same input may succeed.
    ///
    /// Network failures, rate limiting and server errors are transient. Other
    /// rejections and malformed responses will repeat for the same bytes.
    pub fn is_transient(&self) -> bool {
        match self {
            ExtractError::Http { status, .. } => *status == 429 || *status >= 500,
            ExtractError::Transport(_) | ExtractError::Io(_) | ExtractError::Cancelled => true,
            ExtractError::InvalidResponse(_) => false,
        }
    }
}

/// Non-fatal conditions reported alongside a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestWarning {
    /// The cache could not be consulted; the snapshot was ingested from scratch.
    CacheUnavailable { reason: String },
    /// The snapshot was not stored, so the next request ingests it again.
    NotPersisted { reason: String },
    /// Enrichment failed for these paths; they carry degraded content.
    Degraded { paths: Vec<String> },
}

impl fmt::Display for IngestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestWarning::CacheUnavailable { reason } => {
                write!(f, "snapshot cache unavailable: {reason}")
            }
            IngestWarning::NotPersisted { reason } => {
                write!(f, "snapshot not persisted, repeat requests will re-ingest: {reason}")
            }
            IngestWarning::Degraded { paths } => {
                write!(f, "extraction degraded for {} file(s): {}", paths.len(), paths.join(", "))
            }
        }
    }
}
