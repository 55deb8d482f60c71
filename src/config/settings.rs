//! Configuration values and their defaults.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Runtime configuration for the ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding ingested snapshots. Defaults under the user cache dir.
    pub cache_db: Option<PathBuf>,
    /// Parent directory for ephemeral working copies. Defaults to the system temp dir.
    pub work_dir: Option<PathBuf>,
    /// Upper bound on concurrent extraction backend calls.
    pub max_concurrent_extractions: usize,
    /// Files larger than this are skipped by the walker.
    pub max_file_bytes: u64,
    /// Branch names never passed explicitly to clone.
    pub default_branches: Vec<String>,
    /// Supported forge hosts mapped to provider names.
    pub providers: BTreeMap<String, String>,
    /// Accept `file://` repositories under the `local` provider.
    pub allow_file_urls: bool,
    /// Additional gitignore-style patterns appended to the built-in list.
    pub extra_exclude: Vec<String>,
    pub document: DocumentBackendConfig,
    pub vision: VisionBackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_db: None,
            work_dir: None,
            max_concurrent_extractions: 4,
            max_file_bytes: 10 * 1024 * 1024,
            default_branches: vec!["main".to_string(), "master".to_string()],
            providers: BTreeMap::from([
                ("github.com".to_string(), "github".to_string()),
                ("gitlab.com".to_string(), "gitlab".to_string()),
            ]),
            allow_file_urls: false,
            extra_exclude: Vec::new(),
            document: DocumentBackendConfig::default(),
            vision: VisionBackendConfig::default(),
        }
    }
}

impl Config {
    /// Resolved cache database path, if any location is available.
    pub fn cache_db_path(&self) -> Option<PathBuf> {
        self.cache_db.clone().or_else(|| {
            cache_root_dir().map(|base| base.join("repo-ingest").join("snapshots.sqlite"))
        })
    }

    pub fn work_dir_path(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// PDF document-understanding backend (Mistral OCR).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentBackendConfig {
    /// Backend is enabled only when a key is present.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for DocumentBackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "mistral-ocr-latest".to_string(),
            endpoint: "https://api.mistral.ai/v1/ocr".to_string(),
            timeout_secs: 120,
            max_retries: 3,
        }
    }
}

/// Image-description backend (Gemini).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionBackendConfig {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL; the model name and `:generateContent` are appended.
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for VisionBackendConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.0-flash".to_string(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            timeout_secs: 60,
            max_retries: 3,
        }
    }
}

pub fn cache_root_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
    }
    #[cfg(not(target_os = "windows"))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CACHE_HOME") {
            return Some(PathBuf::from(xdg));
        }
        std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache"))
    }
}
