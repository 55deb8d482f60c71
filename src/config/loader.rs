//! Config file loading

use super::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const NESTED_SECTION: &str = "repo-ingest";

/// Load configuration from an explicit file or by discovery in `base_dir`,
/// then apply environment overrides.
///
/// An explicitly provided file must parse; an auto-discovered one that fails to
/// parse is reported and replaced by defaults.
pub fn load_config(base_dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    let mut config = load_file_config(base_dir, config_path)?;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

fn load_file_config(base_dir: &Path, config_path: Option<&Path>) -> Result<Config> {
    let config_path_provided = config_path.is_some();

    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config(base_dir),
    };

    let Some(config_file) = discovered else {
        return Ok(Config::default());
    };

    let content = fs::read_to_string(&config_file)
        .with_context(|| format!("Failed reading config file: {}", config_file.display()))?;

    let ext = config_file.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "toml" => parse_toml_config(&content, &config_file),
        "yaml" | "yml" => parse_yaml_config(&content, &config_file),
        other => Err(anyhow::anyhow!(
            "Unsupported config extension '.{}' for file {}",
            other,
            config_file.display()
        )),
    };

    match parsed {
        Ok(cfg) => {
            tracing::debug!("Loaded config from {}", config_file.display());
            Ok(cfg)
        }
        Err(e) if !config_path_provided => {
            tracing::warn!(
                "Failed to parse auto-discovered config {}: {:#}",
                config_file.display(),
                e
            );
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

/// Apply environment overrides using `lookup` (injected for tests).
///
/// `MISTRAL_API_KEY` enables the document backend, `GEMINI_API_KEY` the vision
/// backend, and `REPO_INGEST_CACHE_DB` relocates the snapshot database.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(key) = non_empty("MISTRAL_API_KEY") {
        config.document.api_key = Some(key);
    }
    if let Some(key) = non_empty("GEMINI_API_KEY") {
        config.vision.api_key = Some(key);
    }
    if let Some(path) = non_empty("REPO_INGEST_CACHE_DB") {
        config.cache_db = Some(PathBuf::from(path));
    }
}

/// Parse TOML config, supporting a nested `[repo-ingest]` table.
fn parse_toml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: toml::Value = toml::from_str(content)
        .with_context(|| format!("Invalid TOML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    config_val.try_into().with_context(|| format!("Invalid TOML config: {}", config_file.display()))
}

/// Parse YAML config, supporting a nested `repo-ingest` mapping.
fn parse_yaml_config(content: &str, config_file: &Path) -> Result<Config> {
    let raw: serde_yaml::Value = serde_yaml::from_str(content)
        .with_context(|| format!("Invalid YAML syntax: {}", config_file.display()))?;

    let config_val = match raw.get(NESTED_SECTION) {
        Some(nested) => nested.clone(),
        None => raw,
    };

    serde_yaml::from_value(config_val)
        .with_context(|| format!("Invalid YAML config: {}", config_file.display()))
}

fn discover_config(base_dir: &Path) -> Option<PathBuf> {
    let candidates =
        ["repo-ingest.toml", ".repo-ingest.toml", "repo-ingest.yml", "repo-ingest.yaml"];

    candidates.iter().map(|candidate| base_dir.join(candidate)).find(|path| path.exists())
}
