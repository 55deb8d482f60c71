//! Shared CLI utilities.

use anyhow::{Context, Result};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::config::load_config;
use crate::error::IngestWarning;
use crate::ingest::{IngestOutcome, IngestRequest, Ingestor};

/// Arguments identifying one snapshot.
#[derive(Args, Debug, Clone)]
pub struct SnapshotArgs {
    /// Repository URL (github.com or gitlab.com)
    #[arg(value_name = "URL")]
    pub url: String,

    /// Branch to ingest (defaults to the remote HEAD)
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Exact commit to ingest; skips branch resolution
    #[arg(short, long, value_name = "SHA")]
    pub commit: Option<String>,

    /// Config file (TOML or YAML); discovered in the current directory when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl SnapshotArgs {
    pub fn request(&self) -> IngestRequest {
        IngestRequest {
            repo_url: self.url.clone(),
            branch: self.branch.clone(),
            commit: self.commit.clone(),
        }
    }
}

pub fn build_ingestor(config_path: Option<&Path>) -> Result<Ingestor> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let config = load_config(&cwd, config_path)?;
    Ingestor::from_config(config)
}

/// Cancel token flipped by Ctrl+C. A second Ctrl+C exits immediately.
pub fn cancel_on_ctrlc() -> CancelToken {
    let token = CancelToken::new();
    let handle = token.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if !interrupt(&handle) {
            eprintln!("Interrupted again, exiting");
            std::process::exit(130);
        }
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }
    token
}

/// Request cooperative cancellation. Returns false when it was already requested.
fn interrupt(token: &CancelToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    eprintln!("Cancelling... (press Ctrl+C again to exit)");
    token.cancel();
    true
}

/// Ingest the snapshot named by `args`, reporting warnings on stderr.
pub fn ingest_snapshot(args: &SnapshotArgs) -> Result<IngestOutcome> {
    let ingestor = build_ingestor(args.config.as_deref())?;
    let cancel = cancel_on_ctrlc();
    let outcome = ingestor.ingest(&args.request(), &cancel)?;
    report_warnings(&outcome.warnings);
    Ok(outcome)
}

pub fn report_warnings(warnings: &[IngestWarning]) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

/// Write `text` to `output`, or stdout when absent.
pub fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, text)
                .with_context(|| format!("Failed writing output file: {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
