//! Command-line interface for repo-ingest
//!
//! Provides `ingest`, `resolve`, `tree` and `files` subcommands.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod files;
mod ingest;
mod resolve;
mod tree;
mod utils;

/// Turn git repositories into a single canonical text snapshot
#[derive(Parser)]
#[command(name = "repo-ingest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to DEBUG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a repository and print its canonical text
    Ingest(ingest::IngestArgs),

    /// Resolve a branch to the commit it points at
    Resolve(resolve::ResolveArgs),

    /// Print the file tree of a snapshot
    Tree(utils::SnapshotArgs),

    /// Print the canonical text of selected files only
    Files(files::FilesArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG in the environment always takes precedence; --verbose falls back to DEBUG.
    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    match cli.command {
        Commands::Ingest(args) => ingest::run(args),
        Commands::Resolve(args) => resolve::run(args),
        Commands::Tree(args) => tree::run(args),
        Commands::Files(args) => files::run(args),
    }
}
