use anyhow::Result;

fn main() -> Result<()> {
    repo_ingest::cli::run()
}
