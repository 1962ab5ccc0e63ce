use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use softlight_snapshot_store::generate_summary;

#[derive(Args, Clone, Debug)]
pub struct SummarizeArgs {
    /// Run directory holding the capture records
    pub run_dir: PathBuf,
}

pub async fn cmd_summarize(args: SummarizeArgs) -> Result<()> {
    if !args.run_dir.is_dir() {
        bail!("run directory not found: {}", args.run_dir.display());
    }
    let run_dir = args.run_dir.clone();
    let path = tokio::task::spawn_blocking(move || generate_summary(&run_dir))
        .await
        .context("Summary task panicked")?
        .with_context(|| format!("Failed to summarize {}", args.run_dir.display()))?;
    println!("Summary written to {}", path.display());
    Ok(())
}
