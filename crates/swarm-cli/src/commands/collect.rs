//! `swarm collect`: merge aggregated records into per-field series.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::Value;
use tracing::info;

use swarm_eval::aggregate::collect_series;
use swarm_eval::to_pretty_json;

use crate::files;

/// `swarm collect` arguments.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Aggregated stats files, in series order
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output path
    #[arg(short, long, default_value = "scalability_stats.json")]
    pub output: PathBuf,
}

/// Run the command.
///
/// # Errors
///
/// Fails if an input cannot be read or is not a JSON object.
pub fn run(args: &Args) -> Result<()> {
    let records = args
        .inputs
        .iter()
        .map(|path| files::read_json::<Value>(path))
        .collect::<Result<Vec<_>>>()?;

    let series = collect_series(&records)?;
    files::write_text(&args.output, &to_pretty_json(&series)?)?;
    info!(
        records = records.len(),
        fields = series.len(),
        output = %args.output.display(),
        "wrote series"
    );
    Ok(())
}
