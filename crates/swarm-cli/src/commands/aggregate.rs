//! `swarm aggregate`: summarize the experiments of one instance.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use swarm_eval::aggregate::aggregate;
use swarm_eval::run::RunStats;

use crate::files;

/// `swarm aggregate` arguments.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Instance results directory with one subdirectory per experiment
    pub stats_dir: PathBuf,

    /// Directory the aggregate is written to
    #[arg(short, long, default_value = "stats")]
    pub output_dir: PathBuf,
}

/// Run the command.
///
/// # Errors
///
/// Fails if an experiment has no postprocessed stats file or there are no experiments.
pub fn run(args: &Args) -> Result<()> {
    let instance = files::base_name(&args.stats_dir)?;

    let runs = files::subdirectories(&args.stats_dir)?
        .iter()
        .map(|dir| {
            let path = files::find_unique(dir, "stats", |n| n.starts_with("stats"))?;
            debug!(path = %path.display(), "reading run stats");
            files::read_json::<RunStats>(&path)
                .with_context(|| format!("{} has not been postprocessed", dir.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let stats = aggregate(&instance, &runs)?;

    let output = args.output_dir.join(format!("stats_{instance}.json"));
    files::write_text(&output, &stats.to_json_string()?)?;
    info!(
        instance = %instance,
        experiments = stats.experiment_count,
        output = %output.display(),
        "wrote aggregated stats"
    );
    Ok(())
}
