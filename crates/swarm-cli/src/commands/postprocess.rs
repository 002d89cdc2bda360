//! `swarm postprocess`: extend each run's stats file in place.
//!
//! A run directory holds one `trajectories*` dump, one `stats*` record and one
//! `*.log`. Run directories are independent and analyzed in parallel.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use tracing::{error, info};

use swarm_eval::config::PlannerConfig;
use swarm_eval::run::{RunAnalysisConfig, RunStats, RunStatsComputer, DEFAULT_GOAL_TOLERANCE};

use crate::files;

/// `swarm postprocess` arguments.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Planner config the runs were produced with
    #[arg(short, long)]
    pub config: PathBuf,

    /// Run directories, e.g. `Circle50/exp_*`
    #[arg(required = true)]
    pub run_dirs: Vec<PathBuf>,

    /// Distance below which an agent counts as arrived
    #[arg(long, default_value_t = DEFAULT_GOAL_TOLERANCE)]
    pub goal_tolerance: f64,
}

/// Analyze one run directory and rewrite its stats file.
fn process_run(computer: &RunStatsComputer, config: &PlannerConfig, dir: &Path) -> Result<RunStats> {
    let trajectory_path = files::find_unique(dir, "trajectory", |n| n.starts_with("trajectories"))?;
    let stats_path = files::find_unique(dir, "stats", |n| n.starts_with("stats"))?;
    let log_path = files::find_unique(dir, "log", |n| n.ends_with(".log"))?;

    let stats = computer
        .analyze(
            config,
            &files::read_text(&trajectory_path)?,
            &files::read_text(&log_path)?,
            &files::read_text(&stats_path)?,
        )
        .with_context(|| format!("analyzing {}", dir.display()))?;

    files::write_text(&stats_path, &stats.to_json_string()?)?;
    Ok(stats)
}

/// Run the command.
///
/// # Errors
///
/// Fails if the planner config is unusable or any run directory fails. Every
/// run is attempted; the ones that succeed are written.
pub fn run(args: &Args) -> Result<()> {
    let config = PlannerConfig::from_json_str(&files::read_text(&args.config)?)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let computer = RunStatsComputer::new(RunAnalysisConfig {
        goal_tolerance: args.goal_tolerance,
    })
    .context("invalid --goal-tolerance")?;

    let results: Vec<(&PathBuf, Result<RunStats>)> = args
        .run_dirs
        .par_iter()
        .map(|dir| (dir, process_run(&computer, &config, dir)))
        .collect();

    let mut failed = 0;
    for (dir, result) in results {
        match result {
            Ok(stats) => info!(
                run = %dir.display(),
                reached = stats.goal_reach_count,
                agents = stats.robot_count,
                makespan = ?stats.makespan,
                success_rate = stats.success_rate,
                "updated stats"
            ),
            Err(e) => {
                failed += 1;
                error!(run = %dir.display(), "{e:#}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} runs failed", args.run_dirs.len());
    }
    Ok(())
}
