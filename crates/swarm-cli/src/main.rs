//! `swarm`: prepare planner configs and analyze experiment results.
//!
//! ```text
//! swarm convert SwapClose48 --baseline config.json
//! swarm postprocess --config config_SwapClose48.json SwapClose48/exp_*
//! swarm aggregate SwapClose48
//! swarm collect stats/stats_Circle10.json stats/stats_Circle20.json
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod commands;
mod files;
mod logging;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Experiment tooling for the distributed MPC swarm planner.
#[derive(Parser, Debug)]
#[command(name = "swarm", version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `RUST_LOG` overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a planner config for a large-scale instance directory.
    Convert(commands::convert::Args),
    /// Extend each run's stats file with arrival, collision and solve-time metrics.
    Postprocess(commands::postprocess::Args),
    /// Aggregate the runs of one instance into stats/stats_<instance>.json.
    Aggregate(commands::aggregate::Args),
    /// Merge aggregated records into per-field series.
    Collect(commands::collect::Args),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Convert(args) => commands::convert::run(&args),
        Command::Postprocess(args) => commands::postprocess::run(&args),
        Command::Aggregate(args) => commands::aggregate::run(&args),
        Command::Collect(args) => commands::collect::run(&args),
    }
}
