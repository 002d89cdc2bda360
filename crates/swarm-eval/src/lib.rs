//! # Swarm Eval
//!
//! Experiment preparation and run analysis for a distributed MPC swarm planner.
//!
//! ## Preparation
//!
//! [`config::ConfigSynthesizer`] merges agent start/goal pairs, obstacle spheres
//! (from [`geom`]), workspace bounds and acceleration limits into a baseline
//! planner config, producing the [`config::PlannerConfig`] the planner reads.
//!
//! ## Analysis
//!
//! After a run the planner leaves three files behind: a position dump, a
//! free-text log and a stats record. They flow through
//!
//! - [`trajectory`]: position dump to per-agent trajectories
//! - [`collision`]: `Collision ...` log lines to structured events
//! - [`run`]: arrival times, makespan, success rate, solve-time summary
//! - [`aggregate`]: mean and 95% confidence half-width across repeated runs
//!
//! ## Usage
//!
//! ```rust,ignore
//! use swarm_eval::config::PlannerConfig;
//! use swarm_eval::run::{RunAnalysisConfig, RunStatsComputer};
//!
//! let config = PlannerConfig::from_json_str(&config_text)?;
//! let stats = RunStatsComputer::new(RunAnalysisConfig::default())?
//!     .analyze(&config, &trajectory_text, &log_text, &stats_text)?;
//! println!("makespan: {:?}", stats.makespan);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export geometry for obstacle handling
pub use swarm_geom as geom;

pub mod aggregate;
pub mod collision;
pub mod config;
pub mod error;
pub mod run;
pub mod summary;
pub mod trajectory;

#[cfg(test)]
mod tests;

pub use error::EvalError;

use serde::Serialize;

/// Serialize `value` as JSON with a 4-space indent.
///
/// # Errors
///
/// Returns [`EvalError::Json`] if `value`'s `Serialize` impl fails
/// (for example a map with non-string keys).
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, EvalError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
