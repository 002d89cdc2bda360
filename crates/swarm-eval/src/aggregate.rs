//! Aggregation across repeated experiments.
//!
//! Each metric is reduced to its mean and 95% confidence half-width over the
//! experiments where it is defined. An aggregate is a complete replacement of
//! any earlier one for the same instance; nothing is merged incrementally.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::EvalError;
use crate::run::RunStats;
use crate::summary::MetricSummary;

/// Per-metric summaries for one instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedStats {
    /// Instance the experiments ran on
    pub instance_name: String,
    /// Number of experiments aggregated
    pub experiment_count: usize,
    /// `goal_reach_count / robot_count`
    pub goal_reach_rate: MetricSummary,
    /// Simulator collision count
    pub collision_count: MetricSummary,
    /// Fraction of agents that never collided
    pub success_rate: MetricSummary,
    /// Over runs where at least one agent arrived
    pub makespan: Option<MetricSummary>,
    /// Per-run mean solve time
    pub qp_solve_time_avg: Option<MetricSummary>,
    /// Per-run solve time standard deviation
    pub qp_solve_time_std: Option<MetricSummary>,
    /// Per-run mean arrival time, never-arrived agents counted at the makespan
    pub robot_arrival_time_avg: Option<MetricSummary>,
    /// Per-run arrival time standard deviation, same capping
    pub robot_arrival_time_std: Option<MetricSummary>,
}

impl AggregatedStats {
    /// Serialize with a 4-space indent.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, EvalError> {
        crate::to_pretty_json(self)
    }
}

/// Summarize a metric that every run defines.
fn required(samples: &[f64]) -> Result<MetricSummary, EvalError> {
    MetricSummary::from_samples(samples)
        .ok_or_else(|| EvalError::DataShape("no experiments to aggregate".to_string()))
}

/// Aggregate the runs of one instance.
///
/// # Errors
///
/// Returns [`EvalError::DataShape`] if `runs` is empty or a run has no agents.
pub fn aggregate(instance_name: &str, runs: &[RunStats]) -> Result<AggregatedStats, EvalError> {
    if runs.is_empty() {
        return Err(EvalError::DataShape(format!(
            "no experiments to aggregate for {instance_name}"
        )));
    }

    let goal_reach_rates = runs
        .iter()
        .enumerate()
        .map(|(index, run)| {
            run.goal_reach_rate().ok_or_else(|| {
                EvalError::DataShape(format!("experiment {index} of {instance_name} has robot_count = 0"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    #[allow(clippy::cast_precision_loss)]
    let collision_counts: Vec<f64> = runs.iter().map(|r| r.collision_count as f64).collect();
    let success_rates: Vec<f64> = runs.iter().map(|r| r.success_rate).collect();

    let makespans: Vec<f64> = runs.iter().filter_map(|r| r.makespan).collect();
    let solve_avgs: Vec<f64> = runs.iter().filter_map(|r| r.qp_solve_time.map(|q| q.mean)).collect();
    let solve_stds: Vec<f64> = runs.iter().filter_map(|r| r.qp_solve_time.map(|q| q.std)).collect();
    let arrivals: Vec<_> = runs.iter().filter_map(RunStats::capped_arrival_stats).collect();
    let arrival_avgs: Vec<f64> = arrivals.iter().map(|s| s.mean).collect();
    let arrival_stds: Vec<f64> = arrivals.iter().map(|s| s.std_dev()).collect();

    let skipped = runs.len() - makespans.len();
    if skipped > 0 {
        debug!(instance_name, skipped, "runs without any arrival left out of makespan");
    }

    let stats = AggregatedStats {
        instance_name: instance_name.to_string(),
        experiment_count: runs.len(),
        goal_reach_rate: required(&goal_reach_rates)?,
        collision_count: required(&collision_counts)?,
        success_rate: required(&success_rates)?,
        makespan: MetricSummary::from_samples(&makespans),
        qp_solve_time_avg: MetricSummary::from_samples(&solve_avgs),
        qp_solve_time_std: MetricSummary::from_samples(&solve_stds),
        robot_arrival_time_avg: MetricSummary::from_samples(&arrival_avgs),
        robot_arrival_time_std: MetricSummary::from_samples(&arrival_stds),
    };

    info!(
        instance_name,
        experiments = stats.experiment_count,
        success_rate = stats.success_rate.mean,
        "aggregated experiments"
    );
    Ok(stats)
}

/// Merge records into one object mapping each key to its values in record order.
///
/// A key missing from some records only lists the values of the records that have it.
///
/// # Errors
///
/// Returns [`EvalError::DataShape`] if a record does not serialize to a JSON object.
pub fn collect_series<T: Serialize>(records: &[T]) -> Result<Map<String, Value>, EvalError> {
    let mut series: Map<String, Value> = Map::new();
    for (index, record) in records.iter().enumerate() {
        let Value::Object(fields) = serde_json::to_value(record)? else {
            return Err(EvalError::DataShape(format!("record {index} is not a JSON object")));
        };
        for (key, value) in fields {
            if let Value::Array(values) = series.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                values.push(value);
            }
        }
    }
    Ok(series)
}
