//! Determinism tests.
//!
//! Every stage is a pure transformation: the same inputs must give
//! byte-identical artifacts, including obstacle order.

use crate::aggregate::aggregate;
use crate::run::RunStatsComputer;

use super::helpers::{
    log_text, pillar_source, planner_config, simulator_stats_text, straight_path, trajectory_text,
};

#[test]
fn test_obstacle_resolution_is_deterministic() {
    let first = pillar_source().resolve().unwrap();
    let second = pillar_source().resolve().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.centers, second.centers);
}

#[test]
fn test_planner_config_text_is_deterministic() {
    let a = planner_config(5).to_json_string().unwrap();
    let b = planner_config(5).to_json_string().unwrap();

    assert_eq!(a, b);
}

#[test]
fn test_analysis_and_aggregation_are_deterministic() {
    let config = planner_config(2);
    let starts = config.agent_starts();
    let paths = trajectory_text(&[
        straight_path(starts[0], config.pf[0], 12, 30),
        straight_path(starts[1], config.pf[1], 25, 30),
    ]);
    let log = log_text(&[(0, 1, 0.7)]);
    let stats_text = simulator_stats_text(2, 1, &[0.5, 0.25, 0.75]);

    let computer = RunStatsComputer::default();
    let runs: Vec<_> = (0..2)
        .map(|_| computer.analyze(&config, &paths, &log, &stats_text).unwrap())
        .collect();
    assert_eq!(runs[0], runs[1]);
    assert_eq!(
        runs[0].to_json_string().unwrap(),
        runs[1].to_json_string().unwrap()
    );

    let a = aggregate("Crossing2", &runs).unwrap().to_json_string().unwrap();
    let b = aggregate("Crossing2", &runs).unwrap().to_json_string().unwrap();
    assert_eq!(a, b);
}
