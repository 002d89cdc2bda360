//! Fixtures for the pipeline tests.
//!
//! Run files are produced as text in the same formats the planner and
//! simulator write, so the tests exercise the parsers too.

use std::fmt::Write as _;

use glam::DVec3;
use serde_json::json;

use crate::config::{AgentRecord, ConfigSynthesizer, PlannerConfig, SimulationConfig};
use crate::geom::{Bounds, ObstacleSource, TriangleMesh};

/// Planner timestep used by every fixture.
pub const TS: f64 = 0.1;

// =============================================================================
// Preparation Inputs
// =============================================================================

/// A robot record with the standard 0.15 x 0.15 x 0.3 half-extent collision box.
pub fn agent_record(start: DVec3, goal: DVec3) -> AgentRecord {
    AgentRecord {
        start_position: start,
        goal_position: goal,
        collision_shape_at_zero_min: DVec3::new(-0.15, -0.15, -0.3),
        collision_shape_at_zero_max: DVec3::new(0.15, 0.15, 0.3),
    }
}

/// Agents on a line at y = 0 swapping to y = 4.
pub fn crossing_agents(count: usize) -> Vec<AgentRecord> {
    (0..count)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let x = i as f64;
            agent_record(DVec3::new(x, 0.0, 1.0), DVec3::new(x, 4.0, 1.0))
        })
        .collect()
}

/// A 20 x 20 x 5 workspace with acceleration limit 2.
pub fn simulation_config() -> SimulationConfig {
    SimulationConfig {
        workspace_min: DVec3::new(-10.0, -10.0, 0.0),
        workspace_max: DVec3::new(10.0, 10.0, 5.0),
        max_derivatives: vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]],
        robot_config_filename: "configs/robots.json".to_string(),
        octomap_filename: "maps/forest.bt".to_string(),
    }
}

/// Baseline planner settings.
pub fn synthesizer() -> ConfigSynthesizer {
    let template = json!({
        "ts": TS,
        "k_hor": 16,
        "solver": "qpoases",
        "collision_weights": [1.0, 1.0, 10.0]
    });
    ConfigSynthesizer::from_json_str(&template.to_string()).unwrap()
}

/// Sphere radius used with [`pillar_boxes`].
pub const PILLAR_R_OBS: f64 = 0.5;

/// A 2 x 2 x 2 pillar (2 x 2 x 2 spheres at r = 0.5) and a thin 0.5 x 3 x 1
/// wall (1 x 3 x 1 spheres).
pub fn pillar_boxes() -> Vec<Bounds> {
    vec![
        Bounds::from_min_max(DVec3::new(2.0, 2.0, 0.0), DVec3::new(4.0, 4.0, 2.0)),
        Bounds::from_min_max(DVec3::new(-4.0, 1.0, 0.0), DVec3::new(-3.5, 4.0, 1.0)),
    ]
}

/// Spheres [`pillar_source`] resolves to.
pub const PILLAR_SPHERES: usize = 11;

/// Mesh-backed source over [`pillar_boxes`], read back from binary STL.
pub fn pillar_source() -> ObstacleSource {
    let stl = TriangleMesh::from_boxes(&pillar_boxes()).to_stl_binary();
    let mesh = TriangleMesh::from_stl_bytes(&stl).unwrap();
    ObstacleSource::from_mesh(mesh, PILLAR_R_OBS, 1.0).unwrap()
}

/// Planner config over [`crossing_agents`] and [`pillar_source`].
pub fn planner_config(agents: usize) -> PlannerConfig {
    let packing = pillar_source().resolve().unwrap();
    synthesizer()
        .synthesize(&crossing_agents(agents), &packing, &simulation_config())
        .unwrap()
}

// =============================================================================
// Run Files
// =============================================================================

/// Straight-line path from `start` to `goal` reaching it at step `arrive`, then holding.
pub fn straight_path(start: DVec3, goal: DVec3, arrive: usize, steps: usize) -> Vec<DVec3> {
    (0..steps)
        .map(|k| {
            #[allow(clippy::cast_precision_loss)]
            let t = (k.min(arrive) as f64) / arrive as f64;
            start.lerp(goal, t)
        })
        .collect()
}

/// Position dump in the planner's layout: x, y and z rows per agent.
pub fn trajectory_text(paths: &[Vec<DVec3>]) -> String {
    let mut out = String::new();
    for path in paths {
        for axis in 0..3 {
            let row: Vec<String> = path.iter().map(|p| format!("{:.6}", p[axis])).collect();
            writeln!(out, "{}", row.join(" ")).unwrap();
        }
    }
    out
}

/// A simulator log line reporting a collision.
pub fn collision_line(a: usize, b: usize, time: f64) -> String {
    format!("Collision detected: Vehicles {a} and {b} at distance 0.21 @ t = {time}s")
}

/// Simulator log with some chatter around the collision lines.
pub fn log_text(collisions: &[(usize, usize, f64)]) -> String {
    let mut out = String::from("Loading config...\nSolving multi-robot motion planning problem\n");
    for &(a, b, t) in collisions {
        writeln!(out, "{}", collision_line(a, b, t)).unwrap();
    }
    out.push_str("Simulation finished\n");
    out
}

/// Simulator stats record with one sub-run of solve times.
pub fn simulator_stats_text(goal_reach_count: usize, collision_count: usize, solve_times: &[f64]) -> String {
    json!({
        "goal_reach_count": goal_reach_count,
        "collision_count": collision_count,
        "solver": "qpoases",
        "simulation_data": [
            {"robot_data": {"solve_times": solve_times}}
        ]
    })
    .to_string()
}
