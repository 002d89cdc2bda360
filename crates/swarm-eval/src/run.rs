//! Per-run statistics.
//!
//! [`RunStatsComputer`] combines a run's trajectories, collision events and the
//! simulator's own stats record into a [`RunStats`]: arrival times, makespan,
//! success rate and a solve-time summary. The simulator record is extended,
//! never rewritten: keys the computer does not own pass through unchanged.

use glam::DVec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::collision::{parse_collision_log, CollisionEvent};
use crate::config::PlannerConfig;
use crate::error::EvalError;
use crate::summary::{SampleStats, SolveTimeSummary};
use crate::trajectory::{PositionMatrix, Trajectories};

/// Default goal-reach tolerance in distance units.
pub const DEFAULT_GOAL_TOLERANCE: f64 = 0.1;

/// Keys owned by [`RunStats`]'s typed fields.
const DERIVED_KEYS: [&str; 8] = [
    "goal_reach_count",
    "collision_count",
    "simulation_time",
    "robot_arrival_time",
    "robot_count",
    "makespan",
    "success_rate",
    "qp_solve_time",
];

// =============================================================================
// Configuration
// =============================================================================

/// Run analysis options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunAnalysisConfig {
    /// An agent has arrived once it is strictly closer than this to its goal
    pub goal_tolerance: f64,
}

impl Default for RunAnalysisConfig {
    fn default() -> Self {
        Self {
            goal_tolerance: DEFAULT_GOAL_TOLERANCE,
        }
    }
}

impl RunAnalysisConfig {
    /// Check that the options describe a usable analysis.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] unless `goal_tolerance` is finite and positive.
    pub fn validate(&self) -> Result<(), EvalError> {
        let tolerance = self.goal_tolerance;
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(EvalError::ConfigValidation(format!(
                "goal_tolerance must be positive, got {tolerance}"
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Arrival Times
// =============================================================================

/// First time an agent came within tolerance of its goal.
///
/// Serialized as seconds, or `-1` if the agent never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ArrivalTime(pub Option<f64>);

impl ArrivalTime {
    /// Sentinel written for agents that never arrived.
    pub const NEVER_SENTINEL: f64 = -1.0;

    /// An agent that never arrived.
    pub const NEVER: Self = Self(None);

    /// Arrival at `seconds`.
    #[must_use]
    pub fn at(seconds: f64) -> Self {
        Self(Some(seconds))
    }

    /// Seconds, if the agent arrived.
    #[must_use]
    pub fn seconds(self) -> Option<f64> {
        self.0
    }

    /// Whether the agent arrived.
    #[must_use]
    pub fn reached(self) -> bool {
        self.0.is_some()
    }
}

impl Serialize for ArrivalTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(seconds) => serializer.serialize_f64(seconds),
            None => serializer.serialize_i64(-1),
        }
    }
}

impl<'de> Deserialize<'de> for ArrivalTime {
    #[allow(clippy::float_cmp)]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if value == Self::NEVER_SENTINEL {
            Ok(Self::NEVER)
        } else if value >= 0.0 {
            Ok(Self::at(value))
        } else {
            Err(serde::de::Error::custom(format!(
                "arrival time must be -1 or non-negative, got {value}"
            )))
        }
    }
}

/// Arrival time of every agent, using first-crossing semantics.
///
/// Step `k` maps to time `k * ts`.
///
/// # Errors
///
/// Returns [`EvalError::DataShape`] if `goals` does not have one entry per agent.
pub fn arrival_times(
    trajectories: &Trajectories,
    goals: &[DVec3],
    tolerance: f64,
    ts: f64,
) -> Result<Vec<ArrivalTime>, EvalError> {
    if goals.len() != trajectories.agent_count() {
        return Err(EvalError::DataShape(format!(
            "{} goals for {} agent trajectories",
            goals.len(),
            trajectories.agent_count()
        )));
    }

    Ok(trajectories
        .iter()
        .zip(goals)
        .map(|(path, goal)| {
            path.iter()
                .position(|p| p.distance(*goal) < tolerance)
                .map_or(ArrivalTime::NEVER, |k| {
                    #[allow(clippy::cast_precision_loss)]
                    let step = k as f64;
                    ArrivalTime::at(step * ts)
                })
        })
        .collect())
}

/// Latest arrival among agents that arrived; `None` if none did.
#[must_use]
pub fn makespan(arrivals: &[ArrivalTime]) -> Option<f64> {
    arrivals
        .iter()
        .filter_map(|a| a.seconds())
        .reduce(f64::max)
}

/// Fraction of the `ncmd` agents that appear in no collision event.
///
/// Partners with an index `>= ncmd` are obstacles and do not count against
/// any agent's success. Returns `0.0` when `ncmd` is zero.
#[must_use]
pub fn success_rate(events: &[CollisionEvent], ncmd: usize) -> f64 {
    if ncmd == 0 {
        return 0.0;
    }
    let mut collided = vec![false; ncmd];
    for event in events {
        for agent in [event.agent_a, event.agent_b] {
            if let Some(flag) = collided.get_mut(agent) {
                *flag = true;
            }
        }
    }
    let clean = collided.iter().filter(|c| !**c).count();
    #[allow(clippy::cast_precision_loss)]
    let rate = clean as f64 / ncmd as f64;
    rate
}

// =============================================================================
// Stats Records
// =============================================================================

/// The stats record the simulator writes for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatorStats {
    /// Agents the simulator reports as having reached their goal
    pub goal_reach_count: usize,
    /// Collisions the simulator counted
    pub collision_count: usize,
    /// Every other key, including `simulation_data`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SimulatorStats {
    /// Parse a simulator stats record.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] for malformed JSON or missing counts.
    pub fn from_json_str(text: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Every per-step solve time in `simulation_data[*].robot_data.solve_times`,
    /// flattened across sub-runs.
    ///
    /// A record without `simulation_data` has no samples.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::DataShape`] if `simulation_data` is present but not
    /// an array of entries with numeric `robot_data.solve_times`.
    pub fn solve_time_samples(&self) -> Result<Vec<f64>, EvalError> {
        let Some(data) = self.extra.get("simulation_data") else {
            return Ok(Vec::new());
        };
        let entries = data
            .as_array()
            .ok_or_else(|| EvalError::DataShape("simulation_data is not an array".to_string()))?;

        let mut samples = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let times = entry
                .get("robot_data")
                .and_then(|r| r.get("solve_times"))
                .ok_or_else(|| {
                    EvalError::DataShape(format!(
                        "simulation_data[{index}] has no robot_data.solve_times"
                    ))
                })?;
            collect_numbers(times, &mut samples).map_err(|found| {
                EvalError::DataShape(format!(
                    "simulation_data[{index}].robot_data.solve_times contains {found}"
                ))
            })?;
        }
        Ok(samples)
    }
}

/// Push every number of a (possibly nested) array; reports the first non-number.
fn collect_numbers(value: &Value, out: &mut Vec<f64>) -> Result<(), String> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|v| collect_numbers(v, out)),
        Value::Number(n) => {
            out.push(n.as_f64().ok_or_else(|| format!("unrepresentable number {n}"))?);
            Ok(())
        }
        other => Err(format!("non-numeric value {other}")),
    }
}

/// A run's simulator record extended with derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// Agents the simulator reports as having reached their goal
    pub goal_reach_count: usize,
    /// Collisions the simulator counted
    pub collision_count: usize,
    /// Simulated duration in seconds
    pub simulation_time: f64,
    /// Per-agent arrival time, `-1` when never reached
    pub robot_arrival_time: Vec<ArrivalTime>,
    /// Number of controlled agents (`Ncmd`)
    pub robot_count: usize,
    /// Latest arrival; `null` when no agent arrived
    pub makespan: Option<f64>,
    /// Fraction of agents that never collided
    pub success_rate: f64,
    /// Solve-time summary; `null` without samples
    pub qp_solve_time: Option<SolveTimeSummary>,
    /// Pass-through simulator keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RunStats {
    /// Parse an extended stats record.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] for malformed JSON or missing derived fields.
    pub fn from_json_str(text: &str) -> Result<Self, EvalError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize with a 4-space indent.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, EvalError> {
        crate::to_pretty_json(self)
    }

    /// `goal_reach_count / robot_count`; `None` for an empty run.
    #[must_use]
    pub fn goal_reach_rate(&self) -> Option<f64> {
        #[allow(clippy::cast_precision_loss)]
        let rate = (self.robot_count > 0)
            .then(|| self.goal_reach_count as f64 / self.robot_count as f64);
        rate
    }

    /// Arrival times with never-arrived agents counted at the makespan.
    ///
    /// `None` when no agent arrived.
    #[must_use]
    pub fn capped_arrival_stats(&self) -> Option<SampleStats> {
        let cap = self.makespan?;
        Some(SampleStats::from_samples(
            self.robot_arrival_time.iter().map(|a| a.seconds().unwrap_or(cap)),
        ))
    }
}

// =============================================================================
// Computer
// =============================================================================

/// Everything observed about one run besides the simulator record.
#[derive(Debug, Clone, Copy)]
pub struct RunObservation<'a> {
    /// Reconstructed agent trajectories
    pub trajectories: &'a Trajectories,
    /// Agent goals, one per trajectory
    pub goals: &'a [DVec3],
    /// Logged collision events
    pub collisions: &'a [CollisionEvent],
    /// Planner timestep in seconds
    pub ts: f64,
}

/// Derives [`RunStats`] for one run.
#[derive(Debug, Clone, Default)]
pub struct RunStatsComputer {
    config: RunAnalysisConfig,
}

impl RunStatsComputer {
    /// Create a computer with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] if `config` fails [`RunAnalysisConfig::validate`].
    pub fn new(config: RunAnalysisConfig) -> Result<Self, EvalError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Extend a simulator record with the metrics derived from `observation`.
    ///
    /// # Errors
    ///
    /// - [`EvalError::ConfigValidation`] if `ts` is not positive
    /// - [`EvalError::DataShape`] if goals and trajectories disagree, or the
    ///   solve times are malformed
    /// - [`EvalError::Consistency`] if the agents that never arrived plus the
    ///   simulator's `goal_reach_count` do not add up to the agent count
    pub fn compute(
        &self,
        simulator: SimulatorStats,
        observation: &RunObservation<'_>,
    ) -> Result<RunStats, EvalError> {
        let ts = observation.ts;
        if !(ts.is_finite() && ts > 0.0) {
            return Err(EvalError::ConfigValidation(format!("ts must be positive, got {ts}")));
        }
        let trajectories = observation.trajectories;
        let ncmd = trajectories.agent_count();

        let arrivals = arrival_times(trajectories, observation.goals, self.config.goal_tolerance, ts)?;
        let never = arrivals.iter().filter(|a| !a.reached()).count();
        if never + simulator.goal_reach_count != ncmd {
            return Err(EvalError::Consistency(format!(
                "{never} agents never came within {} of their goal but the simulator reports \
                 goal_reach_count = {} for {ncmd} agents",
                self.config.goal_tolerance, simulator.goal_reach_count
            )));
        }

        let samples = simulator.solve_time_samples()?;
        let qp_solve_time = SolveTimeSummary::from_stats(&SampleStats::from_samples(samples.iter().copied()));
        debug!(samples = samples.len(), "collected solve times");

        let mut extra = simulator.extra;
        for key in DERIVED_KEYS {
            extra.remove(key);
        }

        let stats = RunStats {
            goal_reach_count: simulator.goal_reach_count,
            collision_count: simulator.collision_count,
            simulation_time: trajectories.duration(ts),
            makespan: makespan(&arrivals),
            robot_arrival_time: arrivals,
            robot_count: ncmd,
            success_rate: success_rate(observation.collisions, ncmd),
            qp_solve_time,
            extra,
        };

        info!(
            agents = ncmd,
            reached = stats.goal_reach_count,
            collisions = observation.collisions.len(),
            makespan = ?stats.makespan,
            success_rate = stats.success_rate,
            "analyzed run"
        );
        Ok(stats)
    }

    /// Analyze a run from its raw files.
    ///
    /// # Errors
    ///
    /// Propagates every error of the individual stages: trajectory shape,
    /// malformed collision lines, simulator JSON, and [`Self::compute`].
    pub fn analyze(
        &self,
        config: &PlannerConfig,
        trajectory_text: &str,
        log_text: &str,
        stats_text: &str,
    ) -> Result<RunStats, EvalError> {
        let ts = config.timestep()?;
        let matrix = PositionMatrix::parse(trajectory_text)?;
        let trajectories = Trajectories::reconstruct(&matrix, config.ncmd)?;
        let collisions = parse_collision_log(log_text)?;
        let simulator = SimulatorStats::from_json_str(stats_text)?;

        self.compute(
            simulator,
            &RunObservation {
                trajectories: &trajectories,
                goals: &config.pf,
                collisions: &collisions,
                ts,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Agent 0 walks from x = 0.995 toward its goal at x = 0.0 in 0.01 steps and
    /// is inside 0.1 from step 90 on. Agent 1 stays put.
    fn walkers(steps: usize) -> (Trajectories, Vec<DVec3>) {
        #[allow(clippy::cast_precision_loss)]
        let walker = (0..steps)
            .map(|k| DVec3::new((0.995 - 0.01 * k as f64).max(0.0), 0.0, 1.0))
            .collect();
        let idle = vec![DVec3::new(5.0, 5.0, 1.0); steps];
        let goals = vec![DVec3::new(0.0, 0.0, 1.0), DVec3::new(0.0, 5.0, 1.0)];
        (Trajectories::from_agents(vec![walker, idle]).unwrap(), goals)
    }

    fn simulator(goal_reach_count: usize) -> SimulatorStats {
        serde_json::from_value(json!({
            "goal_reach_count": goal_reach_count,
            "collision_count": 1,
            "instance": "Circle10",
            "simulation_data": [
                {"robot_data": {"solve_times": [1.0, 3.0]}},
                {"robot_data": {"solve_times": [[2.0], [2.0]]}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_arrival_at_step_40() {
        let mut path = vec![DVec3::new(1.0, 0.0, 0.0); 40];
        path.extend(vec![DVec3::new(0.05, 0.0, 0.0); 10]);
        let traj = Trajectories::from_agents(vec![path]).unwrap();

        let arrivals = arrival_times(&traj, &[DVec3::ZERO], 0.1, 0.01).unwrap();
        assert!((arrivals[0].seconds().unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_arrival_is_first_crossing_and_strict() {
        let path = vec![
            DVec3::new(0.1, 0.0, 0.0),
            DVec3::new(0.05, 0.0, 0.0),
            DVec3::new(3.0, 0.0, 0.0),
            DVec3::new(0.0, 0.0, 0.0),
        ];
        let traj = Trajectories::from_agents(vec![path]).unwrap();

        let arrivals = arrival_times(&traj, &[DVec3::ZERO], 0.1, 0.5).unwrap();
        assert_eq!(arrivals, vec![ArrivalTime::at(0.5)]);
    }

    #[test]
    fn test_never_arrived_is_minus_one() {
        let (traj, goals) = walkers(50);
        let arrivals = arrival_times(&traj, &goals, 0.1, 0.01).unwrap();

        assert_eq!(arrivals, vec![ArrivalTime::NEVER, ArrivalTime::NEVER]);
        assert_eq!(serde_json::to_string(&arrivals).unwrap(), "[-1,-1]");
    }

    #[test]
    fn test_arrival_goal_count_mismatch() {
        let (traj, _) = walkers(5);
        assert!(matches!(
            arrival_times(&traj, &[DVec3::ZERO], 0.1, 0.01),
            Err(EvalError::DataShape(_))
        ));
    }

    #[test]
    fn test_makespan_ignores_never() {
        let arrivals = [ArrivalTime::at(0.4), ArrivalTime::NEVER, ArrivalTime::at(0.8)];
        assert_eq!(makespan(&arrivals), Some(0.8));
        assert_eq!(makespan(&[ArrivalTime::NEVER]), None);
    }

    #[test]
    fn test_arrival_time_serde() {
        let arrivals = vec![ArrivalTime::at(0.4), ArrivalTime::NEVER];
        let text = serde_json::to_string(&arrivals).unwrap();
        assert_eq!(text, "[0.4,-1]");

        let back: Vec<ArrivalTime> = serde_json::from_str("[0.4, -1, -1.0, 0]").unwrap();
        assert_eq!(
            back,
            vec![ArrivalTime::at(0.4), ArrivalTime::NEVER, ArrivalTime::NEVER, ArrivalTime::at(0.0)]
        );
        assert!(serde_json::from_str::<ArrivalTime>("-2").is_err());
    }

    #[test]
    fn test_success_rate_counts_agents_only() {
        let events = [
            CollisionEvent {
                agent_a: 0,
                agent_b: 2,
                time: 1.0,
            },
            CollisionEvent {
                agent_a: 0,
                agent_b: 2,
                time: 1.1,
            },
            CollisionEvent {
                agent_a: 3,
                agent_b: 250,
                time: 2.0,
            },
        ];
        assert!((success_rate(&events, 4) - 0.25).abs() < 1e-12);
        assert_eq!(success_rate(&[], 4), 1.0);
        assert_eq!(success_rate(&[], 0), 0.0);
    }

    #[test]
    fn test_rejects_unusable_goal_tolerance() {
        for goal_tolerance in [0.0, -0.1, f64::NAN, f64::INFINITY] {
            let err = RunStatsComputer::new(RunAnalysisConfig { goal_tolerance }).unwrap_err();
            assert!(matches!(err, EvalError::ConfigValidation(_)), "{goal_tolerance}: {err}");
            assert!(err.to_string().contains("goal_tolerance"));
        }
        assert!(RunStatsComputer::new(RunAnalysisConfig { goal_tolerance: 0.25 }).is_ok());
        assert!(RunAnalysisConfig::default().validate().is_ok());
    }

    #[test]
    fn test_compute_extends_simulator_record() {
        let (traj, goals) = walkers(120);
        let collisions = [CollisionEvent {
            agent_a: 1,
            agent_b: 7,
            time: 0.3,
        }];
        let stats = RunStatsComputer::default()
            .compute(
                simulator(1),
                &RunObservation {
                    trajectories: &traj,
                    goals: &goals,
                    collisions: &collisions,
                    ts: 0.01,
                },
            )
            .unwrap();

        assert_eq!(stats.robot_count, 2);
        assert!((stats.robot_arrival_time[0].seconds().unwrap() - 0.9).abs() < 1e-9);
        assert!(!stats.robot_arrival_time[1].reached());
        assert_eq!(stats.makespan, stats.robot_arrival_time[0].seconds());
        assert!((stats.simulation_time - 1.19).abs() < 1e-9);
        assert_eq!(stats.success_rate, 0.5);

        let qp = stats.qp_solve_time.unwrap();
        assert_eq!((qp.mean, qp.min, qp.max), (2.0, 1.0, 3.0));
        assert!((qp.std - 0.5f64.sqrt()).abs() < 1e-12);

        assert_eq!(stats.extra["instance"], json!("Circle10"));
        assert!(stats.extra.contains_key("simulation_data"));
    }

    #[test]
    fn test_compute_rejects_goal_count_mismatch() {
        let (traj, goals) = walkers(120);
        let err = RunStatsComputer::default()
            .compute(
                simulator(2),
                &RunObservation {
                    trajectories: &traj,
                    goals: &goals,
                    collisions: &[],
                    ts: 0.01,
                },
            )
            .unwrap_err();
        assert!(matches!(err, EvalError::Consistency(_)));
        assert!(err.to_string().contains("goal_reach_count = 2"));
    }

    #[test]
    fn test_solve_times_absent_and_malformed() {
        let bare: SimulatorStats =
            serde_json::from_value(json!({"goal_reach_count": 0, "collision_count": 0})).unwrap();
        assert!(bare.solve_time_samples().unwrap().is_empty());

        let bad: SimulatorStats = serde_json::from_value(json!({
            "goal_reach_count": 0,
            "collision_count": 0,
            "simulation_data": [{"robot_data": {"solve_times": [1.0, "slow"]}}]
        }))
        .unwrap();
        let err = bad.solve_time_samples().unwrap_err();
        assert!(err.to_string().contains("simulation_data[0]"));
    }

    #[test]
    fn test_run_stats_json_roundtrip() {
        let (traj, goals) = walkers(120);
        let stats = RunStatsComputer::default()
            .compute(
                simulator(1),
                &RunObservation {
                    trajectories: &traj,
                    goals: &goals,
                    collisions: &[],
                    ts: 0.01,
                },
            )
            .unwrap();

        let text = stats.to_json_string().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["robot_arrival_time"][1], json!(-1));
        assert_eq!(RunStats::from_json_str(&text).unwrap(), stats);
    }

    #[test]
    fn test_capped_arrival_stats() {
        let stats = RunStats {
            goal_reach_count: 2,
            collision_count: 0,
            simulation_time: 10.0,
            robot_arrival_time: vec![ArrivalTime::at(2.0), ArrivalTime::NEVER, ArrivalTime::at(4.0)],
            robot_count: 3,
            makespan: Some(4.0),
            success_rate: 1.0,
            qp_solve_time: None,
            extra: Map::new(),
        };
        let capped = stats.capped_arrival_stats().unwrap();
        assert!((capped.mean - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(capped.max, 4.0);
        assert!((stats.goal_reach_rate().unwrap() - 2.0 / 3.0).abs() < 1e-12);
    }
}
