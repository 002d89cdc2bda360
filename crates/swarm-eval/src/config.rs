//! Planner configuration synthesis.
//!
//! The planner reads one JSON config describing every body it must keep apart:
//! `po` lists the initial positions of the `Ncmd` controlled agents followed by
//! the obstacle sphere centers, `pf` lists the agents' goals. The synthesizer
//! extends a baseline config (horizon, weights, solver options, ...) with the
//! instance-specific values and leaves every other key untouched.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use swarm_geom::{Bounds, SpherePacking};

use crate::error::EvalError;

/// Tolerance for the robot bounding-box shape checks.
pub const SHAPE_TOLERANCE: f64 = 1e-9;

/// Keys owned by [`PlannerConfig`]'s typed fields.
const SYNTHESIZED_KEYS: [&str; 12] = [
    "po",
    "pf",
    "N",
    "Ncmd",
    "rmin",
    "height_scaling",
    "rmin_obs",
    "height_scaling_obs",
    "pmin",
    "pmax",
    "amin",
    "amax",
];

// =============================================================================
// Inputs
// =============================================================================

/// One entry of the robot config file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Initial position
    pub start_position: DVec3,
    /// Goal position
    pub goal_position: DVec3,
    /// Collision box minimum corner, robot at the origin
    pub collision_shape_at_zero_min: DVec3,
    /// Collision box maximum corner, robot at the origin
    pub collision_shape_at_zero_max: DVec3,
}

impl AgentRecord {
    /// The collision box as bounds.
    #[must_use]
    pub fn collision_bounds(&self) -> Bounds {
        Bounds {
            min: self.collision_shape_at_zero_min,
            max: self.collision_shape_at_zero_max,
        }
    }
}

/// Workspace description written alongside a large-scale instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Workspace lower corner
    pub workspace_min: DVec3,
    /// Workspace upper corner
    pub workspace_max: DVec3,
    /// Per-derivative limits; `[1][1]` is the acceleration limit
    pub max_derivatives: Vec<Vec<f64>>,
    /// Robot config file, resolved relative to this file
    pub robot_config_filename: String,
    /// Octomap file; the obstacle STL shares its stem
    pub octomap_filename: String,
}

impl SimulationConfig {
    /// Scalar acceleration limit.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] if `max_derivatives[1][1]` is
    /// missing or not positive.
    pub fn acceleration_limit(&self) -> Result<f64, EvalError> {
        let acc = self
            .max_derivatives
            .get(1)
            .and_then(|d| d.get(1))
            .copied()
            .ok_or_else(|| {
                EvalError::ConfigValidation("max_derivatives[1][1] (acceleration) is missing".to_string())
            })?;
        if !(acc.is_finite() && acc > 0.0) {
            return Err(EvalError::ConfigValidation(format!(
                "acceleration limit must be positive, got {acc}"
            )));
        }
        Ok(acc)
    }

    /// Workspace as bounds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] unless `workspace_min < workspace_max` on every axis.
    pub fn workspace(&self) -> Result<Bounds, EvalError> {
        if !self.workspace_min.cmplt(self.workspace_max).all() {
            return Err(EvalError::ConfigValidation(format!(
                "workspace_min {} must be below workspace_max {} on every axis",
                self.workspace_min, self.workspace_max
            )));
        }
        Ok(Bounds {
            min: self.workspace_min,
            max: self.workspace_max,
        })
    }
}

/// Radius and vertical scale of the controlled robots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobotShape {
    /// Horizontal collision radius
    pub rmin: f64,
    /// Vertical radius as a multiple of `rmin`
    pub height_scaling: f64,
}

impl RobotShape {
    /// Derive the shape from a collision box.
    ///
    /// The box must be centered at the origin and square in its horizontal cross-section.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] when either requirement fails or the box is empty.
    pub fn from_bounds(bounds: &Bounds) -> Result<Self, EvalError> {
        if !bounds.is_centered(SHAPE_TOLERANCE) {
            return Err(EvalError::ConfigValidation(format!(
                "robot bounding box min={} max={} must be centered at the origin",
                bounds.min, bounds.max
            )));
        }
        if (bounds.max.x - bounds.max.y).abs() > SHAPE_TOLERANCE {
            return Err(EvalError::ConfigValidation(format!(
                "robot bounding box must be square in x/y, got {} x {}",
                bounds.max.x, bounds.max.y
            )));
        }
        let rmin = bounds.max.x;
        if rmin <= 0.0 || bounds.max.z <= 0.0 {
            return Err(EvalError::ConfigValidation(format!(
                "robot bounding box max={} must be positive",
                bounds.max
            )));
        }
        Ok(Self {
            rmin,
            height_scaling: bounds.max.z / rmin,
        })
    }
}

// =============================================================================
// Planner Config
// =============================================================================

/// The planner's input config.
///
/// Typed fields are the ones synthesis owns; `extra` carries every other key
/// of the baseline config verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Initial positions: agents, then obstacle centers
    pub po: Vec<DVec3>,
    /// Agent goals
    pub pf: Vec<DVec3>,
    /// Total bodies (agents + obstacles)
    #[serde(rename = "N")]
    pub n: usize,
    /// Controlled agents
    #[serde(rename = "Ncmd")]
    pub ncmd: usize,
    /// Robot horizontal radius
    pub rmin: f64,
    /// Robot vertical scale
    pub height_scaling: f64,
    /// Obstacle sphere radius
    pub rmin_obs: f64,
    /// Obstacle vertical scale
    pub height_scaling_obs: f64,
    /// Workspace lower corner
    pub pmin: DVec3,
    /// Workspace upper corner
    pub pmax: DVec3,
    /// Acceleration lower bound
    pub amin: DVec3,
    /// Acceleration upper bound
    pub amax: DVec3,
    /// Pass-through baseline keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlannerConfig {
    /// Parse and validate a planner config.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] for malformed JSON (including positions
    /// without exactly 3 components) and [`EvalError::ConfigValidation`] for
    /// count mismatches.
    pub fn from_json_str(text: &str) -> Result<Self, EvalError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize with a 4-space indent.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String, EvalError> {
        crate::to_pretty_json(self)
    }

    /// Check the shape invariants.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] naming the first violated invariant.
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.po.len() != self.n {
            return Err(EvalError::ConfigValidation(format!(
                "len(po) = {} but N = {}",
                self.po.len(),
                self.n
            )));
        }
        if self.pf.len() != self.ncmd {
            return Err(EvalError::ConfigValidation(format!(
                "len(pf) = {} but Ncmd = {}",
                self.pf.len(),
                self.ncmd
            )));
        }
        if self.ncmd > self.n {
            return Err(EvalError::ConfigValidation(format!(
                "Ncmd = {} exceeds N = {}",
                self.ncmd, self.n
            )));
        }
        for (name, value) in [
            ("rmin", self.rmin),
            ("height_scaling", self.height_scaling),
            ("rmin_obs", self.rmin_obs),
            ("height_scaling_obs", self.height_scaling_obs),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(EvalError::ConfigValidation(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Number of obstacle spheres in `po`.
    #[must_use]
    pub fn obstacle_count(&self) -> usize {
        self.n - self.ncmd
    }

    /// Agent start positions.
    #[must_use]
    pub fn agent_starts(&self) -> &[DVec3] {
        &self.po[..self.ncmd]
    }

    /// Obstacle sphere centers.
    #[must_use]
    pub fn obstacle_centers(&self) -> &[DVec3] {
        &self.po[self.ncmd..]
    }

    /// Planner timestep `ts` in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] if `ts` is missing or not positive.
    pub fn timestep(&self) -> Result<f64, EvalError> {
        let ts = self
            .extra
            .get("ts")
            .and_then(Value::as_f64)
            .ok_or_else(|| EvalError::ConfigValidation("config has no numeric `ts`".to_string()))?;
        if !(ts.is_finite() && ts > 0.0) {
            return Err(EvalError::ConfigValidation(format!("ts must be positive, got {ts}")));
        }
        Ok(ts)
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// Extends a baseline planner config with instance data.
#[derive(Debug, Clone, Default)]
pub struct ConfigSynthesizer {
    template: Map<String, Value>,
}

impl ConfigSynthesizer {
    /// Create a synthesizer over a baseline config.
    #[must_use]
    pub fn new(template: Map<String, Value>) -> Self {
        Self { template }
    }

    /// Parse the baseline config.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::Json`] for malformed JSON and
    /// [`EvalError::ConfigValidation`] if the top level is not an object.
    pub fn from_json_str(text: &str) -> Result<Self, EvalError> {
        match serde_json::from_str(text)? {
            Value::Object(template) => Ok(Self::new(template)),
            other => Err(EvalError::ConfigValidation(format!(
                "baseline config must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Build the planner config.
    ///
    /// Agents keep their input order; obstacle centers keep decomposition order.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::ConfigValidation`] for an empty agent list, agents
    /// with differing collision boxes, an off-center or non-square robot box,
    /// an inverted workspace, or a missing acceleration limit.
    pub fn synthesize(
        &self,
        agents: &[AgentRecord],
        obstacles: &SpherePacking,
        simulation: &SimulationConfig,
    ) -> Result<PlannerConfig, EvalError> {
        let first = agents
            .first()
            .ok_or_else(|| EvalError::ConfigValidation("robot config lists no agents".to_string()))?;
        if let Some((index, other)) = agents
            .iter()
            .enumerate()
            .find(|(_, a)| a.collision_bounds() != first.collision_bounds())
        {
            return Err(EvalError::ConfigValidation(format!(
                "agent {index} collision box min={} max={} differs from agent 0",
                other.collision_shape_at_zero_min, other.collision_shape_at_zero_max
            )));
        }

        let shape = RobotShape::from_bounds(&first.collision_bounds())?;
        let workspace = simulation.workspace()?;
        let acc = simulation.acceleration_limit()?;

        let po: Vec<DVec3> = agents
            .iter()
            .map(|a| a.start_position)
            .chain(obstacles.centers.iter().copied())
            .collect();
        let pf: Vec<DVec3> = agents.iter().map(|a| a.goal_position).collect();

        let mut extra = self.template.clone();
        for key in SYNTHESIZED_KEYS {
            extra.remove(key);
        }

        let config = PlannerConfig {
            n: po.len(),
            ncmd: agents.len(),
            po,
            pf,
            rmin: shape.rmin,
            height_scaling: shape.height_scaling,
            rmin_obs: obstacles.r_obs,
            height_scaling_obs: obstacles.height_scaling_obs,
            pmin: workspace.min,
            pmax: workspace.max,
            amin: DVec3::splat(-acc),
            amax: DVec3::splat(acc),
            extra,
        };
        config.validate()?;

        info!(
            agents = config.ncmd,
            obstacles = config.obstacle_count(),
            rmin = config.rmin,
            rmin_obs = config.rmin_obs,
            "synthesized planner config"
        );
        Ok(config)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
