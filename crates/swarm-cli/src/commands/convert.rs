//! `swarm convert`: planner config for a large-scale instance.
//!
//! The instance directory holds one `simulation*.json`, which names the robot
//! file and the octomap. The obstacle mesh is the octomap's stem with an `.stl`
//! extension, next to the simulation file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use swarm_eval::config::{AgentRecord, ConfigSynthesizer, SimulationConfig};
use swarm_geom::{ObstaclePreset, ObstacleSource, TriangleMesh};

use crate::files;

/// `swarm convert` arguments.
#[derive(clap::Args, Debug)]
pub struct Args {
    /// Instance directory, e.g. `SwapClose48`
    pub instance_dir: PathBuf,

    /// Baseline planner config to extend
    #[arg(short, long, default_value = "config.json")]
    pub baseline: PathBuf,

    /// Output path [default: config_<instance>.json]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Use a named obstacle preset instead of decomposing the mesh
    #[arg(long)]
    pub preset: Option<ObstaclePreset>,

    /// Obstacle sphere radius for mesh decomposition
    #[arg(long, default_value_t = 0.8)]
    pub r_obs: f64,

    /// Obstacle vertical scale for mesh decomposition
    #[arg(long, default_value_t = 1.0)]
    pub height_scaling_obs: f64,
}

/// Where the simulation file's references point.
#[derive(Debug, PartialEq)]
struct InstanceFiles {
    robots: PathBuf,
    mesh: PathBuf,
}

impl InstanceFiles {
    /// Resolve references by base name, relative to the simulation file's directory.
    fn resolve(simulation_path: &Path, simulation: &SimulationConfig) -> Result<Self> {
        let dir = simulation_path.parent().unwrap_or_else(|| Path::new("."));
        let robots = files::base_name(Path::new(&simulation.robot_config_filename))?;
        let octomap = Path::new(&simulation.octomap_filename);
        let mesh = Path::new(&files::base_name(octomap)?).with_extension("stl");
        Ok(Self {
            robots: dir.join(robots),
            mesh: dir.join(mesh),
        })
    }
}

fn obstacle_source(args: &Args, mesh_path: &Path) -> Result<ObstacleSource> {
    if let Some(preset) = args.preset {
        info!(preset = preset.name(), "using obstacle preset");
        return Ok(ObstacleSource::preset(preset));
    }
    let bytes = std::fs::read(mesh_path).with_context(|| format!("reading {}", mesh_path.display()))?;
    let mesh = TriangleMesh::from_stl_bytes(&bytes)
        .with_context(|| format!("parsing {}", mesh_path.display()))?;
    Ok(ObstacleSource::from_mesh(mesh, args.r_obs, args.height_scaling_obs)?)
}

/// Run the command.
///
/// # Errors
///
/// Fails on missing or ambiguous instance files and on any synthesis error.
pub fn run(args: &Args) -> Result<()> {
    let instance = files::base_name(&args.instance_dir)?;
    let simulation_path = files::find_unique(&args.instance_dir, "simulation config", |n| {
        n.starts_with("simulation") && n.ends_with(".json")
    })?;
    let simulation: SimulationConfig = files::read_json(&simulation_path)?;
    let paths = InstanceFiles::resolve(&simulation_path, &simulation)?;

    let agents: Vec<AgentRecord> = files::read_json(&paths.robots)?;
    let obstacles = obstacle_source(args, &paths.mesh)?
        .resolve()
        .with_context(|| format!("building obstacles for {instance}"))?;
    let synthesizer = ConfigSynthesizer::from_json_str(&files::read_text(&args.baseline)?)
        .with_context(|| format!("parsing {}", args.baseline.display()))?;

    let config = synthesizer
        .synthesize(&agents, &obstacles, &simulation)
        .with_context(|| format!("synthesizing planner config for {instance}"))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("config_{instance}.json")));
    files::write_text(&output, &config.to_json_string()?)?;
    info!(
        instance = %instance,
        agents = config.ncmd,
        obstacles = config.obstacle_count(),
        output = %output.display(),
        "wrote planner config"
    );
    Ok(())
}
