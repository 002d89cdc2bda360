//! Where obstacle spheres come from.
//!
//! Obstacles are either decomposed from a box mesh or taken verbatim from a
//! named preset whose centers were laid out by hand for a known map. The
//! choice is a configuration value; callers never branch on map names.

use std::fmt;
use std::str::FromStr;

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::lattice::{decompose_boxes, LatticeSpacing, SpherePacking};
use crate::mesh::{BoxExtractor, TriangleMesh, TwelveTriangleBoxes};
use crate::GeometryError;

/// Obstacle sphere provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObstacleSource {
    /// Decompose a box mesh into a sphere lattice.
    FromMesh {
        /// Box-union triangle soup
        mesh: TriangleMesh,
        /// Sphere radius and vertical scale
        spacing: LatticeSpacing,
    },
    /// Use a fixed list of centers.
    FromFixedList {
        /// Precomputed spheres
        packing: SpherePacking,
    },
}

impl ObstacleSource {
    /// Mesh-backed source.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidLattice`] for a non-positive radius or height scale.
    pub fn from_mesh(
        mesh: TriangleMesh,
        r_obs: f64,
        height_scaling_obs: f64,
    ) -> Result<Self, GeometryError> {
        Ok(Self::FromMesh {
            mesh,
            spacing: LatticeSpacing::new(r_obs, height_scaling_obs)?,
        })
    }

    /// Preset-backed source.
    #[must_use]
    pub fn preset(preset: ObstaclePreset) -> Self {
        Self::FromFixedList {
            packing: preset.packing(),
        }
    }

    /// Produce the spheres using the 12-triangles-per-box grouping.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Format`] if the mesh is not a box union, or
    /// [`GeometryError::InvalidLattice`] if a box cannot be decomposed.
    pub fn resolve(&self) -> Result<SpherePacking, GeometryError> {
        self.resolve_with(&TwelveTriangleBoxes::default())
    }

    /// Produce the spheres using a custom box extractor.
    ///
    /// # Errors
    ///
    /// Propagates the extractor's error.
    pub fn resolve_with(&self, extractor: &dyn BoxExtractor) -> Result<SpherePacking, GeometryError> {
        match self {
            Self::FromMesh { mesh, spacing } => {
                warn!("constructing obstacle spheres from a mesh; the packing approximates the solid");
                let boxes = extractor.extract(mesh)?;
                let packing = decompose_boxes(&boxes, *spacing)?;
                info!(
                    boxes = boxes.len(),
                    spheres = packing.len(),
                    r_obs = spacing.r_obs,
                    "decomposed obstacle mesh"
                );
                Ok(packing)
            }
            Self::FromFixedList { packing } => {
                info!(spheres = packing.len(), "using fixed obstacle list");
                Ok(packing.clone())
            }
        }
    }
}

// =============================================================================
// Presets
// =============================================================================

/// Hand-laid obstacle sets for known maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstaclePreset {
    /// 20 tree trunks, 11 layers of 0.45 m spheres up to ~10 m.
    ForestSmall5,
}

/// Trunk positions of `forest_small_5`.
const FOREST_SMALL_5_TRUNKS: [[f64; 2]; 20] = [
    [-2.15, -6.95],
    [-7.95, -5.85],
    [5.55, -2.55],
    [7.65, -5.75],
    [9.15, -3.75],
    [-7.65, 5.85],
    [-6.15, 6.55],
    [-3.15, 7.25],
    [6.25, 1.15],
    [2.35, 5.95],
    [8.25, 2.85],
    [0.55, 8.95],
    [3.15, -3.45],
    [-4.15, -2.75],
    [0.65, -6.45],
    [1.85, -0.65],
    [0.35, -3.25],
    [0.75, -3.55],
    [3.25, -8.65],
    [3.35, -7.95],
];

const FOREST_SMALL_5_LAYERS: u32 = 11;
const FOREST_SMALL_5_RADIUS: f64 = 0.45;

impl ObstaclePreset {
    /// All known presets.
    pub const ALL: [Self; 1] = [Self::ForestSmall5];

    /// The preset's configuration name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ForestSmall5 => "forest_small_5",
        }
    }

    /// Look a preset up by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// The preset's spheres.
    #[must_use]
    pub fn packing(self) -> SpherePacking {
        match self {
            Self::ForestSmall5 => {
                let layer_height = 2.0 * FOREST_SMALL_5_RADIUS;
                let centers = (0..FOREST_SMALL_5_LAYERS)
                    .flat_map(|layer| {
                        let z = round_cm(f64::from(layer).mul_add(layer_height, FOREST_SMALL_5_RADIUS));
                        FOREST_SMALL_5_TRUNKS
                            .iter()
                            .map(move |[x, y]| DVec3::new(*x, *y, z))
                    })
                    .collect();
                SpherePacking {
                    centers,
                    r_obs: FOREST_SMALL_5_RADIUS,
                    height_scaling_obs: 1.0,
                }
            }
        }
    }
}

fn round_cm(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl fmt::Display for ObstaclePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ObstaclePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(|p| p.name()).collect();
            format!("unknown obstacle preset `{s}` (known: {})", known.join(", "))
        })
    }
}
