//! # Swarm Geom
//!
//! Obstacle geometrization for distributed MPC swarm planners.
//!
//! Planners in this family avoid obstacles the same way they avoid each other:
//! every obstacle is a fixed-radius ellipsoid. This crate turns a solid made of
//! axis-aligned boxes into such a packing:
//!
//! - **Mesh loading**: STL triangle soup grouped into boxes ([`mesh`])
//! - **Lattice decomposition**: each box becomes a regular grid of sphere centers ([`lattice`])
//! - **Obstacle sources**: decompose a mesh or use a fixed preset list ([`source`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use swarm_geom::{ObstacleSource, TriangleMesh};
//!
//! let mesh = TriangleMesh::from_stl_bytes(&std::fs::read("forest.stl")?)?;
//! let packing = ObstacleSource::from_mesh(mesh, 0.8, 1.0)?.resolve()?;
//! println!("{} obstacle spheres of radius {}", packing.len(), packing.r_obs);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod lattice;
pub mod mesh;
pub mod source;

// Re-exports for convenience
pub use error::GeometryError;
pub use lattice::{decompose_box, decompose_boxes, lattice_count, LatticeSpacing, SpherePacking};
pub use mesh::{BoxExtractor, Triangle, TriangleMesh, TwelveTriangleBoxes};
pub use source::{ObstaclePreset, ObstacleSource};

use glam::DVec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    /// Minimum corner
    pub min: DVec3,
    /// Maximum corner
    pub max: DVec3,
}

impl Bounds {
    /// Create bounds from min/max corners.
    ///
    /// The corners are taken componentwise, so `min <= max` always holds.
    #[must_use]
    pub fn from_min_max(a: DVec3, b: DVec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Get the size of the bounds.
    #[must_use]
    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    /// Check if a point is inside the bounds.
    #[must_use]
    pub fn contains(&self, point: DVec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if the bounds are centered at the origin within `tolerance`.
    #[must_use]
    pub fn is_centered(&self, tolerance: f64) -> bool {
        (self.min + self.max).abs().max_element() <= tolerance
    }
}
