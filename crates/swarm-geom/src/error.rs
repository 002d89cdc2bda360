//! Geometry error types.

use thiserror::Error;

/// Errors raised while loading or decomposing obstacle geometry.
#[derive(Debug, Error)]
pub enum GeometryError {
    /// Triangles do not group into axis-aligned boxes.
    #[error("geometry format error: {0}")]
    Format(String),

    /// STL bytes could not be read as binary or ASCII STL.
    #[error("unreadable STL: {0}")]
    Stl(String),

    /// Sphere radius or height scale is unusable.
    #[error("invalid lattice spacing: {0}")]
    InvalidLattice(String),
}
