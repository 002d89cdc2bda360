//! Sphere-lattice decomposition of boxes.
//!
//! Each box is filled with a regular grid of sphere centers: neighbours sit
//! `2 * r_obs` apart horizontally and `2 * r_obs * height_scaling_obs`
//! vertically, the outermost centers are inset from the faces by one radius,
//! and every axis carries at least one layer.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Bounds, GeometryError};

/// Slack subtracted before rounding counts up, so an extent that is an exact
/// multiple of the spacing does not gain a layer from rounding noise. Sized for
/// the single-precision coordinates of binary STL.
const COUNT_EPSILON: f64 = 1e-6;

/// Sphere radius and vertical scale shared by every obstacle sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatticeSpacing {
    /// Horizontal sphere radius
    pub r_obs: f64,
    /// Vertical radius as a multiple of `r_obs`
    pub height_scaling_obs: f64,
}

impl LatticeSpacing {
    /// Create a spacing.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::InvalidLattice`] unless both values are finite and positive.
    pub fn new(r_obs: f64, height_scaling_obs: f64) -> Result<Self, GeometryError> {
        if !(r_obs.is_finite() && r_obs > 0.0) {
            return Err(GeometryError::InvalidLattice(format!(
                "r_obs must be positive, got {r_obs}"
            )));
        }
        if !(height_scaling_obs.is_finite() && height_scaling_obs > 0.0) {
            return Err(GeometryError::InvalidLattice(format!(
                "height_scaling_obs must be positive, got {height_scaling_obs}"
            )));
        }
        Ok(Self {
            r_obs,
            height_scaling_obs,
        })
    }

    /// Center-to-center distance along x and y.
    #[must_use]
    pub fn horizontal(&self) -> f64 {
        2.0 * self.r_obs
    }

    /// Center-to-center distance along z.
    #[must_use]
    pub fn vertical(&self) -> f64 {
        2.0 * self.r_obs * self.height_scaling_obs
    }

    /// Number of lattice points per axis for a box of the given extents.
    #[must_use]
    pub fn counts(&self, size: DVec3) -> [usize; 3] {
        [
            lattice_count(size.x, self.horizontal()),
            lattice_count(size.y, self.horizontal()),
            lattice_count(size.z, self.vertical()),
        ]
    }
}

/// Obstacle spheres ready for the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpherePacking {
    /// Sphere centers, in decomposition order
    pub centers: Vec<DVec3>,
    /// Horizontal sphere radius
    pub r_obs: f64,
    /// Vertical radius as a multiple of `r_obs`
    pub height_scaling_obs: f64,
}

impl SpherePacking {
    /// Wrap precomputed centers.
    #[must_use]
    pub fn from_centers(centers: Vec<DVec3>, spacing: LatticeSpacing) -> Self {
        Self {
            centers,
            r_obs: spacing.r_obs,
            height_scaling_obs: spacing.height_scaling_obs,
        }
    }

    /// Number of spheres.
    #[must_use]
    pub fn len(&self) -> usize {
        self.centers.len()
    }

    /// Whether there are no spheres.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }
}

/// Lattice points needed to cover `extent` at `spacing`: `ceil(extent / spacing)`, at least 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn lattice_count(extent: f64, spacing: f64) -> usize {
    (extent / spacing - COUNT_EPSILON).ceil().max(1.0) as usize
}

/// Evenly spaced positions from `min + inset` to `max - inset`.
///
/// A single position collapses to the midpoint.
fn axis_positions(min: f64, max: f64, count: usize, inset: f64) -> Vec<f64> {
    if count == 1 {
        return vec![(min + max) * 0.5];
    }
    let lo = min + inset;
    let hi = max - inset;
    #[allow(clippy::cast_precision_loss)]
    let step = (hi - lo) / (count - 1) as f64;
    #[allow(clippy::cast_precision_loss)]
    (0..count).map(|i| lo + step * i as f64).collect()
}

/// Sphere centers filling one box, x-major then y then z.
///
/// # Errors
///
/// Returns [`GeometryError::InvalidLattice`] if the box needs more spheres than
/// can be addressed, or if the built grid does not hold `countX * countY * countZ`
/// centers.
pub fn decompose_box(bounds: &Bounds, spacing: LatticeSpacing) -> Result<Vec<DVec3>, GeometryError> {
    let [nx, ny, nz] = spacing.counts(bounds.size());
    let total = nx
        .checked_mul(ny)
        .and_then(|n| n.checked_mul(nz))
        .ok_or_else(|| {
            GeometryError::InvalidLattice(format!(
                "{nx} x {ny} x {nz} spheres overflow for box {:?}..{:?}",
                bounds.min, bounds.max
            ))
        })?;
    let xs = axis_positions(bounds.min.x, bounds.max.x, nx, spacing.r_obs);
    let ys = axis_positions(bounds.min.y, bounds.max.y, ny, spacing.r_obs);
    let zs = axis_positions(
        bounds.min.z,
        bounds.max.z,
        nz,
        spacing.r_obs * spacing.height_scaling_obs,
    );

    let mut centers = Vec::with_capacity(total);
    for &x in &xs {
        for &y in &ys {
            for &z in &zs {
                centers.push(DVec3::new(x, y, z));
            }
        }
    }
    if centers.len() != total {
        return Err(GeometryError::InvalidLattice(format!(
            "built {} centers, expected {nx} x {ny} x {nz} = {total}",
            centers.len()
        )));
    }
    Ok(centers)
}

/// Decompose every box and concatenate the centers in box order.
///
/// # Errors
///
/// Propagates the first failing box from [`decompose_box`].
pub fn decompose_boxes(boxes: &[Bounds], spacing: LatticeSpacing) -> Result<SpherePacking, GeometryError> {
    let mut centers = Vec::new();
    for (index, bounds) in boxes.iter().enumerate() {
        let size = bounds.size();
        let box_centers = decompose_box(bounds, spacing)?;
        debug!(
            index,
            dx = size.x,
            dy = size.y,
            dz = size.z,
            spheres = box_centers.len(),
            "decomposed box"
        );
        centers.extend(box_centers);
    }
    Ok(SpherePacking::from_centers(centers, spacing))
}
