//! Triangle-soup meshes and box extraction.
//!
//! Obstacle maps arrive as STL files produced by an octomap-to-mesh export.
//! Every occupied voxel is written as a closed rectangular prism of 12
//! triangles, so the soup can be regrouped into boxes without any topology
//! analysis. The grouping rule lives behind [`BoxExtractor`] so a different
//! classification can be dropped in for meshes that are not box unions.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Bounds, GeometryError};

/// Triangles per closed rectangular prism (2 per face, 6 faces).
pub const TRIANGLES_PER_BOX: usize = 12;

/// Binary STL header length in bytes.
const STL_HEADER_LEN: usize = 80;

/// Binary STL facet record length: normal, 3 vertices, attribute count.
const STL_FACET_LEN: usize = 50;

/// A single triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    /// Corner positions
    pub vertices: [DVec3; 3],
}

impl Triangle {
    /// Create a triangle from its three corners.
    #[must_use]
    pub fn new(a: DVec3, b: DVec3, c: DVec3) -> Self {
        Self {
            vertices: [a, b, c],
        }
    }
}

/// An ordered triangle soup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Triangles in file order
    pub triangles: Vec<Triangle>,
}

impl TriangleMesh {
    /// Create a mesh from triangles.
    #[must_use]
    pub fn new(triangles: Vec<Triangle>) -> Self {
        Self { triangles }
    }

    /// Number of triangles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Whether the mesh has no triangles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Parse STL file contents, binary or ASCII.
    ///
    /// Binary layout is recognised by its exact length (`84 + 50 * count`);
    /// anything else must be ASCII STL.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Stl`] if the bytes are neither valid binary nor ASCII STL.
    pub fn from_stl_bytes(bytes: &[u8]) -> Result<Self, GeometryError> {
        if let Some(mesh) = Self::parse_binary_stl(bytes) {
            debug!(triangles = mesh.len(), "parsed binary STL");
            return Ok(mesh);
        }
        let text = std::str::from_utf8(bytes).map_err(|_| {
            GeometryError::Stl("not binary STL (length mismatch) and not UTF-8 text".to_string())
        })?;
        let mesh = Self::from_stl_ascii(text)?;
        debug!(triangles = mesh.len(), "parsed ASCII STL");
        Ok(mesh)
    }

    /// Parse ASCII STL text.
    ///
    /// Only `vertex` records are significant; each consecutive three form a triangle.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Stl`] on a missing `solid` header, malformed
    /// vertex records, or a vertex count that is not a multiple of three.
    pub fn from_stl_ascii(text: &str) -> Result<Self, GeometryError> {
        if !text.trim_start().starts_with("solid") {
            return Err(GeometryError::Stl("ASCII STL must start with `solid`".to_string()));
        }

        let mut corners = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let mut tokens = line.split_whitespace();
            if tokens.next() != Some("vertex") {
                continue;
            }
            let coords: Vec<f64> = tokens
                .map(str::parse::<f64>)
                .collect::<Result<_, _>>()
                .map_err(|e| GeometryError::Stl(format!("line {}: {e}", line_no + 1)))?;
            if coords.len() != 3 {
                return Err(GeometryError::Stl(format!(
                    "line {}: vertex has {} coordinates, expected 3",
                    line_no + 1,
                    coords.len()
                )));
            }
            corners.push(DVec3::new(coords[0], coords[1], coords[2]));
        }

        if corners.len() % 3 != 0 {
            return Err(GeometryError::Stl(format!(
                "{} vertices do not form whole triangles",
                corners.len()
            )));
        }

        Ok(Self::new(
            corners
                .chunks_exact(3)
                .map(|c| Triangle::new(c[0], c[1], c[2]))
                .collect(),
        ))
    }

    fn parse_binary_stl(bytes: &[u8]) -> Option<Self> {
        let count_bytes: [u8; 4] = bytes
            .get(STL_HEADER_LEN..STL_HEADER_LEN + 4)?
            .try_into()
            .ok()?;
        let count = u32::from_le_bytes(count_bytes) as usize;
        let expected = count
            .checked_mul(STL_FACET_LEN)?
            .checked_add(STL_HEADER_LEN + 4)?;
        if bytes.len() != expected {
            return None;
        }

        let triangles = bytes[STL_HEADER_LEN + 4..]
            .chunks_exact(STL_FACET_LEN)
            .map(|facet| {
                // Skip the 12-byte normal.
                let corner = |i: usize| read_le_vec3(&facet[12 + 12 * i..24 + 12 * i]);
                Triangle::new(corner(0), corner(1), corner(2))
            })
            .collect();
        Some(Self::new(triangles))
    }

    /// Serialize as binary STL (zero normals, zero attributes).
    #[must_use]
    pub fn to_stl_binary(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STL_HEADER_LEN + 4 + STL_FACET_LEN * self.len());
        out.extend_from_slice(&[0u8; STL_HEADER_LEN]);
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(self.len() as u32).to_le_bytes());
        for triangle in &self.triangles {
            out.extend_from_slice(&[0u8; 12]);
            for v in triangle.vertices {
                for c in v.to_array() {
                    #[allow(clippy::cast_possible_truncation)]
                    out.extend_from_slice(&(c as f32).to_le_bytes());
                }
            }
            out.extend_from_slice(&[0u8; 2]);
        }
        out
    }

    /// Build the closed 12-triangle prism for `bounds`.
    ///
    /// This is the layout octomap exports use for a single voxel.
    #[must_use]
    pub fn from_box(bounds: &Bounds) -> Self {
        let (lo, hi) = (bounds.min, bounds.max);
        let c = |x: bool, y: bool, z: bool| {
            DVec3::new(
                if x { hi.x } else { lo.x },
                if y { hi.y } else { lo.y },
                if z { hi.z } else { lo.z },
            )
        };
        let quads = [
            [c(false, false, false), c(true, false, false), c(true, true, false), c(false, true, false)],
            [c(false, false, true), c(true, false, true), c(true, true, true), c(false, true, true)],
            [c(false, false, false), c(true, false, false), c(true, false, true), c(false, false, true)],
            [c(false, true, false), c(true, true, false), c(true, true, true), c(false, true, true)],
            [c(false, false, false), c(false, true, false), c(false, true, true), c(false, false, true)],
            [c(true, false, false), c(true, true, false), c(true, true, true), c(true, false, true)],
        ];
        let triangles = quads
            .iter()
            .flat_map(|q| [Triangle::new(q[0], q[1], q[2]), Triangle::new(q[0], q[2], q[3])])
            .collect();
        Self::new(triangles)
    }

    /// Concatenate the prisms of several boxes, in order.
    #[must_use]
    pub fn from_boxes(boxes: &[Bounds]) -> Self {
        Self::new(
            boxes
                .iter()
                .flat_map(|b| Self::from_box(b).triangles)
                .collect(),
        )
    }
}

fn read_le_vec3(bytes: &[u8]) -> DVec3 {
    let f = |o: usize| f64::from(f32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]]));
    DVec3::new(f(0), f(4), f(8))
}

// =============================================================================
// Box Extraction
// =============================================================================

/// Strategy for recovering box primitives from a triangle soup.
pub trait BoxExtractor {
    /// Decompose `mesh` into ordered axis-aligned boxes.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::Format`] if the mesh is not made of boxes
    /// the strategy can recognise.
    fn extract(&self, mesh: &TriangleMesh) -> Result<Vec<Bounds>, GeometryError>;
}

/// Groups every 12 consecutive triangles into one box.
///
/// A group is accepted only if, on each axis, its 36 vertex coordinates take
/// exactly two distinct values (within `tolerance`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwelveTriangleBoxes {
    /// Coordinates closer than this are the same value
    pub tolerance: f64,
}

impl Default for TwelveTriangleBoxes {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

impl BoxExtractor for TwelveTriangleBoxes {
    fn extract(&self, mesh: &TriangleMesh) -> Result<Vec<Bounds>, GeometryError> {
        if mesh.len() % TRIANGLES_PER_BOX != 0 {
            return Err(GeometryError::Format(format!(
                "{} triangles is not a multiple of {TRIANGLES_PER_BOX}",
                mesh.len()
            )));
        }

        mesh.triangles
            .chunks_exact(TRIANGLES_PER_BOX)
            .enumerate()
            .map(|(index, group)| self.group_to_box(index, group))
            .collect()
    }
}

impl TwelveTriangleBoxes {
    fn group_to_box(&self, index: usize, group: &[Triangle]) -> Result<Bounds, GeometryError> {
        let corners: Vec<DVec3> = group.iter().flat_map(|t| t.vertices).collect();
        let mut min = [0.0; 3];
        let mut max = [0.0; 3];

        for (axis, name) in ["x", "y", "z"].iter().enumerate() {
            let values: Vec<f64> = corners.iter().map(|c| c[axis]).collect();
            let distinct = distinct_values(values, self.tolerance);
            if distinct.len() != 2 {
                return Err(GeometryError::Format(format!(
                    "box {index} (triangles {}..{}): {} distinct {name} values, expected 2",
                    index * TRIANGLES_PER_BOX,
                    (index + 1) * TRIANGLES_PER_BOX,
                    distinct.len()
                )));
            }
            min[axis] = distinct[0];
            max[axis] = distinct[1];
        }

        Ok(Bounds::from_min_max(DVec3::from_array(min), DVec3::from_array(max)))
    }
}

/// Sorted representatives of `values`, merging runs closer than `tolerance`.
fn distinct_values(mut values: Vec<f64>, tolerance: f64) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    let mut distinct: Vec<f64> = Vec::new();
    for v in values {
        match distinct.last() {
            Some(&last) if (v - last).abs() <= tolerance => {}
            _ => distinct.push(v),
        }
    }
    distinct
}
