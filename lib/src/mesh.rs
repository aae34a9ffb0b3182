use delaunator::Point as PlanarPoint;
use delaunator::triangulate;
use glam::DVec3;
use log::debug;
use thiserror::Error;

use crate::Result;

/// Name given to every solid written by this crate.
pub const SOLID_NAME: &str = "STL_from_CSV";

/// Ordered x, y, z columns of equal length.
///
/// The position of a point in the columns is its identity; triangles refer
/// to points by that index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl PointCloud {
    /// Constructor
    #[must_use]
    pub const fn new() -> Self {
        Self {
            x: Vec::new(),
            y: Vec::new(),
            z: Vec::new(),
        }
    }

    /// Build a cloud from three parallel columns.
    ///
    /// Returns `None` when the columns differ in length.
    #[must_use]
    pub fn from_columns(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Option<Self> {
        (x.len() == y.len() && y.len() == z.len()).then_some(Self { x, y, z })
    }

    /// Append a point.
    pub fn push(&mut self, pos: DVec3) {
        self.x.push(pos.x);
        self.y.push(pos.y);
        self.z.push(pos.z);
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// True when the cloud holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// The x column.
    #[must_use]
    pub fn x(&self) -> &[f64] {
        &self.x
    }

    /// The y column.
    #[must_use]
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// The z column.
    #[must_use]
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Position of the point at `index`, if there is one.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<DVec3> {
        Some(DVec3::new(
            *self.x.get(index)?,
            *self.y.get(index)?,
            *self.z.get(index)?,
        ))
    }

    /// Iterate over the points in index order.
    pub fn iter(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((&x, &y), &z)| DVec3::new(x, y, z))
    }

    fn corners(&self, triangle: Triangle) -> [DVec3; 3] {
        triangle
            .0
            .map(|i| DVec3::new(self.x[i], self.y[i], self.z[i]))
    }
}

impl FromIterator<DVec3> for PointCloud {
    fn from_iter<I: IntoIterator<Item = DVec3>>(iter: I) -> Self {
        let mut cloud = Self::new();
        for pos in iter {
            cloud.push(pos);
        }
        cloud
    }
}

/// Three indices into a [`PointCloud`], in the order the triangulation
/// returned them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Triangle(pub [usize; 3]);

/// One face of the output solid.
#[derive(Clone, Debug, PartialEq)]
pub struct Facet {
    /// Indices of the corners in the source cloud.
    pub triangle: Triangle,
    /// Corner positions, in triangle order.
    pub vertices: [DVec3; 3],
    /// Unit normal, or zero for a degenerate triangle.
    pub normal: DVec3,
}

impl Facet {
    /// Resolve `triangle` against `vertices` and derive its normal.
    #[must_use]
    pub fn new(triangle: Triangle, vertices: [DVec3; 3]) -> Self {
        Self {
            triangle,
            vertices,
            normal: facet_normal(&vertices),
        }
    }

    /// A zero-area facet carries the zero normal.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.normal == DVec3::ZERO
    }
}

/// Unit normal of the triangle `v`.
///
/// `(v[1] - v[0]) x (v[2] - v[0])`, scaled to unit length. The winding of
/// `v` decides the sign; nothing is flipped to face outward. When the cross
/// product has zero length the zero vector is returned.
#[must_use]
pub fn facet_normal(v: &[DVec3; 3]) -> DVec3 {
    let raw = (v[1] - v[0]).cross(v[2] - v[0]);
    let norm = raw.length();
    if norm == 0.0 { DVec3::ZERO } else { raw / norm }
}

/// A named, ordered list of facets ready to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    /// Solid name used on the `solid` and `endsolid` lines.
    pub name: String,
    /// Facets in triangulation order.
    pub facets: Vec<Facet>,
}

impl Mesh {
    /// Number of facets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facets.len()
    }

    /// True when there are no facets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

/// Why the planar triangulation could not be produced.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TriangulationError {
    /// Fewer than three points were supplied.
    #[error("need at least 3 points to triangulate, found {count}")]
    TooFewPoints {
        /// Points supplied.
        count: usize,
    },

    /// Every point lies on one line (or on one spot) in the xy plane.
    #[error("all {count} points are collinear or coincident in the xy plane")]
    Degenerate {
        /// Points supplied.
        count: usize,
    },

    /// An x or y coordinate is infinite or NaN.
    #[error("point {index} has a non-finite x or y coordinate")]
    NonFinite {
        /// Index of the offending point.
        index: usize,
    },
}

/// Triangulate the cloud's xy projection and attach a normal to each
/// triangle.
///
/// z takes no part in the triangulation; it only enters the normals and the
/// written vertices. Facets come out in the order the Delaunay
/// triangulation produced them.
///
/// # Errors
///   [`crate::Error::TriangulationFailed`] when there are fewer than three
///   points, when all points are collinear or coincident in xy, or when an
///   x or y value is not finite.
pub fn build_mesh(points: &PointCloud) -> Result<Mesh> {
    let count = points.len();
    if count < 3 {
        return Err(TriangulationError::TooFewPoints { count }.into());
    }

    let mut projection = Vec::with_capacity(count);
    for (index, (&x, &y)) in points.x().iter().zip(points.y()).enumerate() {
        if !(x.is_finite() && y.is_finite()) {
            return Err(TriangulationError::NonFinite { index }.into());
        }
        projection.push(PlanarPoint { x, y });
    }

    let triangulation = triangulate(&projection);
    if triangulation.triangles.is_empty() {
        return Err(TriangulationError::Degenerate { count }.into());
    }

    let facets: Vec<Facet> = triangulation
        .triangles
        .chunks_exact(3)
        .map(|chunk| {
            let triangle = Triangle([chunk[0], chunk[1], chunk[2]]);
            Facet::new(triangle, points.corners(triangle))
        })
        .collect();

    debug!(
        "Triangulated {} points into {} facets (XY projection)",
        count,
        facets.len()
    );

    Ok(Mesh {
        name: SOLID_NAME.to_string(),
        facets,
    })
}
