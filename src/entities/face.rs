//! Face entity
//!
//! A planar polygon bounded by one outer loop and zero or more inner loops
//! (holes). Loop winding defines the front side: the outer loop runs
//! counter-clockwise when seen from the front.

use crate::entities::{DrawingCommon, EntityCommon};
use crate::types::{BoundingBox3D, PersistentId, Point3, Vector3, LENGTH_TOLERANCE};

#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub common: EntityCommon,
    pub drawing: DrawingCommon,
    pub outer_loop: Vec<Point3>,
    pub inner_loops: Vec<Vec<Point3>>,
    /// Material applied to the back side; `drawing.material` is the front
    pub(crate) back_material: Option<PersistentId>,
}

impl Face {
    /// Create a new face
    pub fn new(outer_loop: Vec<Point3>) -> Self {
        Face {
            common: EntityCommon::default(),
            drawing: DrawingCommon::default(),
            outer_loop,
            inner_loops: Vec::new(),
            back_material: None,
        }
    }

    /// Add an inner loop
    pub fn with_hole(mut self, inner: Vec<Point3>) -> Self {
        self.inner_loops.push(inner);
        self
    }

    /// Get the back material
    pub fn back_material(&self) -> Option<PersistentId> {
        self.back_material
    }

    /// Area-weighted normal of the outer loop (Newell's method).
    ///
    /// The length equals twice the polygon area.
    pub fn area_vector(&self) -> Vector3 {
        newell_normal(&self.outer_loop)
    }

    /// Unit normal, or `None` for degenerate faces
    pub fn normal(&self) -> Option<Vector3> {
        let n = self.area_vector();
        let len = n.norm();
        (len > LENGTH_TOLERANCE).then(|| n / len)
    }

    /// Signed plane offset `d` such that `normal · p = d` on the face
    pub fn plane(&self) -> Option<(Vector3, f64)> {
        let n = self.normal()?;
        let centroid = loop_centroid(&self.outer_loop)?;
        Some((n, n.dot(&centroid.coords)))
    }

    /// Area of the outer loop minus its holes
    pub fn area(&self) -> f64 {
        let holes: f64 = self
            .inner_loops
            .iter()
            .map(|l| newell_normal(l).norm() * 0.5)
            .sum();
        (self.area_vector().norm() * 0.5 - holes).max(0.0)
    }

    /// Fewer than three distinct vertices or zero area
    pub fn is_degenerate(&self) -> bool {
        distinct_vertex_count(&self.outer_loop) < 3 || self.normal().is_none()
    }

    /// Flip the front and back side by reversing every loop
    pub fn reverse(&mut self) {
        self.outer_loop.reverse();
        for inner in &mut self.inner_loops {
            inner.reverse();
        }
        std::mem::swap(&mut self.drawing.material, &mut self.back_material);
    }

    /// Directed boundary segments of the outer loop
    pub fn outer_segments(&self) -> impl Iterator<Item = (Point3, Point3)> + '_ {
        let n = self.outer_loop.len();
        (0..n).map(move |i| (self.outer_loop[i], self.outer_loop[(i + 1) % n]))
    }

    /// Remove consecutive duplicate vertices from every loop
    pub fn dedup_vertices(&mut self) -> bool {
        let mut changed = dedup_loop(&mut self.outer_loop);
        for inner in &mut self.inner_loops {
            changed |= dedup_loop(inner);
        }
        changed
    }

    /// Axis-aligned bounds
    pub fn bounding_box(&self) -> Option<BoundingBox3D> {
        BoundingBox3D::from_points(self.outer_loop.iter())
    }
}

pub(crate) fn newell_normal(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal
}

fn loop_centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.coords);
    Some(Point3::from(sum / points.len() as f64))
}

pub(crate) fn same_point(a: &Point3, b: &Point3) -> bool {
    nalgebra::distance(a, b) <= LENGTH_TOLERANCE
}

fn distinct_vertex_count(points: &[Point3]) -> usize {
    let mut distinct: Vec<&Point3> = Vec::with_capacity(points.len());
    for p in points {
        if !distinct.iter().any(|q| same_point(p, q)) {
            distinct.push(p);
        }
    }
    distinct.len()
}

fn dedup_loop(points: &mut Vec<Point3>) -> bool {
    let before = points.len();
    points.dedup_by(|a, b| same_point(a, b));
    while points.len() > 1 && same_point(&points[0], &points[points.len() - 1]) {
        points.pop();
    }
    points.len() != before
}
