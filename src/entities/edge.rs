//! Edge entity

use crate::entities::{DrawingCommon, EntityCommon};
use crate::types::{BoundingBox3D, Point3, LENGTH_TOLERANCE};

/// A straight line segment between two vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub common: EntityCommon,
    pub drawing: DrawingCommon,
    pub start: Point3,
    pub end: Point3,
    /// Soft edges are hidden unless hidden geometry is drawn
    pub soft: bool,
    pub smooth: bool,
}

impl Edge {
    /// Create a new edge
    pub fn new(start: Point3, end: Point3) -> Self {
        Edge {
            common: EntityCommon::default(),
            drawing: DrawingCommon::default(),
            start,
            end,
            soft: false,
            smooth: false,
        }
    }

    /// Distance between the endpoints
    pub fn length(&self) -> f64 {
        nalgebra::distance(&self.start, &self.end)
    }

    /// Zero-length edges are repaired away by `fix_errors`
    pub fn is_degenerate(&self) -> bool {
        self.length() <= LENGTH_TOLERANCE
    }

    /// Check whether this edge connects `a` and `b`, in either direction
    pub fn connects(&self, a: &Point3, b: &Point3) -> bool {
        let near = |p: &Point3, q: &Point3| nalgebra::distance(p, q) <= LENGTH_TOLERANCE;
        (near(&self.start, a) && near(&self.end, b)) || (near(&self.start, b) && near(&self.end, a))
    }

    /// Axis-aligned bounds
    pub fn bounding_box(&self) -> BoundingBox3D {
        BoundingBox3D::from_point(self.start).merge(&BoundingBox3D::from_point(self.end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_length() {
        let e = Edge::new(Point3::origin(), Point3::new(3.0, 4.0, 0.0));
        assert!((e.length() - 5.0).abs() < 1e-12);
        assert!(!e.is_degenerate());
    }

    #[test]
    fn test_connects_either_direction() {
        let a = Point3::new(1.0, 0.0, 0.0);
        let b = Point3::new(1.0, 1.0, 0.0);
        let e = Edge::new(a, b);
        assert!(e.connects(&a, &b));
        assert!(e.connects(&b, &a));
        assert!(!e.connects(&a, &Point3::origin()));
    }
}
