//! Camera and drawing axes

use crate::types::{Point3, Transform, Vector3};

/// A viewing camera.
///
/// Projection mechanics belong to the renderer; the model only stores the
/// placement and lens parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Eye position
    pub eye: Point3,
    /// Point looked at
    pub target: Point3,
    /// Up direction
    pub up: Vector3,
    /// Perspective (true) or parallel projection
    pub perspective: bool,
    /// Vertical field of view in degrees (perspective only)
    pub field_of_view: f64,
    /// Height of the view in model units (parallel projection only)
    pub ortho_height: f64,
}

impl Camera {
    /// Create a new camera
    pub fn new(eye: Point3, target: Point3, up: Vector3) -> Self {
        Camera {
            eye,
            target,
            up,
            ..Default::default()
        }
    }

    /// Unit view direction, or `None` when eye and target coincide
    pub fn direction(&self) -> Option<Vector3> {
        (self.target - self.eye).try_normalize(f64::EPSILON)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Camera {
            eye: Point3::new(-1000.0, -1000.0, 1000.0),
            target: Point3::origin(),
            up: Vector3::z(),
            perspective: true,
            field_of_view: 35.0,
            ortho_height: 1000.0,
        }
    }
}

/// The drawing axes of a model
#[derive(Debug, Clone, PartialEq)]
pub struct Axes {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub z_axis: Vector3,
}

impl Axes {
    /// Transform from axes space to model space
    pub fn transform(&self) -> Transform {
        Transform::new(
            self.x_axis.x, self.y_axis.x, self.z_axis.x, self.origin.x,
            self.x_axis.y, self.y_axis.y, self.z_axis.y, self.origin.y,
            self.x_axis.z, self.y_axis.z, self.z_axis.z, self.origin.z,
            0.0, 0.0, 0.0, 1.0,
        )
    }
}

impl Default for Axes {
    fn default() -> Self {
        Axes {
            origin: Point3::origin(),
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            z_axis: Vector3::z(),
        }
    }
}
